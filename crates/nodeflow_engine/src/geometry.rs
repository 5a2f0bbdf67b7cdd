// SPDX-License-Identifier: MIT OR Apache-2.0
//! Model-space geometry for node placement and group layout.

use crate::checksum::Checksum;
use crate::stream::{InputStream, OutputStream};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Neg, Sub};

/// A point in model space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Point halfway between `a` and `b`
    pub fn midpoint(a: Point, b: Point) -> Point {
        Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
    }

    /// Read from a stream
    pub fn read(stream: &mut dyn InputStream) -> Self {
        let x = stream.read_f64();
        let y = stream.read_f64();
        Self { x, y }
    }

    /// Write to a stream
    pub fn write(&self, stream: &mut dyn OutputStream) {
        stream.write_f64(self.x);
        stream.write_f64(self.y);
    }

    /// Feed into a checksum
    pub fn add_to_checksum(&self, checksum: &mut Checksum) {
        checksum.add_f64(self.x);
        checksum.add_f64(self.y);
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Width and height
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Size {
    /// Create a size
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Grow by the given amounts on both sides
    pub fn grow(&self, horizontal: f64, vertical: f64) -> Self {
        Size::new(self.width + 2.0 * horizontal, self.height + 2.0 * vertical)
    }

    /// Read from a stream
    pub fn read(stream: &mut dyn InputStream) -> Self {
        let width = stream.read_f64();
        let height = stream.read_f64();
        Self { width, height }
    }

    /// Write to a stream
    pub fn write(&self, stream: &mut dyn OutputStream) {
        stream.write_f64(self.width);
        stream.write_f64(self.height);
    }

    /// Feed into a checksum
    pub fn add_to_checksum(&self, checksum: &mut Checksum) {
        checksum.add_f64(self.width);
        checksum.add_f64(self.height);
    }
}

impl Add for Size {
    type Output = Size;

    fn add(self, rhs: Size) -> Size {
        Size::new(self.width + rhs.width, self.height + rhs.height)
    }
}

/// Axis-aligned rectangle (top-left origin)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner
    pub position: Point,
    /// Extent
    pub size: Size,
}

impl Rect {
    /// Create a rectangle
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            position: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    /// Rectangle with the given top-left corner and size
    pub fn from_position_and_size(position: Point, size: Size) -> Self {
        Self { position, size }
    }

    /// Rectangle centered on `center`
    pub fn from_center_and_size(center: Point, size: Size) -> Self {
        let position = Point::new(center.x - size.width / 2.0, center.y - size.height / 2.0);
        Self { position, size }
    }

    /// Smallest rectangle containing both points
    pub fn from_two_points(a: Point, b: Point) -> Self {
        let left = a.x.min(b.x);
        let top = a.y.min(b.y);
        Rect::new(left, top, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    /// Left edge
    pub fn left(&self) -> f64 {
        self.position.x
    }

    /// Right edge
    pub fn right(&self) -> f64 {
        self.position.x + self.size.width
    }

    /// Top edge
    pub fn top(&self) -> f64 {
        self.position.y
    }

    /// Bottom edge
    pub fn bottom(&self) -> f64 {
        self.position.y + self.size.height
    }

    /// Center point
    pub fn center(&self) -> Point {
        Point::new(
            self.position.x + self.size.width / 2.0,
            self.position.y + self.size.height / 2.0,
        )
    }

    /// Whether `point` lies inside (edges included)
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    /// Translate by `offset`
    pub fn offset(&self, offset: Point) -> Self {
        Self::from_position_and_size(self.position + offset, self.size)
    }

    /// Smallest rectangle containing both rectangles
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }

    /// Bounding rectangle of all `rects`, or `None` if empty
    pub fn bounding<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
        rects
            .into_iter()
            .fold(None, |acc: Option<Rect>, rect| {
                Some(acc.map_or(*rect, |acc| acc.union(rect)))
            })
    }

    /// Read from a stream
    pub fn read(stream: &mut dyn InputStream) -> Self {
        let position = Point::read(stream);
        let size = Size::read(stream);
        Self { position, size }
    }

    /// Write to a stream
    pub fn write(&self, stream: &mut dyn OutputStream) {
        self.position.write(stream);
        self.size.write(stream);
    }

    /// Feed into a checksum
    pub fn add_to_checksum(&self, checksum: &mut Checksum) {
        self.position.add_to_checksum(checksum);
        self.size.add_to_checksum(checksum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{MemoryInputStream, MemoryOutputStream};

    #[test]
    fn test_rect_edges_and_contains() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(rect.right(), 40.0);
        assert_eq!(rect.bottom(), 60.0);
        assert_eq!(rect.center(), Point::new(25.0, 40.0));
        assert!(rect.contains(Point::new(10.0, 60.0)));
        assert!(!rect.contains(Point::new(9.9, 30.0)));
    }

    #[test]
    fn test_bounding_rect() {
        let rects = [Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(20.0, -5.0, 5.0, 5.0)];
        assert_eq!(Rect::bounding(&rects), Some(Rect::new(0.0, -5.0, 25.0, 15.0)));
        assert_eq!(Rect::bounding(&[]), None);
    }

    #[test]
    fn test_from_two_points() {
        let rect = Rect::from_two_points(Point::new(5.0, 1.0), Point::new(1.0, 4.0));
        assert_eq!(rect, Rect::new(1.0, 1.0, 4.0, 3.0));
    }

    #[test]
    fn test_stream_round_trip() {
        let rect = Rect::new(1.5, -2.0, 3.0, 4.25);
        let mut out = MemoryOutputStream::new();
        rect.write(&mut out);
        let bytes = out.into_inner().unwrap();
        assert_eq!(bytes.len(), 32);
        let mut input = MemoryInputStream::new(&bytes);
        assert_eq!(Rect::read(&mut input), rect);
    }

    #[test]
    fn test_checksum_tracks_geometry() {
        let mut a = Checksum::new();
        Rect::new(0.0, 0.0, 1.0, 1.0).add_to_checksum(&mut a);
        let mut b = Checksum::new();
        Rect::new(0.0, 0.0, 1.0, 2.0).add_to_checksum(&mut b);
        assert_ne!(a, b);
    }
}
