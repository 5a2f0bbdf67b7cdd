// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named groups of nodes and their cached frame layout.

use crate::checksum::Checksum;
use crate::collection::NodeCollection;
use crate::geometry::{Point, Rect, Size};
use crate::node::NodeId;
use crate::serialization::{read_static_header, write_header, SerializationInfo};
use crate::stream::{InputStream, OutputStream};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub Uuid);

impl GroupId {
    /// Create a new random group ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Read 16 raw bytes
    pub fn read(stream: &mut dyn InputStream) -> Self {
        let mut bytes = [0u8; 16];
        stream.read_bytes(&mut bytes);
        Self(Uuid::from_bytes(bytes))
    }

    /// Write 16 raw bytes
    pub fn write(&self, stream: &mut dyn OutputStream) {
        stream.write_bytes(self.0.as_bytes());
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Measurement surface supplied by presentation code.
///
/// The engine only reads from it; it never draws.
pub trait NodeRectProvider {
    /// Frame of a node in model space, if the node is laid out
    fn node_rect(&self, node_id: NodeId) -> Option<Rect>;

    /// Extent of a single line of text
    fn measure_text(&self, text: &str) -> Size;
}

/// A named set of nodes drawn inside a common frame
#[derive(Debug, Clone)]
pub struct NodeGroup {
    name: String,
    pub(crate) nodes: NodeCollection,
    layout: Option<(Checksum, Rect)>,
}

impl NodeGroup {
    /// Serialization record
    pub const SERIALIZATION_INFO: SerializationInfo = SerializationInfo::new("NodeGroup", 1);

    /// Create a group
    pub fn new(name: impl Into<String>, nodes: NodeCollection) -> Self {
        Self {
            name: name.into(),
            nodes,
            layout: None,
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Member nodes
    pub fn nodes(&self) -> &NodeCollection {
        &self.nodes
    }

    /// Frame enclosing the members plus a title line.
    ///
    /// The result is cached and recomputed only when the name, the padding or
    /// any member rectangle changed. Returns `None` if no member is laid out.
    pub fn layout(&mut self, provider: &dyn NodeRectProvider, padding: f64) -> Option<Rect> {
        let rects: Vec<Rect> = self.nodes.iter().filter_map(|id| provider.node_rect(id)).collect();

        let mut checksum = Checksum::new();
        checksum.add_str(&self.name);
        checksum.add_f64(padding);
        checksum.add_u64(rects.len() as u64);
        for rect in &rects {
            rect.add_to_checksum(&mut checksum);
        }

        if let Some((cached_checksum, rect)) = self.layout {
            if cached_checksum == checksum {
                return Some(rect);
            }
        }

        let bounds = Rect::bounding(&rects)?;
        let text = provider.measure_text(&self.name);
        let position = bounds.position - Point::new(padding, 2.0 * padding + text.height);
        let size = Size::new(
            text.width.max(bounds.size.width) + 2.0 * padding,
            bounds.size.height + 3.0 * padding + text.height,
        );
        let rect = Rect::from_position_and_size(position, size);
        self.layout = Some((checksum, rect));
        Some(rect)
    }

    /// Read a group body behind its static header
    pub fn read(stream: &mut dyn InputStream) -> Self {
        read_static_header(stream, &Self::SERIALIZATION_INFO);
        let name = stream.read_wide_str();
        let nodes = NodeCollection::read(stream);
        Self::new(name, nodes)
    }

    /// Write a group body behind its static header
    pub fn write(&self, stream: &mut dyn OutputStream) {
        write_header(stream, &Self::SERIALIZATION_INFO);
        stream.write_wide_str(&self.name);
        self.nodes.write(stream);
    }
}

impl PartialEq for NodeGroup {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.nodes == other.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{MemoryInputStream, MemoryOutputStream};
    use std::cell::Cell;
    use std::collections::HashMap;

    struct FixedRects {
        rects: HashMap<NodeId, Rect>,
        measured: Cell<usize>,
    }

    impl NodeRectProvider for FixedRects {
        fn node_rect(&self, node_id: NodeId) -> Option<Rect> {
            self.rects.get(&node_id).copied()
        }

        fn measure_text(&self, text: &str) -> Size {
            self.measured.set(self.measured.get() + 1);
            Size::new(text.chars().count() as f64 * 10.0, 12.0)
        }
    }

    #[test]
    fn test_layout_encloses_members_and_title() {
        let (a, b) = (NodeId::new(), NodeId::new());
        let provider = FixedRects {
            rects: HashMap::from([
                (a, Rect::new(0.0, 0.0, 100.0, 50.0)),
                (b, Rect::new(150.0, 100.0, 100.0, 50.0)),
            ]),
            measured: Cell::new(0),
        };
        let mut group = NodeGroup::new("Math", [a, b].into_iter().collect());

        let rect = group.layout(&provider, 8.0).unwrap();
        assert_eq!(rect, Rect::new(-8.0, -28.0, 266.0, 186.0));

        // Unchanged inputs reuse the cached frame.
        group.layout(&provider, 8.0);
        assert_eq!(provider.measured.get(), 1);

        // A different padding invalidates it.
        group.layout(&provider, 4.0);
        assert_eq!(provider.measured.get(), 2);
    }

    #[test]
    fn test_layout_without_rects() {
        let provider = FixedRects {
            rects: HashMap::new(),
            measured: Cell::new(0),
        };
        let mut group = NodeGroup::new("Empty", NodeCollection::single(NodeId::new()));
        assert_eq!(group.layout(&provider, 8.0), None);
    }

    #[test]
    fn test_group_record_round_trip() {
        let group = NodeGroup::new("Grüße", (0..2).map(|_| NodeId::new()).collect());
        let mut out = MemoryOutputStream::new();
        group.write(&mut out);
        let bytes = out.into_inner().unwrap();

        let mut input = MemoryInputStream::new(&bytes);
        assert_eq!(NodeGroup::read(&mut input), group);
        assert!(input.is_at_end());
    }
}
