// SPDX-License-Identifier: MIT OR Apache-2.0
//! Values flowing through the graph.
//!
//! A value is immutable once produced; nodes that want a different value
//! construct a new one. Values are shared through [`ValuePtr`], which is cheap
//! to clone and never exposes mutable aliasing. Every concrete value type has
//! a [`SerializationInfo`] and is registered in the
//! [`TypeRegistry`](crate::registry::TypeRegistry) so it can be reconstructed
//! from a dynamic header.

use crate::registry::TypeRegistry;
use crate::serialization::{write_header, ObjectHeader, SerializationInfo};
use crate::stream::{InputStream, OutputStream};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Shared, immutable value
pub type ValuePtr = Arc<dyn Value>;

/// Data type that can flow through slots
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Boolean value
    Bool,
    /// 32-bit integer
    Int,
    /// 64-bit float
    Double,
    /// Integer or float
    Number,
    /// Text
    String,
    /// List of values
    List,
    /// Any type (for generic slots)
    Any,
    /// Type contributed by extension code
    Custom(String),
}

impl ValueType {
    /// Check if values of this (output) type may feed an input of `input` type
    pub fn can_connect_to(&self, input: &ValueType) -> bool {
        // Any type can connect to anything
        if matches!(self, Self::Any) || matches!(input, Self::Any) {
            return true;
        }

        if self == input {
            return true;
        }

        matches!(
            (self, input),
            (Self::Int | Self::Double, Self::Number) | (Self::Int | Self::Number, Self::Double)
        )
    }

    /// Check if a concrete value satisfies this type
    pub fn accepts(&self, value: &dyn Value) -> bool {
        value.value_type().can_connect_to(self)
    }

    /// Write the type tag
    pub fn write(&self, stream: &mut dyn OutputStream) {
        let tag = match self {
            Self::Bool => 0,
            Self::Int => 1,
            Self::Double => 2,
            Self::Number => 3,
            Self::String => 4,
            Self::List => 5,
            Self::Any => 6,
            Self::Custom(_) => 7,
        };
        stream.write_u8(tag);
        if let Self::Custom(name) = self {
            stream.write_str(name);
        }
    }

    /// Read a type tag
    pub fn read(stream: &mut dyn InputStream) -> Self {
        match stream.read_u8() {
            0 => Self::Bool,
            1 => Self::Int,
            2 => Self::Double,
            3 => Self::Number,
            4 => Self::String,
            5 => Self::List,
            6 => Self::Any,
            7 => Self::Custom(stream.read_str()),
            other => {
                stream.fail(crate::stream::StreamError::Malformed(format!(
                    "invalid value type tag {other}"
                )));
                Self::Any
            }
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("Bool"),
            Self::Int => f.write_str("Int"),
            Self::Double => f.write_str("Double"),
            Self::Number => f.write_str("Number"),
            Self::String => f.write_str("String"),
            Self::List => f.write_str("List"),
            Self::Any => f.write_str("Any"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// A typed unit of data
pub trait Value: fmt::Debug + Send + Sync + Any {
    /// Serialization record of the concrete type
    fn serialization_info(&self) -> &'static SerializationInfo;

    /// Type used for connection checks
    fn value_type(&self) -> ValueType;

    /// Deep copy
    fn clone_value(&self) -> Box<dyn Value>;

    /// Structural equality
    fn equals(&self, other: &dyn Value) -> bool;

    /// Human-readable representation
    fn to_display_string(&self) -> String;

    /// Read the fields written by [`Value::write`]. `version` is the stored
    /// version from the header; errors are reported through the stream.
    fn read(&mut self, stream: &mut dyn InputStream, version: u32, registry: &TypeRegistry);

    /// Write the fields (without header)
    fn write(&self, stream: &mut dyn OutputStream);

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;
}

impl<'a> dyn Value + 'a {
    /// Downcast to a concrete value type
    pub fn downcast_ref<T: Value>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Numeric view of integer and float values
    pub fn as_number(&self) -> Option<f64> {
        if let Some(int) = self.downcast_ref::<IntValue>() {
            return Some(f64::from(int.get()));
        }
        self.downcast_ref::<DoubleValue>().map(DoubleValue::get)
    }
}

/// Wrap a concrete value into a [`ValuePtr`]
pub fn share<V: Value>(value: V) -> ValuePtr {
    Arc::new(value)
}

/// Write a value behind a dynamic header
pub fn write_value(stream: &mut dyn OutputStream, value: &dyn Value) {
    write_header(stream, value.serialization_info());
    value.write(stream);
}

/// Read a value behind a dynamic header.
///
/// Returns `None` if the stream is (or ends up) in an error state; an
/// unregistered identifier fails the stream with `UnknownType`.
pub fn read_value(stream: &mut dyn InputStream, registry: &TypeRegistry) -> Option<ValuePtr> {
    let header = ObjectHeader::read(stream);
    if !stream.is_ok() {
        return None;
    }
    let mut value = match registry.create_value(&header.type_id) {
        Ok(value) => value,
        Err(e) => {
            stream.fail(e.into());
            return None;
        }
    };
    value.serialization_info().check_version(stream, header.version);
    if !stream.is_ok() {
        return None;
    }
    value.read(stream, header.version, registry);
    stream.is_ok().then(|| Arc::from(value))
}

/// Compare two optional values structurally
pub fn values_equal(a: Option<&ValuePtr>, b: Option<&ValuePtr>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.equals(b.as_ref()),
        (None, None) => true,
        _ => false,
    }
}

/// Boolean value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoolValue(bool);

impl BoolValue {
    /// Serialization record
    pub const SERIALIZATION_INFO: SerializationInfo = SerializationInfo::new("BoolValue", 1);

    /// Create a boolean value
    pub fn new(value: bool) -> Self {
        Self(value)
    }

    /// The wrapped boolean
    pub fn get(&self) -> bool {
        self.0
    }
}

impl Value for BoolValue {
    fn serialization_info(&self) -> &'static SerializationInfo {
        &Self::SERIALIZATION_INFO
    }

    fn value_type(&self) -> ValueType {
        ValueType::Bool
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(*self)
    }

    fn equals(&self, other: &dyn Value) -> bool {
        other.downcast_ref::<Self>() == Some(self)
    }

    fn to_display_string(&self) -> String {
        self.0.to_string()
    }

    fn read(&mut self, stream: &mut dyn InputStream, _version: u32, _registry: &TypeRegistry) {
        self.0 = stream.read_bool();
    }

    fn write(&self, stream: &mut dyn OutputStream) {
        stream.write_bool(self.0);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 32-bit integer value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntValue(i32);

impl IntValue {
    /// Serialization record
    pub const SERIALIZATION_INFO: SerializationInfo = SerializationInfo::new("IntValue", 1);

    /// Create an integer value
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// The wrapped integer
    pub fn get(&self) -> i32 {
        self.0
    }
}

impl Value for IntValue {
    fn serialization_info(&self) -> &'static SerializationInfo {
        &Self::SERIALIZATION_INFO
    }

    fn value_type(&self) -> ValueType {
        ValueType::Int
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(*self)
    }

    fn equals(&self, other: &dyn Value) -> bool {
        other.downcast_ref::<Self>() == Some(self)
    }

    fn to_display_string(&self) -> String {
        self.0.to_string()
    }

    fn read(&mut self, stream: &mut dyn InputStream, _version: u32, _registry: &TypeRegistry) {
        self.0 = stream.read_i32();
    }

    fn write(&self, stream: &mut dyn OutputStream) {
        stream.write_i32(self.0);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 64-bit float value
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DoubleValue(f64);

impl DoubleValue {
    /// Serialization record
    pub const SERIALIZATION_INFO: SerializationInfo = SerializationInfo::new("DoubleValue", 1);

    /// Create a float value
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// The wrapped float
    pub fn get(&self) -> f64 {
        self.0
    }
}

impl Value for DoubleValue {
    fn serialization_info(&self) -> &'static SerializationInfo {
        &Self::SERIALIZATION_INFO
    }

    fn value_type(&self) -> ValueType {
        ValueType::Double
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(*self)
    }

    fn equals(&self, other: &dyn Value) -> bool {
        other.downcast_ref::<Self>() == Some(self)
    }

    fn to_display_string(&self) -> String {
        self.0.to_string()
    }

    fn read(&mut self, stream: &mut dyn InputStream, _version: u32, _registry: &TypeRegistry) {
        self.0 = stream.read_f64();
    }

    fn write(&self, stream: &mut dyn OutputStream) {
        stream.write_f64(self.0);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Text value, stored on the wire as a wide string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringValue(String);

impl StringValue {
    /// Serialization record
    pub const SERIALIZATION_INFO: SerializationInfo = SerializationInfo::new("StringValue", 1);

    /// Create a text value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The wrapped text
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Value for StringValue {
    fn serialization_info(&self) -> &'static SerializationInfo {
        &Self::SERIALIZATION_INFO
    }

    fn value_type(&self) -> ValueType {
        ValueType::String
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn equals(&self, other: &dyn Value) -> bool {
        other.downcast_ref::<Self>() == Some(self)
    }

    fn to_display_string(&self) -> String {
        self.0.clone()
    }

    fn read(&mut self, stream: &mut dyn InputStream, _version: u32, _registry: &TypeRegistry) {
        self.0 = stream.read_wide_str();
    }

    fn write(&self, stream: &mut dyn OutputStream) {
        stream.write_wide_str(&self.0);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Ordered list of arbitrary registered values
#[derive(Debug, Clone, Default)]
pub struct ListValue(Vec<ValuePtr>);

impl ListValue {
    /// Serialization record
    pub const SERIALIZATION_INFO: SerializationInfo = SerializationInfo::new("ListValue", 1);

    /// Create a list value
    pub fn new(items: Vec<ValuePtr>) -> Self {
        Self(items)
    }

    /// The items
    pub fn items(&self) -> &[ValuePtr] {
        &self.0
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list has no items
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Value for ListValue {
    fn serialization_info(&self) -> &'static SerializationInfo {
        &Self::SERIALIZATION_INFO
    }

    fn value_type(&self) -> ValueType {
        ValueType::List
    }

    fn clone_value(&self) -> Box<dyn Value> {
        let items = self
            .0
            .iter()
            .map(|item| Arc::from(item.clone_value()))
            .collect();
        Box::new(Self(items))
    }

    fn equals(&self, other: &dyn Value) -> bool {
        other.downcast_ref::<Self>().is_some_and(|other| {
            self.0.len() == other.0.len()
                && self.0.iter().zip(&other.0).all(|(a, b)| a.equals(b.as_ref()))
        })
    }

    fn to_display_string(&self) -> String {
        let items: Vec<String> = self.0.iter().map(|item| item.to_display_string()).collect();
        format!("[{}]", items.join(", "))
    }

    fn read(&mut self, stream: &mut dyn InputStream, _version: u32, registry: &TypeRegistry) {
        let count = stream.read_count();
        self.0.clear();
        for _ in 0..count {
            match read_value(stream, registry) {
                Some(item) => self.0.push(item),
                None => return,
            }
        }
    }

    fn write(&self, stream: &mut dyn OutputStream) {
        stream.write_count(self.0.len());
        for item in &self.0 {
            write_value(stream, item.as_ref());
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Register the built-in value types
pub fn register_builtin_values(registry: &mut TypeRegistry) {
    registry.register_value_type::<BoolValue>();
    registry.register_value_type::<IntValue>();
    registry.register_value_type::<DoubleValue>();
    registry.register_value_type::<StringValue>();
    registry.register_value_type::<ListValue>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::builtin_registry;
    use crate::stream::{MemoryInputStream, MemoryOutputStream, StreamError};

    fn round_trip(value: &dyn Value) -> ValuePtr {
        let mut out = MemoryOutputStream::new();
        write_value(&mut out, value);
        let bytes = out.into_inner().unwrap();
        let registry = builtin_registry();
        let mut input = MemoryInputStream::new(&bytes);
        let read = read_value(&mut input, &registry).unwrap();
        assert!(input.is_at_end());
        read
    }

    #[test]
    fn test_type_compatibility() {
        assert!(ValueType::Int.can_connect_to(&ValueType::Number));
        assert!(ValueType::Double.can_connect_to(&ValueType::Number));
        assert!(ValueType::Int.can_connect_to(&ValueType::Double));
        assert!(ValueType::String.can_connect_to(&ValueType::Any));
        assert!(ValueType::Any.can_connect_to(&ValueType::Int));
        assert!(!ValueType::Number.can_connect_to(&ValueType::Int));
        assert!(!ValueType::String.can_connect_to(&ValueType::Number));
        assert!(ValueType::Custom("Color".into()).can_connect_to(&ValueType::Custom("Color".into())));
        assert!(!ValueType::Custom("Color".into()).can_connect_to(&ValueType::String));
    }

    #[test]
    fn test_structural_equality() {
        assert!(IntValue::new(3).equals(&IntValue::new(3)));
        assert!(!IntValue::new(3).equals(&IntValue::new(4)));
        assert!(!IntValue::new(3).equals(&DoubleValue::new(3.0)));

        let a = ListValue::new(vec![share(IntValue::new(1)), share(StringValue::new("x"))]);
        let b = ListValue::new(vec![share(IntValue::new(1)), share(StringValue::new("x"))]);
        assert!(a.equals(&b));
        assert!(a.clone_value().equals(&a));
    }

    #[test]
    fn test_display() {
        assert_eq!(IntValue::new(-5).to_display_string(), "-5");
        assert_eq!(DoubleValue::new(2.5).to_display_string(), "2.5");
        let list = ListValue::new(vec![share(BoolValue::new(true)), share(IntValue::new(7))]);
        assert_eq!(list.to_display_string(), "[true, 7]");
    }

    #[test]
    fn test_number_view() {
        let int: ValuePtr = share(IntValue::new(4));
        let double: ValuePtr = share(DoubleValue::new(0.5));
        let text: ValuePtr = share(StringValue::new("4"));
        assert_eq!(int.as_number(), Some(4.0));
        assert_eq!(double.as_number(), Some(0.5));
        assert_eq!(text.as_number(), None);
    }

    #[test]
    fn test_dynamic_round_trip_of_nested_list() {
        let inner = ListValue::new(vec![share(DoubleValue::new(1.5))]);
        let list = ListValue::new(vec![
            share(StringValue::new("héllo")),
            share(inner),
            share(BoolValue::new(false)),
        ]);
        let read = round_trip(&list);
        assert!(read.equals(&list));
    }

    #[test]
    fn test_unknown_value_type() {
        let mut out = MemoryOutputStream::new();
        write_header(&mut out, &SerializationInfo::new("FutureValue", 1));
        out.write_i32(1);
        let bytes = out.into_inner().unwrap();

        let registry = builtin_registry();
        let mut input = MemoryInputStream::new(&bytes);
        assert!(read_value(&mut input, &registry).is_none());
        assert_eq!(input.status(), Err(StreamError::UnknownType("FutureValue".into())));
    }

    #[test]
    fn test_value_type_tags() {
        let mut out = MemoryOutputStream::new();
        ValueType::Custom("Color".into()).write(&mut out);
        ValueType::Number.write(&mut out);
        let bytes = out.into_inner().unwrap();
        let mut input = MemoryInputStream::new(&bytes);
        assert_eq!(ValueType::read(&mut input), ValueType::Custom("Color".into()));
        assert_eq!(ValueType::read(&mut input), ValueType::Number);
    }
}
