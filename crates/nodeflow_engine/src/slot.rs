// SPDX-License-Identifier: MIT OR Apache-2.0
//! Slot definitions for node inputs/outputs.
//!
//! Slots only describe a connection point. The connections themselves are an
//! edge list owned by the [`Graph`](crate::graph::Graph), which keeps both
//! directions consistent.

use crate::registry::TypeRegistry;
use crate::stream::{InputStream, OutputStream, StreamError};
use crate::value::{read_value, values_equal, write_value, ValuePtr, ValueType};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Identifier of a slot, unique among a node's inputs and separately among its outputs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(String);

impl SlotId {
    /// Create a slot ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read from a stream
    pub fn read(stream: &mut dyn InputStream) -> Self {
        Self(stream.read_str())
    }

    /// Write to a stream
    pub fn write(&self, stream: &mut dyn OutputStream) {
        stream.write_str(&self.0);
    }
}

impl Borrow<str> for SlotId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SlotId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How many upstream outputs an input accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionMode {
    /// At most one upstream output
    #[default]
    Single,
    /// Any number of distinct upstream outputs, kept in connection order
    Multiple,
}

impl ConnectionMode {
    fn write(self, stream: &mut dyn OutputStream) {
        stream.write_u8(match self {
            Self::Single => 0,
            Self::Multiple => 1,
        });
    }

    fn read(stream: &mut dyn InputStream) -> Self {
        match stream.read_u8() {
            0 => Self::Single,
            1 => Self::Multiple,
            other => {
                stream.fail(StreamError::Malformed(format!("invalid connection mode {other}")));
                Self::Single
            }
        }
    }
}

/// Slot direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotDirection {
    /// Input slot
    Input,
    /// Output slot
    Output,
}

/// Input slot of a node
#[derive(Debug, Clone)]
pub struct InputSlot {
    id: SlotId,
    name: String,
    value_type: ValueType,
    default_value: Option<ValuePtr>,
    mode: ConnectionMode,
}

impl InputSlot {
    /// Create a single-connection input without a default value
    pub fn new(id: impl Into<SlotId>, value_type: ValueType) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            value_type,
            default_value: None,
            mode: ConnectionMode::Single,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the default value
    pub fn with_default(mut self, value: ValuePtr) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Set the connection mode
    pub fn with_mode(mut self, mode: ConnectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Slot ID
    pub fn id(&self) -> &SlotId {
        &self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accepted value type
    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// Value used while nothing is connected
    pub fn default_value(&self) -> Option<&ValuePtr> {
        self.default_value.as_ref()
    }

    /// Connection arity policy
    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    pub(crate) fn set_default_value(&mut self, value: Option<ValuePtr>) {
        self.default_value = value;
    }

    /// Read a slot record
    pub fn read(stream: &mut dyn InputStream, registry: &TypeRegistry) -> Self {
        let id = SlotId::read(stream);
        let name = stream.read_wide_str();
        let value_type = ValueType::read(stream);
        let mode = ConnectionMode::read(stream);
        let default_value = if stream.read_bool() {
            read_value(stream, registry)
        } else {
            None
        };
        Self {
            id,
            name,
            value_type,
            default_value,
            mode,
        }
    }

    /// Write a slot record
    pub fn write(&self, stream: &mut dyn OutputStream) {
        self.id.write(stream);
        stream.write_wide_str(&self.name);
        self.value_type.write(stream);
        self.mode.write(stream);
        stream.write_bool(self.default_value.is_some());
        if let Some(value) = &self.default_value {
            write_value(stream, value.as_ref());
        }
    }
}

impl PartialEq for InputSlot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.value_type == other.value_type
            && self.mode == other.mode
            && values_equal(self.default_value.as_ref(), other.default_value.as_ref())
    }
}

/// Output slot of a node
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSlot {
    id: SlotId,
    name: String,
    value_type: ValueType,
}

impl OutputSlot {
    /// Create an output slot
    pub fn new(id: impl Into<SlotId>, value_type: ValueType) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            value_type,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Slot ID
    pub fn id(&self) -> &SlotId {
        &self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Produced value type
    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// Read a slot record
    pub fn read(stream: &mut dyn InputStream) -> Self {
        let id = SlotId::read(stream);
        let name = stream.read_wide_str();
        let value_type = ValueType::read(stream);
        Self { id, name, value_type }
    }

    /// Write a slot record
    pub fn write(&self, stream: &mut dyn OutputStream) {
        self.id.write(stream);
        stream.write_wide_str(&self.name);
        self.value_type.write(stream);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::builtin_registry;
    use crate::stream::{MemoryInputStream, MemoryOutputStream};
    use crate::value::{share, IntValue};

    #[test]
    fn test_builder_defaults() {
        let slot = InputSlot::new("in1", ValueType::Int);
        assert_eq!(slot.name(), "in1");
        assert_eq!(slot.mode(), ConnectionMode::Single);
        assert!(slot.default_value().is_none());

        let slot = slot
            .with_name("First Input")
            .with_mode(ConnectionMode::Multiple)
            .with_default(share(IntValue::new(1)));
        assert_eq!(slot.name(), "First Input");
        assert_eq!(slot.mode(), ConnectionMode::Multiple);
        assert!(slot.default_value().is_some());
    }

    #[test]
    fn test_slot_records_round_trip() {
        let input = InputSlot::new("a", ValueType::Number)
            .with_name("Ä input")
            .with_default(share(IntValue::new(4)));
        let bare = InputSlot::new("b", ValueType::Custom("Color".into()))
            .with_mode(ConnectionMode::Multiple);
        let output = OutputSlot::new("out", ValueType::Int).with_name("Result");

        let mut out = MemoryOutputStream::new();
        input.write(&mut out);
        bare.write(&mut out);
        output.write(&mut out);
        let bytes = out.into_inner().unwrap();

        let registry = builtin_registry();
        let mut stream = MemoryInputStream::new(&bytes);
        assert_eq!(InputSlot::read(&mut stream, &registry), input);
        assert_eq!(InputSlot::read(&mut stream, &registry), bare);
        assert_eq!(OutputSlot::read(&mut stream), output);
        assert!(stream.is_at_end());
    }

    #[test]
    fn test_slot_id_lookup_by_str() {
        let mut map = indexmap::IndexMap::new();
        map.insert(SlotId::new("in"), 1);
        assert_eq!(map.get("in"), Some(&1));
    }
}
