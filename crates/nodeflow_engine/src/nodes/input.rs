// SPDX-License-Identifier: MIT OR Apache-2.0
//! Source nodes.

use crate::evaluation::{CalculationError, InputValues, NodeOutput};
use crate::node::NodeKind;
use crate::registry::TypeRegistry;
use crate::serialization::SerializationInfo;
use crate::slot::{InputSlot, OutputSlot};
use crate::stream::{InputStream, OutputStream};
use crate::value::{read_value, share, write_value, IntValue, ValuePtr};
use std::any::Any;

/// Outputs a stored value
#[derive(Debug, Clone)]
pub struct ConstantNode {
    value: ValuePtr,
}

impl ConstantNode {
    /// Serialization record
    pub const SERIALIZATION_INFO: SerializationInfo = SerializationInfo::new("ConstantNode", 1);

    /// Create a constant. The output slot takes the value's type.
    pub fn new(value: ValuePtr) -> Self {
        Self { value }
    }

    /// The stored value
    pub fn value(&self) -> &ValuePtr {
        &self.value
    }

    /// Replace the stored value. Inside a graph, apply this through
    /// `Graph::update_kind` so the output slot follows the new type.
    pub fn set_value(&mut self, value: ValuePtr) {
        self.value = value;
    }
}

impl Default for ConstantNode {
    fn default() -> Self {
        Self::new(share(IntValue::new(0)))
    }
}

impl NodeKind for ConstantNode {
    fn serialization_info(&self) -> &'static SerializationInfo {
        &Self::SERIALIZATION_INFO
    }

    fn input_slots(&self) -> Vec<InputSlot> {
        Vec::new()
    }

    fn output_slots(&self) -> Vec<OutputSlot> {
        vec![OutputSlot::new("out", self.value.value_type()).with_name("Value")]
    }

    fn calculate(&self, _inputs: &InputValues<'_>) -> Result<NodeOutput, CalculationError> {
        Ok(NodeOutput::single("out", self.value.clone()))
    }

    fn read(&mut self, stream: &mut dyn InputStream, _version: u32, registry: &TypeRegistry) {
        if let Some(value) = read_value(stream, registry) {
            self.value = value;
        }
    }

    fn write(&self, stream: &mut dyn OutputStream) {
        write_value(stream, self.value.as_ref());
    }

    fn clone_kind(&self) -> Box<dyn NodeKind> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
