// SPDX-License-Identifier: MIT OR Apache-2.0
//! List construction.

use crate::evaluation::{CalculationError, InputValues, NodeOutput};
use crate::node::NodeKind;
use crate::serialization::SerializationInfo;
use crate::slot::{ConnectionMode, InputSlot, OutputSlot, SlotId};
use crate::value::{share, ListValue, ValueType};
use std::any::Any;

/// Collects every connected value into a list, in connection order
#[derive(Debug, Clone, Copy, Default)]
pub struct ListBuilderNode;

impl ListBuilderNode {
    /// Serialization record
    pub const SERIALIZATION_INFO: SerializationInfo = SerializationInfo::new("ListBuilderNode", 1);
}

impl NodeKind for ListBuilderNode {
    fn serialization_info(&self) -> &'static SerializationInfo {
        &Self::SERIALIZATION_INFO
    }

    fn input_slots(&self) -> Vec<InputSlot> {
        vec![InputSlot::new("items", ValueType::Any).with_mode(ConnectionMode::Multiple)]
    }

    fn output_slots(&self) -> Vec<OutputSlot> {
        vec![OutputSlot::new("list", ValueType::List)]
    }

    fn calculate(&self, inputs: &InputValues<'_>) -> Result<NodeOutput, CalculationError> {
        let items = inputs
            .all("items")
            .into_iter()
            .map(|item| item.cloned().ok_or_else(|| CalculationError::MissingInput(SlotId::new("items"))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NodeOutput::single("list", share(ListValue::new(items))))
    }

    fn clone_kind(&self) -> Box<dyn NodeKind> {
        Box::new(*self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
