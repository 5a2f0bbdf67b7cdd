// SPDX-License-Identifier: MIT OR Apache-2.0
//! Arithmetic nodes.
//!
//! Integer operands produce an integer result; any float operand promotes
//! the result to a float. Integer overflow is a calculation failure.

use crate::evaluation::{CalculationError, InputValues, NodeOutput};
use crate::node::NodeKind;
use crate::serialization::SerializationInfo;
use crate::slot::{InputSlot, OutputSlot};
use crate::value::{share, DoubleValue, IntValue, ValuePtr, ValueType};
use std::any::Any;

fn number_input(id: &str) -> InputSlot {
    InputSlot::new(id, ValueType::Number).with_default(share(IntValue::new(0)))
}

fn binary(
    inputs: &InputValues<'_>,
    name: &str,
    int_op: fn(i32, i32) -> Option<i32>,
    float_op: fn(f64, f64) -> f64,
) -> Result<ValuePtr, CalculationError> {
    let a = inputs.single("a")?;
    let b = inputs.single("b")?;
    if let (Some(a), Some(b)) = (a.downcast_ref::<IntValue>(), b.downcast_ref::<IntValue>()) {
        return int_op(a.get(), b.get())
            .map(|result| share(IntValue::new(result)))
            .ok_or_else(|| CalculationError::Failed(format!("integer overflow in {name}")));
    }
    Ok(share(DoubleValue::new(float_op(
        inputs.number("a")?,
        inputs.number("b")?,
    ))))
}

/// Adds its two inputs
#[derive(Debug, Clone, Copy, Default)]
pub struct AdditionNode;

impl AdditionNode {
    /// Serialization record
    pub const SERIALIZATION_INFO: SerializationInfo = SerializationInfo::new("AdditionNode", 1);
}

impl NodeKind for AdditionNode {
    fn serialization_info(&self) -> &'static SerializationInfo {
        &Self::SERIALIZATION_INFO
    }

    fn input_slots(&self) -> Vec<InputSlot> {
        vec![number_input("a"), number_input("b")]
    }

    fn output_slots(&self) -> Vec<OutputSlot> {
        vec![OutputSlot::new("result", ValueType::Number).with_name("Sum")]
    }

    fn calculate(&self, inputs: &InputValues<'_>) -> Result<NodeOutput, CalculationError> {
        let sum = binary(inputs, "addition", i32::checked_add, |a, b| a + b)?;
        Ok(NodeOutput::single("result", sum))
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

/// Multiplies its two inputs
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiplicationNode;

impl MultiplicationNode {
    /// Serialization record
    pub const SERIALIZATION_INFO: SerializationInfo = SerializationInfo::new("MultiplicationNode", 1);
}

impl NodeKind for MultiplicationNode {
    fn serialization_info(&self) -> &'static SerializationInfo {
        &Self::SERIALIZATION_INFO
    }

    fn input_slots(&self) -> Vec<InputSlot> {
        vec![
            number_input("a").with_default(share(IntValue::new(1))),
            number_input("b").with_default(share(IntValue::new(1))),
        ]
    }

    fn output_slots(&self) -> Vec<OutputSlot> {
        vec![OutputSlot::new("result", ValueType::Number).with_name("Product")]
    }

    fn calculate(&self, inputs: &InputValues<'_>) -> Result<NodeOutput, CalculationError> {
        let product = binary(inputs, "multiplication", i32::checked_mul, |a, b| a * b)?;
        Ok(NodeOutput::single("result", product))
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

/// Adds one to an integer
#[derive(Debug, Clone, Copy, Default)]
pub struct IncreaseNode;

impl IncreaseNode {
    /// Serialization record
    pub const SERIALIZATION_INFO: SerializationInfo = SerializationInfo::new("IncreaseNode", 1);
}

impl NodeKind for IncreaseNode {
    fn serialization_info(&self) -> &'static SerializationInfo {
        &Self::SERIALIZATION_INFO
    }

    fn input_slots(&self) -> Vec<InputSlot> {
        vec![InputSlot::new("in", ValueType::Int)]
    }

    fn output_slots(&self) -> Vec<OutputSlot> {
        vec![OutputSlot::new("out", ValueType::Int)]
    }

    fn calculate(&self, inputs: &InputValues<'_>) -> Result<NodeOutput, CalculationError> {
        let value = inputs.int("in")?;
        let increased = value
            .checked_add(1)
            .ok_or_else(|| CalculationError::Failed("integer overflow in increase".into()))?;
        Ok(NodeOutput::single("out", share(IntValue::new(increased))))
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
