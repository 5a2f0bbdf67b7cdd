// SPDX-License-Identifier: MIT OR Apache-2.0
//! Text rendering of values for inspection.

use crate::evaluation::{CalculationError, InputValues, NodeOutput};
use crate::node::NodeKind;
use crate::registry::TypeRegistry;
use crate::serialization::SerializationInfo;
use crate::slot::{ConnectionMode, InputSlot, OutputSlot};
use crate::stream::{InputStream, OutputStream};
use crate::value::{share, IntValue, StringValue, ValueType};
use std::any::Any;

/// Placeholder line for an input without a value
pub const NO_VALUE: &str = "<no value>";

/// Default page size
pub const DEFAULT_LINES_PER_PAGE: u32 = 5;

/// Renders every connected value as one line of text.
///
/// Version 1 records carry no fields; version 2 added `lines_per_page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerNode {
    lines_per_page: u32,
}

impl ViewerNode {
    /// Serialization record
    pub const SERIALIZATION_INFO: SerializationInfo = SerializationInfo::new("ViewerNode", 2);

    /// Create a viewer with the given page size (at least one line)
    pub fn new(lines_per_page: u32) -> Self {
        Self {
            lines_per_page: lines_per_page.max(1),
        }
    }

    /// Lines shown per page
    pub fn lines_per_page(&self) -> u32 {
        self.lines_per_page
    }

    /// Change the page size (at least one line)
    pub fn set_lines_per_page(&mut self, lines_per_page: u32) {
        self.lines_per_page = lines_per_page.max(1);
    }
}

impl Default for ViewerNode {
    fn default() -> Self {
        Self::new(DEFAULT_LINES_PER_PAGE)
    }
}

impl NodeKind for ViewerNode {
    fn serialization_info(&self) -> &'static SerializationInfo {
        &Self::SERIALIZATION_INFO
    }

    fn input_slots(&self) -> Vec<InputSlot> {
        vec![InputSlot::new("values", ValueType::Any).with_mode(ConnectionMode::Multiple)]
    }

    fn output_slots(&self) -> Vec<OutputSlot> {
        vec![
            OutputSlot::new("text", ValueType::String),
            OutputSlot::new("page_count", ValueType::Int).with_name("Pages"),
        ]
    }

    fn calculate(&self, inputs: &InputValues<'_>) -> Result<NodeOutput, CalculationError> {
        let lines: Vec<String> = inputs
            .all("values")
            .into_iter()
            .map(|value| value.map_or_else(|| NO_VALUE.to_string(), |v| v.to_display_string()))
            .collect();

        let per_page = self.lines_per_page.max(1) as usize;
        let pages = lines.len().div_ceil(per_page).max(1);
        let pages = i32::try_from(pages)
            .map_err(|_| CalculationError::Failed("too many pages".into()))?;

        Ok(NodeOutput::single("text", share(StringValue::new(lines.join("\n"))))
            .with("page_count", share(IntValue::new(pages))))
    }

    fn read(&mut self, stream: &mut dyn InputStream, version: u32, _registry: &TypeRegistry) {
        if version >= 2 {
            self.lines_per_page = stream.read_u32().max(1);
        } else {
            self.lines_per_page = DEFAULT_LINES_PER_PAGE;
        }
    }

    fn write(&self, stream: &mut dyn OutputStream) {
        stream.write_u32(self.lines_per_page);
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
