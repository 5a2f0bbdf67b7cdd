// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node kinds.

pub mod arithmetic;
pub mod input;
pub mod list;
pub mod viewer;

pub use arithmetic::{AdditionNode, IncreaseNode, MultiplicationNode};
pub use input::ConstantNode;
pub use list::ListBuilderNode;
pub use viewer::ViewerNode;

use crate::registry::TypeRegistry;

/// Register every built-in node kind
pub fn register_builtin_nodes(registry: &mut TypeRegistry) {
    registry.register_node_type::<ConstantNode>();
    registry.register_node_type::<AdditionNode>();
    registry.register_node_type::<MultiplicationNode>();
    registry.register_node_type::<IncreaseNode>();
    registry.register_node_type::<ListBuilderNode>();
    registry.register_node_type::<ViewerNode>();
}
