// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::node::NodeId;
use crate::slot::SlotId;
use crate::stream::{InputStream, OutputStream};
use serde::{Deserialize, Serialize};

/// A connection from an output slot to an input slot.
///
/// A connection is identified by its four endpoints; the graph never holds
/// the same connection twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Source node ID
    pub from_node: NodeId,
    /// Source output slot
    pub from_slot: SlotId,
    /// Target node ID
    pub to_node: NodeId,
    /// Target input slot
    pub to_slot: SlotId,
}

impl Connection {
    /// Create a new connection
    pub fn new(
        from_node: NodeId,
        from_slot: impl Into<SlotId>,
        to_node: NodeId,
        to_slot: impl Into<SlotId>,
    ) -> Self {
        Self {
            from_node,
            from_slot: from_slot.into(),
            to_node,
            to_slot: to_slot.into(),
        }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }

    /// Check if this connection ends at a specific input
    pub fn targets(&self, node_id: NodeId, slot: &str) -> bool {
        self.to_node == node_id && self.to_slot.as_str() == slot
    }

    /// Check if this connection starts at a specific output
    pub fn originates(&self, node_id: NodeId, slot: &str) -> bool {
        self.from_node == node_id && self.from_slot.as_str() == slot
    }

    /// Read a connection record
    pub fn read(stream: &mut dyn InputStream) -> Self {
        let from_node = NodeId::read(stream);
        let from_slot = SlotId::read(stream);
        let to_node = NodeId::read(stream);
        let to_slot = SlotId::read(stream);
        Self {
            from_node,
            from_slot,
            to_node,
            to_slot,
        }
    }

    /// Write a connection record
    pub fn write(&self, stream: &mut dyn OutputStream) {
        self.from_node.write(stream);
        self.from_slot.write(stream);
        self.to_node.write(stream);
        self.to_slot.write(stream);
    }
}
