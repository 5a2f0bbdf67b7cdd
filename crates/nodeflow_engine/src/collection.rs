// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ordered, deduplicated set of node identities.
//!
//! Used for selections, groups and traversal frontiers. A collection only
//! refers to nodes by ID and never owns them.

use crate::node::NodeId;
use crate::serialization::{read_static_header, write_header, SerializationInfo};
use crate::stream::{InputStream, OutputStream};
use indexmap::IndexSet;

/// Insertion-ordered node ID set
#[derive(Debug, Clone, Default)]
pub struct NodeCollection {
    nodes: IndexSet<NodeId>,
}

impl NodeCollection {
    /// Serialization record
    pub const SERIALIZATION_INFO: SerializationInfo = SerializationInfo::new("NodeCollection", 1);

    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection holding a single node
    pub fn single(node_id: NodeId) -> Self {
        let mut collection = Self::new();
        collection.insert(node_id);
        collection
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `node_id` is a member
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains(&node_id)
    }

    /// Number of members
    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    /// Most recently inserted member, or [`NodeId::NULL`]
    pub fn last(&self) -> NodeId {
        self.nodes.last().copied().unwrap_or(NodeId::NULL)
    }

    /// Members in insertion order
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    /// Visit members in order until `processor` returns `false`
    pub fn enumerate(&self, mut processor: impl FnMut(NodeId) -> bool) {
        for node_id in &self.nodes {
            if !processor(*node_id) {
                return;
            }
        }
    }

    /// Append a member. Returns `false` if it was already present.
    pub fn insert(&mut self, node_id: NodeId) -> bool {
        self.nodes.insert(node_id)
    }

    /// Remove a member, keeping the order of the rest. No-op for non-members.
    pub fn erase(&mut self, node_id: NodeId) -> bool {
        self.nodes.shift_remove(&node_id)
    }

    /// Remove every member
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Keep only members satisfying `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(NodeId) -> bool) {
        self.nodes.retain(|id| keep(*id));
    }

    /// Read a collection behind its static header
    pub fn read(stream: &mut dyn InputStream) -> Self {
        let mut collection = Self::new();
        read_static_header(stream, &Self::SERIALIZATION_INFO);
        let count = stream.read_count();
        for _ in 0..count {
            if !stream.is_ok() {
                break;
            }
            collection.insert(NodeId::read(stream));
        }
        collection
    }

    /// Write a collection behind its static header
    pub fn write(&self, stream: &mut dyn OutputStream) {
        write_header(stream, &Self::SERIALIZATION_INFO);
        stream.write_count(self.nodes.len());
        for node_id in &self.nodes {
            node_id.write(stream);
        }
    }
}

impl PartialEq for NodeCollection {
    /// Equal when both hold the same members in the same order
    fn eq(&self, other: &Self) -> bool {
        self.nodes.iter().eq(other.nodes.iter())
    }
}

impl Eq for NodeCollection {}

impl FromIterator<NodeId> for NodeCollection {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a NodeCollection {
    type Item = &'a NodeId;
    type IntoIter = indexmap::set::Iter<'a, NodeId>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{MemoryInputStream, MemoryOutputStream, StreamError};

    #[test]
    fn test_insert_is_deduplicated() {
        let id = NodeId::new();
        let mut collection = NodeCollection::new();
        assert!(collection.insert(id));
        assert!(!collection.insert(id));
        assert_eq!(collection.count(), 1);
        assert_eq!(collection.last(), id);
    }

    #[test]
    fn test_erase_non_member_is_noop() {
        let mut collection = NodeCollection::single(NodeId::new());
        assert!(!collection.erase(NodeId::new()));
        assert_eq!(collection.count(), 1);
    }

    #[test]
    fn test_order_after_interleaved_operations() {
        let ids: Vec<NodeId> = (0..4).map(|_| NodeId::new()).collect();
        let mut collection = NodeCollection::new();
        collection.insert(ids[0]);
        collection.insert(ids[1]);
        collection.insert(ids[2]);
        collection.erase(ids[1]);
        collection.insert(ids[3]);
        collection.insert(ids[1]);
        let order: Vec<NodeId> = collection.iter().collect();
        assert_eq!(order, vec![ids[0], ids[2], ids[3], ids[1]]);
        assert_eq!(collection.last(), ids[1]);
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let (a, b) = (NodeId::new(), NodeId::new());
        let ab: NodeCollection = [a, b].into_iter().collect();
        let ba: NodeCollection = [b, a].into_iter().collect();
        assert_ne!(ab, ba);
        assert_eq!(ab, ab.clone());
    }

    #[test]
    fn test_empty_collection() {
        let collection = NodeCollection::new();
        assert!(collection.is_empty());
        assert_eq!(collection.last(), NodeId::NULL);
    }

    #[test]
    fn test_enumerate_stops_early() {
        let collection: NodeCollection = (0..5).map(|_| NodeId::new()).collect();
        let mut visited = 0;
        collection.enumerate(|_| {
            visited += 1;
            visited < 2
        });
        assert_eq!(visited, 2);
    }

    #[test]
    fn test_stream_round_trip() {
        let collection: NodeCollection = (0..3).map(|_| NodeId::new()).collect();
        let mut out = MemoryOutputStream::new();
        collection.write(&mut out);
        let bytes = out.into_inner().unwrap();

        let mut input = MemoryInputStream::new(&bytes);
        assert_eq!(NodeCollection::read(&mut input), collection);
        assert!(input.is_at_end());
    }

    #[test]
    fn test_truncated_collection() {
        let collection: NodeCollection = (0..3).map(|_| NodeId::new()).collect();
        let mut out = MemoryOutputStream::new();
        collection.write(&mut out);
        let bytes = out.into_inner().unwrap();

        let mut input = MemoryInputStream::new(&bytes[..bytes.len() - 1]);
        NodeCollection::read(&mut input);
        assert!(matches!(input.status(), Err(StreamError::Truncated { .. })));
    }
}
