// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.
//!
//! The graph is the only place connections are made or broken. Every
//! mutation is validated up front and either applied completely or rejected
//! with a [`GraphError`], leaving the graph untouched.

use crate::collection::NodeCollection;
use crate::connection::Connection;
use crate::evaluation::{CalculationError, NodeOutput};
use crate::geometry::{Point, Rect};
use crate::group::{GroupId, NodeGroup, NodeRectProvider};
use crate::node::{Node, NodeId, NodeKind, NodeState};
use crate::slot::{ConnectionMode, InputSlot, OutputSlot, SlotDirection, SlotId};
use crate::value::{ValuePtr, ValueType};
use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet, VecDeque};

/// A dataflow graph
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Nodes in insertion order
    pub(crate) nodes: IndexMap<NodeId, Node>,
    /// Edge list, in the order connections were made
    pub(crate) connections: IndexSet<Connection>,
    /// Current selection
    pub(crate) selection: NodeCollection,
    /// Node groups
    pub(crate) groups: IndexMap<GroupId, NodeGroup>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the graph, assigning it a fresh identity
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        let id = NodeId::new();
        node.id = id;
        node.mark_dirty();
        tracing::debug!("Added node {} ({}) as {}", node.name(), node.kind_id(), id);
        self.nodes.insert(id, node);
        id
    }

    /// Insert a node keeping its stored identity. Fails on NULL or duplicate IDs.
    pub(crate) fn insert_loaded_node(&mut self, node: Node) -> bool {
        if node.id.is_null() || self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id, node);
        true
    }

    /// Remove a node, severing its connections.
    ///
    /// Downstream nodes become dirty. The node also leaves the selection and
    /// its group; a group left empty is deleted.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Node, GraphError> {
        if !self.nodes.contains_key(&node_id) {
            return Err(GraphError::UnknownNode(node_id));
        }

        for downstream in self.downstream_nodes(node_id) {
            if let Some(node) = self.nodes.get_mut(&downstream) {
                node.mark_dirty();
            }
        }
        self.connections.retain(|c| !c.involves_node(node_id));
        self.selection.erase(node_id);
        for group in self.groups.values_mut() {
            group.nodes.erase(node_id);
        }
        self.groups.retain(|_, group| !group.nodes.is_empty());

        let node = self
            .nodes
            .shift_remove(&node_id)
            .ok_or(GraphError::UnknownNode(node_id))?;
        tracing::debug!("Removed node {}", node_id);
        Ok(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds `node_id`
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    fn existing_node(&self, node_id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(&node_id).ok_or(GraphError::UnknownNode(node_id))
    }

    fn existing_node_mut(&mut self, node_id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(&node_id).ok_or(GraphError::UnknownNode(node_id))
    }

    /// Check every structural rule a new connection must satisfy
    pub(crate) fn validate_connection(&self, connection: &Connection) -> Result<(), GraphError> {
        let source = self.existing_node(connection.from_node)?;
        let target = self.existing_node(connection.to_node)?;

        let output = source
            .output(connection.from_slot.as_str())
            .ok_or_else(|| GraphError::UnknownSlot {
                node: connection.from_node,
                slot: connection.from_slot.clone(),
                direction: SlotDirection::Output,
            })?;
        let input = target
            .input(connection.to_slot.as_str())
            .ok_or_else(|| GraphError::UnknownSlot {
                node: connection.to_node,
                slot: connection.to_slot.clone(),
                direction: SlotDirection::Input,
            })?;

        if !output.value_type().can_connect_to(input.value_type()) {
            return Err(GraphError::TypeMismatch {
                output: output.value_type().clone(),
                input: input.value_type().clone(),
            });
        }

        if self.connections.contains(connection) {
            return Err(GraphError::AlreadyConnected);
        }

        if input.mode() == ConnectionMode::Single
            && self
                .connections_to(connection.to_node, connection.to_slot.as_str())
                .next()
                .is_some()
        {
            return Err(GraphError::ArityViolation {
                node: connection.to_node,
                slot: connection.to_slot.clone(),
            });
        }

        if connection.from_node == connection.to_node
            || self.has_path(connection.to_node, connection.from_node)
        {
            return Err(GraphError::CycleRejected);
        }

        Ok(())
    }

    /// Connect an output slot to an input slot.
    ///
    /// On success the target and everything downstream of it become dirty.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_slot: impl Into<SlotId>,
        to_node: NodeId,
        to_slot: impl Into<SlotId>,
    ) -> Result<(), GraphError> {
        let connection = Connection::new(from_node, from_slot, to_node, to_slot);
        self.validate_connection(&connection)?;
        tracing::debug!(
            "Connected {}.{} -> {}.{}",
            connection.from_node,
            connection.from_slot,
            connection.to_node,
            connection.to_slot
        );
        self.connections.insert(connection);
        self.mark_dirty_from(to_node);
        Ok(())
    }

    /// Remove a connection
    pub fn disconnect(
        &mut self,
        from_node: NodeId,
        from_slot: impl Into<SlotId>,
        to_node: NodeId,
        to_slot: impl Into<SlotId>,
    ) -> Result<(), GraphError> {
        let connection = Connection::new(from_node, from_slot, to_node, to_slot);
        if !self.connections.shift_remove(&connection) {
            return Err(GraphError::NotConnected);
        }
        tracing::debug!(
            "Disconnected {}.{} -> {}.{}",
            connection.from_node,
            connection.from_slot,
            connection.to_node,
            connection.to_slot
        );
        self.mark_dirty_from(to_node);
        Ok(())
    }

    /// Remove every connection feeding an input. Returns how many were removed.
    pub fn disconnect_input(&mut self, node_id: NodeId, slot: &str) -> Result<usize, GraphError> {
        self.existing_input(node_id, slot)?;
        let before = self.connections.len();
        self.connections.retain(|c| !c.targets(node_id, slot));
        let removed = before - self.connections.len();
        if removed > 0 {
            tracing::debug!("Disconnected {} edge(s) from {}.{}", removed, node_id, slot);
            self.mark_dirty_from(node_id);
        }
        Ok(removed)
    }

    fn existing_input(&self, node_id: NodeId, slot: &str) -> Result<&InputSlot, GraphError> {
        self.existing_node(node_id)?
            .input(slot)
            .ok_or_else(|| GraphError::UnknownSlot {
                node: node_id,
                slot: SlotId::new(slot),
                direction: SlotDirection::Input,
            })
    }

    /// Replace the default value of an unconnected input
    pub fn set_default_value(
        &mut self,
        node_id: NodeId,
        slot: &str,
        value: ValuePtr,
    ) -> Result<(), GraphError> {
        let input = self.existing_input(node_id, slot)?;
        if self.connections_to(node_id, slot).next().is_some() {
            return Err(GraphError::InputConnected {
                node: node_id,
                slot: SlotId::new(slot),
            });
        }
        if !input.value_type().accepts(value.as_ref()) {
            return Err(GraphError::TypeMismatch {
                output: value.value_type(),
                input: input.value_type().clone(),
            });
        }

        if let Some(input) = self.existing_node_mut(node_id)?.inputs.get_mut(slot) {
            input.set_default_value(Some(value));
        }
        self.mark_dirty_from(node_id);
        Ok(())
    }

    /// Mark a node and everything downstream of it dirty.
    ///
    /// Returns the number of nodes invalidated.
    pub fn invalidate(&mut self, node_id: NodeId) -> Result<usize, GraphError> {
        self.existing_node(node_id)?;
        Ok(self.mark_dirty_from(node_id))
    }

    pub(crate) fn mark_dirty_from(&mut self, node_id: NodeId) -> usize {
        let mut affected = vec![node_id];
        affected.extend(self.downstream_nodes(node_id));
        for id in &affected {
            if let Some(node) = self.nodes.get_mut(id) {
                node.mark_dirty();
            }
        }
        tracing::debug!("Invalidated {} node(s) from {}", affected.len(), node_id);
        affected.len()
    }

    /// Change the parameters of a node's kind, then invalidate it.
    ///
    /// The update runs on a copy of the kind. If the outputs it then
    /// declares no longer fit the node's existing connections, the change is
    /// rejected and the node is left untouched.
    pub fn update_kind<K: NodeKind, R>(
        &mut self,
        node_id: NodeId,
        update: impl FnOnce(&mut K) -> R,
    ) -> Result<R, GraphError> {
        let mut kind = self.existing_node(node_id)?.kind().clone_kind();
        let typed = kind
            .as_any_mut()
            .downcast_mut::<K>()
            .ok_or(GraphError::UnexpectedKind(node_id))?;
        let result = update(typed);

        self.check_outgoing(node_id, &kind.output_slots())?;
        self.existing_node_mut(node_id)?.replace_kind(kind);
        self.mark_dirty_from(node_id);
        Ok(result)
    }

    /// Every connection leaving `node_id` must still find a compatible output
    fn check_outgoing(&self, node_id: NodeId, outputs: &[OutputSlot]) -> Result<(), GraphError> {
        for connection in self.connections.iter().filter(|c| c.from_node == node_id) {
            let output = outputs
                .iter()
                .find(|slot| slot.id() == &connection.from_slot)
                .ok_or_else(|| GraphError::UnknownSlot {
                    node: node_id,
                    slot: connection.from_slot.clone(),
                    direction: SlotDirection::Output,
                })?;
            let target = self.existing_node(connection.to_node)?;
            if let Some(input) = target.input(connection.to_slot.as_str()) {
                if !output.value_type().can_connect_to(input.value_type()) {
                    return Err(GraphError::TypeMismatch {
                        output: output.value_type().clone(),
                        input: input.value_type().clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Rename a node
    pub fn set_node_name(&mut self, node_id: NodeId, name: impl Into<String>) -> Result<(), GraphError> {
        self.existing_node_mut(node_id)?.set_name(name.into());
        Ok(())
    }

    /// Move a node. Layout does not affect evaluation.
    pub fn set_node_position(&mut self, node_id: NodeId, position: Point) -> Result<(), GraphError> {
        self.existing_node_mut(node_id)?.set_position(position);
        Ok(())
    }

    /// Get all connections in the order they were made
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get connections feeding a specific input
    pub fn connections_to<'a>(
        &'a self,
        node_id: NodeId,
        slot: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.targets(node_id, slot))
    }

    /// Get connections leaving a specific output
    pub fn connections_from<'a>(
        &'a self,
        node_id: NodeId,
        slot: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.originates(node_id, slot))
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.involves_node(node_id))
    }

    /// Upstream endpoints of an input, in connection order
    pub fn input_connections(&self, node_id: NodeId, slot: &str) -> Vec<(NodeId, SlotId)> {
        self.connections_to(node_id, slot)
            .map(|c| (c.from_node, c.from_slot.clone()))
            .collect()
    }

    fn successors(&self) -> HashMap<NodeId, Vec<NodeId>> {
        let mut map: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for connection in &self.connections {
            map.entry(connection.from_node).or_default().push(connection.to_node);
        }
        map
    }

    fn predecessors(&self) -> HashMap<NodeId, Vec<NodeId>> {
        let mut map: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for connection in &self.connections {
            map.entry(connection.to_node).or_default().push(connection.from_node);
        }
        map
    }

    /// Whether `to` can be reached from `from` along connections
    pub fn has_path(&self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }
        let successors = self.successors();
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            for next in successors.get(&current).into_iter().flatten() {
                if *next == to {
                    return true;
                }
                if visited.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }
        false
    }

    /// Nodes reachable forward from `node_id` (excluding it), in discovery order
    pub fn downstream_nodes(&self, node_id: NodeId) -> Vec<NodeId> {
        reachable(node_id, &self.successors())
    }

    /// Nodes `node_id` transitively depends on (excluding it), in discovery order
    pub fn upstream_nodes(&self, node_id: NodeId) -> Vec<NodeId> {
        reachable(node_id, &self.predecessors())
    }

    /// Get nodes in topological order (for evaluation)
    pub fn topological_order(&self) -> Result<Vec<NodeId>, CycleError> {
        let mut visited = HashSet::new();
        let mut temp_mark = HashSet::new();
        let mut order = Vec::new();
        let predecessors = self.predecessors();

        for node_id in self.nodes.keys() {
            if !visited.contains(node_id) {
                visit(*node_id, &predecessors, &mut visited, &mut temp_mark, &mut order)?;
            }
        }

        Ok(order)
    }

    /// Nodes whose cached outputs are stale, in insertion order
    pub fn dirty_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.state() != NodeState::Clean)
            .map(Node::id)
            .collect()
    }

    /// Evaluation state of a node
    pub fn node_state(&self, node_id: NodeId) -> Option<NodeState> {
        self.nodes.get(&node_id).map(Node::state)
    }

    /// Cached outputs of a node
    pub fn node_output(&self, node_id: NodeId) -> Option<&NodeOutput> {
        self.nodes.get(&node_id).and_then(Node::cached_output)
    }

    /// Cached value of one output slot
    pub fn output_value(&self, node_id: NodeId, slot: &str) -> Option<&ValuePtr> {
        self.node_output(node_id).and_then(|output| output.get(slot))
    }

    /// Cached value of a node's first output slot
    pub fn node_value(&self, node_id: NodeId) -> Option<&ValuePtr> {
        let node = self.nodes.get(&node_id)?;
        let first = node.outputs().next()?;
        node.cached_output()?.get(first.id().as_str())
    }

    /// Error recorded by the node's last calculation
    pub fn calculation_error(&self, node_id: NodeId) -> Option<&CalculationError> {
        self.nodes.get(&node_id).and_then(Node::calculation_error)
    }

    /// Current selection
    pub fn selection(&self) -> &NodeCollection {
        &self.selection
    }

    /// Add a node to the selection. Returns `false` if it was already selected.
    pub fn select(&mut self, node_id: NodeId) -> Result<bool, GraphError> {
        self.existing_node(node_id)?;
        Ok(self.selection.insert(node_id))
    }

    /// Remove a node from the selection
    pub fn deselect(&mut self, node_id: NodeId) -> bool {
        self.selection.erase(node_id)
    }

    /// Replace the selection
    pub fn set_selection(&mut self, selection: NodeCollection) -> Result<(), GraphError> {
        if let Some(missing) = selection.iter().find(|id| !self.nodes.contains_key(id)) {
            return Err(GraphError::UnknownNode(missing));
        }
        self.selection = selection;
        Ok(())
    }

    /// Empty the selection
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Create a group. Members leave any group they were in before.
    pub fn add_group(
        &mut self,
        name: impl Into<String>,
        nodes: NodeCollection,
    ) -> Result<GroupId, GraphError> {
        if nodes.is_empty() {
            return Err(GraphError::EmptyGroup);
        }
        if let Some(missing) = nodes.iter().find(|id| !self.nodes.contains_key(id)) {
            return Err(GraphError::UnknownNode(missing));
        }
        for group in self.groups.values_mut() {
            group.nodes.retain(|id| !nodes.contains(id));
        }
        self.groups.retain(|_, group| !group.nodes.is_empty());

        let id = GroupId::new();
        self.groups.insert(id, NodeGroup::new(name, nodes));
        tracing::debug!("Added group {}", id);
        Ok(id)
    }

    pub(crate) fn insert_loaded_group(&mut self, id: GroupId, group: NodeGroup) -> bool {
        if self.groups.contains_key(&id) {
            return false;
        }
        self.groups.insert(id, group);
        true
    }

    /// Delete a group; its nodes stay in the graph
    pub fn remove_group(&mut self, group_id: GroupId) -> Option<NodeGroup> {
        self.groups.shift_remove(&group_id)
    }

    /// Get a group by ID
    pub fn group(&self, group_id: GroupId) -> Option<&NodeGroup> {
        self.groups.get(&group_id)
    }

    /// Get all groups
    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &NodeGroup)> {
        self.groups.iter().map(|(id, group)| (*id, group))
    }

    /// The group a node belongs to
    pub fn group_of(&self, node_id: NodeId) -> Option<GroupId> {
        self.groups
            .iter()
            .find(|(_, group)| group.nodes.contains(node_id))
            .map(|(id, _)| *id)
    }

    /// Move a node into a group, leaving its previous one
    pub fn add_to_group(&mut self, group_id: GroupId, node_id: NodeId) -> Result<(), GraphError> {
        self.existing_node(node_id)?;
        if !self.groups.contains_key(&group_id) {
            return Err(GraphError::UnknownGroup(group_id));
        }
        if self.group_of(node_id) == Some(group_id) {
            return Ok(());
        }
        self.remove_from_group(node_id);
        if let Some(group) = self.groups.get_mut(&group_id) {
            group.nodes.insert(node_id);
        }
        Ok(())
    }

    /// Take a node out of its group. A group left empty is deleted.
    pub fn remove_from_group(&mut self, node_id: NodeId) -> Option<GroupId> {
        let group_id = self.group_of(node_id)?;
        if let Some(group) = self.groups.get_mut(&group_id) {
            group.nodes.erase(node_id);
            if group.nodes.is_empty() {
                self.groups.shift_remove(&group_id);
            }
        }
        Some(group_id)
    }

    /// Rename a group
    pub fn rename_group(&mut self, group_id: GroupId, name: impl Into<String>) -> Result<(), GraphError> {
        let group = self
            .groups
            .get_mut(&group_id)
            .ok_or(GraphError::UnknownGroup(group_id))?;
        group.set_name(name.into());
        Ok(())
    }

    /// Frame of a group as measured by `provider`
    pub fn group_layout(
        &mut self,
        group_id: GroupId,
        provider: &dyn NodeRectProvider,
        padding: f64,
    ) -> Result<Option<Rect>, GraphError> {
        let group = self
            .groups
            .get_mut(&group_id)
            .ok_or(GraphError::UnknownGroup(group_id))?;
        Ok(group.layout(provider, padding))
    }
}

fn reachable(start: NodeId, edges: &HashMap<NodeId, Vec<NodeId>>) -> Vec<NodeId> {
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    let mut found = Vec::new();
    while let Some(current) = queue.pop_front() {
        for next in edges.get(&current).into_iter().flatten() {
            if visited.insert(*next) {
                found.push(*next);
                queue.push_back(*next);
            }
        }
    }
    found
}

fn visit(
    node_id: NodeId,
    predecessors: &HashMap<NodeId, Vec<NodeId>>,
    visited: &mut HashSet<NodeId>,
    temp_mark: &mut HashSet<NodeId>,
    order: &mut Vec<NodeId>,
) -> Result<(), CycleError> {
    if temp_mark.contains(&node_id) {
        return Err(CycleError);
    }
    if visited.contains(&node_id) {
        return Ok(());
    }

    temp_mark.insert(node_id);

    // Visit all nodes that this node depends on
    for upstream in predecessors.get(&node_id).into_iter().flatten() {
        visit(*upstream, predecessors, visited, temp_mark, order)?;
    }

    temp_mark.remove(&node_id);
    visited.insert(node_id);
    order.push(node_id);

    Ok(())
}

/// Error when mutating the graph structure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0}")]
    UnknownNode(NodeId),

    /// Slot not found
    #[error("{direction:?} slot {slot} not found on node {node}")]
    UnknownSlot {
        /// Node that was searched
        node: NodeId,
        /// Missing slot
        slot: SlotId,
        /// Which side was searched
        direction: SlotDirection,
    },

    /// Connection would close a cycle
    #[error("Connection would create a cycle")]
    CycleRejected,

    /// Single-mode input already has a source
    #[error("Input {slot} of node {node} accepts only one connection")]
    ArityViolation {
        /// Target node
        node: NodeId,
        /// Target input
        slot: SlotId,
    },

    /// Incompatible value types
    #[error("Cannot feed {output} into an input of type {input}")]
    TypeMismatch {
        /// Produced type
        output: ValueType,
        /// Accepted type
        input: ValueType,
    },

    /// Edge already exists
    #[error("Connection already exists")]
    AlreadyConnected,

    /// Edge does not exist
    #[error("Connection does not exist")]
    NotConnected,

    /// Default values of connected inputs are not used
    #[error("Input {slot} of node {node} is connected")]
    InputConnected {
        /// Target node
        node: NodeId,
        /// Target input
        slot: SlotId,
    },

    /// Node kind is not the requested type
    #[error("Node {0} has a different kind")]
    UnexpectedKind(NodeId),

    /// Group not found
    #[error("Group not found: {0}")]
    UnknownGroup(GroupId),

    /// Groups need at least one member
    #[error("A group needs at least one node")]
    EmptyGroup,
}

/// Error when graph contains a cycle
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Graph contains a cycle")]
pub struct CycleError;
