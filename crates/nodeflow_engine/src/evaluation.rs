// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation and execution.
//!
//! Evaluation is push-based: every mutation marks the affected nodes dirty,
//! and [`Graph::evaluate`] recalculates exactly the dirty part of the graph
//! in dependency order. A failed calculation does not abort the pass; the
//! node keeps no value and its dependents observe the absence.

use crate::graph::{Graph, GraphError};
use crate::node::{Node, NodeId, NodeState};
use crate::slot::SlotId;
use crate::value::{IntValue, Value, ValuePtr, ValueType};
use indexmap::{IndexMap, IndexSet};
use std::any::Any;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Result of evaluating a node
#[derive(Debug, Clone, Default)]
pub struct NodeOutput {
    values: IndexMap<SlotId, ValuePtr>,
}

impl NodeOutput {
    /// Create a new empty output
    pub fn new() -> Self {
        Self::default()
    }

    /// Output holding one value
    pub fn single(slot: impl Into<SlotId>, value: ValuePtr) -> Self {
        let mut output = Self::new();
        output.set(slot, value);
        output
    }

    /// Add a value, builder style
    pub fn with(mut self, slot: impl Into<SlotId>, value: ValuePtr) -> Self {
        self.set(slot, value);
        self
    }

    /// Set an output value
    pub fn set(&mut self, slot: impl Into<SlotId>, value: ValuePtr) {
        self.values.insert(slot.into(), value);
    }

    /// Get an output value
    pub fn get(&self, slot: &str) -> Option<&ValuePtr> {
        self.values.get(slot)
    }

    /// Values in the order they were set
    pub fn iter(&self) -> impl Iterator<Item = (&SlotId, &ValuePtr)> {
        self.values.iter()
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no value was produced
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Host capabilities visible to calculations.
///
/// Calculations may read from the environment but must not perform I/O
/// through it.
pub trait EvaluationEnv {
    /// Host-specific context, if any
    fn context(&self) -> Option<&dyn Any> {
        None
    }
}

/// Environment without host context
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyEnv;

impl EvaluationEnv for EmptyEnv {}

/// Resolved values of one input slot
#[derive(Debug, Clone)]
pub enum SlotInput {
    /// Nothing connected; the slot default, if any
    Unconnected(Option<ValuePtr>),
    /// One entry per connection in connection order; `None` where the
    /// upstream output has no value this round
    Connected(Vec<Option<ValuePtr>>),
}

/// Inputs handed to [`NodeKind::calculate`](crate::node::NodeKind::calculate)
pub struct InputValues<'a> {
    node_id: NodeId,
    slots: IndexMap<SlotId, SlotInput>,
    env: &'a dyn EvaluationEnv,
}

impl<'a> InputValues<'a> {
    /// Build inputs by hand (for driving a kind outside a graph)
    pub fn new(node_id: NodeId, env: &'a dyn EvaluationEnv) -> Self {
        Self {
            node_id,
            slots: IndexMap::new(),
            env,
        }
    }

    /// Set the resolved input of a slot
    pub fn with(mut self, slot: impl Into<SlotId>, input: SlotInput) -> Self {
        self.slots.insert(slot.into(), input);
        self
    }

    /// Node being calculated
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Evaluation environment
    pub fn env(&self) -> &dyn EvaluationEnv {
        self.env
    }

    /// Whether any upstream output feeds `slot`
    pub fn is_connected(&self, slot: &str) -> bool {
        matches!(self.slots.get(slot), Some(SlotInput::Connected(_)))
    }

    /// Effective value of a single-valued input
    pub fn value(&self, slot: &str) -> Option<&ValuePtr> {
        match self.slots.get(slot)? {
            SlotInput::Unconnected(default) => default.as_ref(),
            SlotInput::Connected(values) => values.first().and_then(Option::as_ref),
        }
    }

    /// Effective value, or `MissingInput`
    pub fn single(&self, slot: &str) -> Result<&ValuePtr, CalculationError> {
        self.value(slot)
            .ok_or_else(|| CalculationError::MissingInput(SlotId::new(slot)))
    }

    /// Every value feeding a multi-connection input, in connection order.
    ///
    /// An unconnected slot yields its default, if any.
    pub fn all(&self, slot: &str) -> Vec<Option<&ValuePtr>> {
        match self.slots.get(slot) {
            Some(SlotInput::Connected(values)) => values.iter().map(Option::as_ref).collect(),
            Some(SlotInput::Unconnected(Some(default))) => vec![Some(default)],
            Some(SlotInput::Unconnected(None)) | None => Vec::new(),
        }
    }

    /// Effective value downcast to a concrete type
    pub fn single_as<T: Value>(&self, slot: &str, expected: ValueType) -> Result<&T, CalculationError> {
        let value = self.single(slot)?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| CalculationError::IncompatibleInputType {
                slot: SlotId::new(slot),
                expected,
                found: value.value_type(),
            })
    }

    /// Integer input
    pub fn int(&self, slot: &str) -> Result<i32, CalculationError> {
        self.single_as::<IntValue>(slot, ValueType::Int).map(IntValue::get)
    }

    /// Numeric input (integer or float)
    pub fn number(&self, slot: &str) -> Result<f64, CalculationError> {
        let value = self.single(slot)?;
        value
            .as_number()
            .ok_or_else(|| CalculationError::IncompatibleInputType {
                slot: SlotId::new(slot),
                expected: ValueType::Number,
                found: value.value_type(),
            })
    }
}

/// Error during evaluation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalculationError {
    /// Missing required input
    #[error("Missing required input: {0}")]
    MissingInput(SlotId),

    /// Input value of the wrong type
    #[error("Input {slot} expected {expected}, found {found}")]
    IncompatibleInputType {
        /// Offending input
        slot: SlotId,
        /// Type the calculation needs
        expected: ValueType,
        /// Type that arrived
        found: ValueType,
    },

    /// Upstream node re-entered during its own calculation
    #[error("Node {0} is already being evaluated")]
    CycleDetected(NodeId),

    /// Custom error
    #[error("{0}")]
    Failed(String),
}

/// Outcome of an evaluation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    /// Nodes recalculated successfully, in evaluation order
    pub calculated: Vec<NodeId>,
    /// Nodes whose calculation failed
    pub failed: Vec<(NodeId, CalculationError)>,
}

impl EvaluationReport {
    /// Number of calculations performed
    pub fn recalculated(&self) -> usize {
        self.calculated.len() + self.failed.len()
    }

    /// Whether the pass had nothing to do
    pub fn is_noop(&self) -> bool {
        self.recalculated() == 0
    }
}

/// Whether the node must be calculated in the next pass.
///
/// A failed node stays dirty but is not retried until something it
/// depends on changes.
fn needs_calculation(node: &Node) -> bool {
    node.state != NodeState::Clean && node.error.is_none()
}

impl Graph {
    /// Recalculate every stale node
    pub fn evaluate(&mut self) -> EvaluationReport {
        self.evaluate_with(&EmptyEnv)
    }

    /// Recalculate every stale node with a host environment.
    ///
    /// Covers the dirty nodes and everything downstream of them, each node
    /// strictly after its dependencies. Evaluating a clean graph does nothing.
    pub fn evaluate_with(&mut self, env: &dyn EvaluationEnv) -> EvaluationReport {
        let mut pending = IndexSet::new();
        for node in self.nodes.values().filter(|node| needs_calculation(node)) {
            pending.insert(node.id);
        }
        let seeds: Vec<NodeId> = pending.iter().copied().collect();
        for seed in seeds {
            for downstream in self.downstream_nodes(seed) {
                if self.nodes.get(&downstream).is_some_and(|n| n.error.is_none()) {
                    pending.insert(downstream);
                }
            }
        }
        self.run(pending, env)
    }

    /// Bring one node up to date, calculating only what it depends on
    pub fn evaluate_node(
        &mut self,
        node_id: NodeId,
        env: &dyn EvaluationEnv,
    ) -> Result<EvaluationReport, GraphError> {
        if !self.contains_node(node_id) {
            return Err(GraphError::UnknownNode(node_id));
        }
        let mut pending = IndexSet::new();
        for id in self.upstream_nodes(node_id).into_iter().chain([node_id]) {
            if self.nodes.get(&id).is_some_and(needs_calculation) {
                pending.insert(id);
            }
        }
        Ok(self.run(pending, env))
    }

    fn run(&mut self, pending: IndexSet<NodeId>, env: &dyn EvaluationEnv) -> EvaluationReport {
        let mut report = EvaluationReport::default();
        if pending.is_empty() {
            return report;
        }

        let order = self.schedule(&pending);
        if order.len() < pending.len() {
            tracing::warn!(
                "{} node(s) could not be ordered for evaluation",
                pending.len() - order.len()
            );
        }

        for node_id in &order {
            let node_id = *node_id;
            match self.calculate(node_id, env) {
                Ok(output) => {
                    if let Some(node) = self.nodes.get_mut(&node_id) {
                        node.cached = Some(output);
                        node.error = None;
                        node.state = NodeState::Clean;
                    }
                    tracing::debug!("Calculated node {}", node_id);
                    report.calculated.push(node_id);
                }
                Err(error) => {
                    tracing::warn!("Calculation of node {} failed: {}", node_id, error);
                    self.record_failure(node_id, error.clone());
                    report.failed.push((node_id, error));
                }
            }
        }

        // Anything the scheduler could not order sits on a cycle.
        for node_id in pending.iter().filter(|id| !order.contains(id)) {
            let error = CalculationError::CycleDetected(*node_id);
            self.record_failure(*node_id, error.clone());
            report.failed.push((*node_id, error));
        }

        tracing::info!(
            "Evaluation pass: {} calculated, {} failed",
            report.calculated.len(),
            report.failed.len()
        );
        report
    }

    fn record_failure(&mut self, node_id: NodeId, error: CalculationError) {
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.cached = None;
            node.error = Some(error);
            node.state = NodeState::Dirty;
        }
    }

    /// Kahn's algorithm over the pending subgraph; ties go to the node added first
    fn schedule(&self, pending: &IndexSet<NodeId>) -> Vec<NodeId> {
        let mut in_degree: HashMap<NodeId, usize> = pending.iter().map(|id| (*id, 0)).collect();
        let mut successors: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for connection in &self.connections {
            if pending.contains(&connection.from_node) && pending.contains(&connection.to_node) {
                *in_degree.entry(connection.to_node).or_default() += 1;
                successors
                    .entry(connection.from_node)
                    .or_default()
                    .push(connection.to_node);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .filter_map(|(id, _)| self.nodes.get_index_of(id))
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(pending.len());
        while let Some(Reverse(index)) = ready.pop() {
            let Some((node_id, _)) = self.nodes.get_index(index) else {
                continue;
            };
            let node_id = *node_id;
            order.push(node_id);
            for next in successors.get(&node_id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(next) {
                    *degree -= 1;
                    if *degree == 0 {
                        if let Some(next_index) = self.nodes.get_index_of(next) {
                            ready.push(Reverse(next_index));
                        }
                    }
                }
            }
        }
        order
    }

    fn calculate(
        &mut self,
        node_id: NodeId,
        env: &dyn EvaluationEnv,
    ) -> Result<NodeOutput, CalculationError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or_else(|| CalculationError::Failed(format!("node {node_id} vanished")))?;
        node.state = NodeState::Evaluating;

        let inputs = self.gather_inputs(node_id, env)?;
        let node = self
            .nodes
            .get(&node_id)
            .ok_or_else(|| CalculationError::Failed(format!("node {node_id} vanished")))?;
        node.kind().calculate(&inputs)
    }

    fn gather_inputs<'e>(
        &self,
        node_id: NodeId,
        env: &'e dyn EvaluationEnv,
    ) -> Result<InputValues<'e>, CalculationError> {
        let mut inputs = InputValues::new(node_id, env);
        let Some(node) = self.nodes.get(&node_id) else {
            return Ok(inputs);
        };

        for slot in node.inputs() {
            let mut values = Vec::new();
            for connection in self.connections_to(node_id, slot.id().as_str()) {
                let upstream = self.nodes.get(&connection.from_node);
                if upstream.is_some_and(|n| n.state == NodeState::Evaluating) {
                    return Err(CalculationError::CycleDetected(connection.from_node));
                }
                values.push(
                    upstream
                        .and_then(Node::cached_output)
                        .and_then(|output| output.get(connection.from_slot.as_str()))
                        .cloned(),
                );
            }

            let input = if values.is_empty() {
                SlotInput::Unconnected(slot.default_value().cloned())
            } else {
                SlotInput::Connected(values)
            };
            inputs.slots.insert(slot.id().clone(), input);
        }
        Ok(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::nodes::{AdditionNode, ConstantNode, IncreaseNode, ViewerNode};
    use crate::value::{share, DoubleValue, StringValue};

    fn int_of(graph: &Graph, node_id: NodeId) -> Option<i32> {
        graph
            .node_value(node_id)
            .and_then(|v| v.downcast_ref::<IntValue>())
            .map(IntValue::get)
    }

    #[test]
    fn test_input_values_resolution() {
        let inputs = InputValues::new(NodeId::new(), &EmptyEnv)
            .with("a", SlotInput::Unconnected(Some(share(IntValue::new(3)))))
            .with("b", SlotInput::Connected(vec![None, Some(share(IntValue::new(4)))]))
            .with("c", SlotInput::Unconnected(None));

        assert_eq!(inputs.int("a"), Ok(3));
        assert!(!inputs.is_connected("a"));
        assert!(inputs.is_connected("b"));
        assert_eq!(
            inputs.int("b"),
            Err(CalculationError::MissingInput(SlotId::new("b")))
        );
        assert_eq!(inputs.all("b").len(), 2);
        assert!(inputs.all("c").is_empty());
        assert_eq!(inputs.all("a").len(), 1);
    }

    #[test]
    fn test_incompatible_input_type() {
        let inputs = InputValues::new(NodeId::new(), &EmptyEnv)
            .with("in", SlotInput::Unconnected(Some(share(DoubleValue::new(1.0)))));
        assert_eq!(
            inputs.int("in"),
            Err(CalculationError::IncompatibleInputType {
                slot: SlotId::new("in"),
                expected: ValueType::Int,
                found: ValueType::Double,
            })
        );
        assert_eq!(inputs.number("in"), Ok(1.0));
    }

    #[test]
    fn test_evaluation_follows_dependencies() {
        let mut graph = Graph::new();
        let inc2 = graph.add_node(Node::new("Inc 2", IncreaseNode));
        let inc1 = graph.add_node(Node::new("Inc 1", IncreaseNode));
        let source = graph.add_node(Node::new("Two", ConstantNode::new(share(IntValue::new(2)))));
        graph.connect(source, "out", inc1, "in").unwrap();
        graph.connect(inc1, "out", inc2, "in").unwrap();

        let report = graph.evaluate();
        assert_eq!(report.calculated, vec![source, inc1, inc2]);
        assert_eq!(int_of(&graph, inc2), Some(4));
        assert!(graph.dirty_nodes().is_empty());
    }

    #[test]
    fn test_second_pass_is_noop() {
        let mut graph = Graph::new();
        let source = graph.add_node(Node::new("Two", ConstantNode::new(share(IntValue::new(2)))));
        let add = graph.add_node(Node::new("Add", AdditionNode));
        graph.connect(source, "out", add, "a").unwrap();

        assert_eq!(graph.evaluate().recalculated(), 2);
        assert!(graph.evaluate().is_noop());
        assert_eq!(int_of(&graph, add), Some(2));
    }

    #[test]
    fn test_failure_propagates_as_no_value() {
        let mut graph = Graph::new();
        let text = graph.add_node(Node::new("Text", ConstantNode::new(share(StringValue::new("x")))));
        let inc = graph.add_node(Node::new("Inc", IncreaseNode));
        let after = graph.add_node(Node::new("After", IncreaseNode));
        let viewer = graph.add_node(Node::new("Viewer", ViewerNode::default()));
        let unrelated = graph.add_node(Node::new("One", ConstantNode::new(share(IntValue::new(1)))));
        graph.connect(inc, "out", after, "in").unwrap();
        graph.connect(after, "out", viewer, "values").unwrap();

        // IncreaseNode has no default, so it fails with a missing input.
        let report = graph.evaluate();
        assert_eq!(report.failed.len(), 2);
        assert_eq!(
            graph.calculation_error(inc),
            Some(&CalculationError::MissingInput(SlotId::new("in")))
        );
        assert_eq!(graph.node_state(inc), Some(NodeState::Dirty));
        assert!(graph.node_value(after).is_none());
        assert_eq!(graph.node_state(viewer), Some(NodeState::Clean));
        assert_eq!(int_of(&graph, unrelated), Some(1));
        assert_eq!(graph.node_state(text), Some(NodeState::Clean));

        // Failed nodes are not retried until something changes.
        assert!(graph.evaluate().is_noop());

        graph.connect(text, "out", inc, "in").unwrap_err();
        graph.set_default_value(inc, "in", share(IntValue::new(1))).unwrap();
        let report = graph.evaluate();
        assert!(report.failed.is_empty());
        assert_eq!(int_of(&graph, after), Some(3));
    }

    #[test]
    fn test_evaluate_node_pulls_only_upstream() {
        let mut graph = Graph::new();
        let source = graph.add_node(Node::new("Two", ConstantNode::new(share(IntValue::new(2)))));
        let inc = graph.add_node(Node::new("Inc", IncreaseNode));
        let downstream = graph.add_node(Node::new("Down", IncreaseNode));
        let other = graph.add_node(Node::new("Other", ConstantNode::new(share(IntValue::new(9)))));
        graph.connect(source, "out", inc, "in").unwrap();
        graph.connect(inc, "out", downstream, "in").unwrap();

        let report = graph.evaluate_node(inc, &EmptyEnv).unwrap();
        assert_eq!(report.calculated, vec![source, inc]);
        assert_eq!(int_of(&graph, inc), Some(3));
        assert_eq!(graph.node_state(downstream), Some(NodeState::Dirty));
        assert_eq!(graph.node_state(other), Some(NodeState::Dirty));
        assert!(graph.evaluate_node(NodeId::new(), &EmptyEnv).is_err());
    }

    #[test]
    fn test_ties_follow_insertion_order() {
        let mut graph = Graph::new();
        let ids: Vec<NodeId> = (0..4)
            .map(|i| graph.add_node(Node::new("C", ConstantNode::new(share(IntValue::new(i))))))
            .collect();
        assert_eq!(graph.evaluate().calculated, ids);
    }
}
