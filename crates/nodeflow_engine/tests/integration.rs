// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests for the node graph engine.
//!
//! Exercises whole-graph behavior across modules: evaluation of small
//! graphs, persistence with extension types registered by the host, format
//! migration and unknown-type handling.

use nodeflow_engine::collection::NodeCollection;
use nodeflow_engine::evaluation::{CalculationError, InputValues, NodeOutput};
use nodeflow_engine::geometry::Point;
use nodeflow_engine::node::{Node, NodeId, NodeKind, NodeState};
use nodeflow_engine::nodes::{AdditionNode, ConstantNode, ListBuilderNode, ViewerNode};
use nodeflow_engine::registry::{self, builtin_registry, TypeRegistry};
use nodeflow_engine::serialization::{write_header, SerializationInfo};
use nodeflow_engine::slot::{ConnectionMode, InputSlot, OutputSlot};
use nodeflow_engine::stream::{InputStream, MemoryOutputStream, OutputStream, StreamError};
use nodeflow_engine::value::{share, IntValue, ListValue, StringValue, Value, ValueType};
use nodeflow_engine::Graph;
use std::any::Any;

// ============================================================================
// Extension types contributed by the host
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ColorValue {
    r: f32,
    g: f32,
    b: f32,
}

impl ColorValue {
    const SERIALIZATION_INFO: SerializationInfo = SerializationInfo::new("ColorValue", 1);
}

impl Value for ColorValue {
    fn serialization_info(&self) -> &'static SerializationInfo {
        &Self::SERIALIZATION_INFO
    }

    fn value_type(&self) -> ValueType {
        ValueType::Custom("Color".into())
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(*self)
    }

    fn equals(&self, other: &dyn Value) -> bool {
        other.downcast_ref::<Self>() == Some(self)
    }

    fn to_display_string(&self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }

    fn read(&mut self, stream: &mut dyn InputStream, _version: u32, _registry: &TypeRegistry) {
        self.r = stream.read_f32();
        self.g = stream.read_f32();
        self.b = stream.read_f32();
    }

    fn write(&self, stream: &mut dyn OutputStream) {
        stream.write_f32(self.r);
        stream.write_f32(self.g);
        stream.write_f32(self.b);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Negates an integer
#[derive(Debug, Clone, Copy, Default)]
struct NegateNode;

impl NegateNode {
    const SERIALIZATION_INFO: SerializationInfo = SerializationInfo::new("NegateNode", 1);
}

impl NodeKind for NegateNode {
    fn serialization_info(&self) -> &'static SerializationInfo {
        &Self::SERIALIZATION_INFO
    }

    fn input_slots(&self) -> Vec<InputSlot> {
        vec![InputSlot::new("in", ValueType::Int).with_default(share(IntValue::new(0)))]
    }

    fn output_slots(&self) -> Vec<OutputSlot> {
        vec![OutputSlot::new("out", ValueType::Int)]
    }

    fn calculate(&self, inputs: &InputValues<'_>) -> Result<NodeOutput, CalculationError> {
        let value = inputs.int("in")?;
        let negated = value
            .checked_neg()
            .ok_or_else(|| CalculationError::Failed("cannot negate".into()))?;
        Ok(NodeOutput::single("out", share(IntValue::new(negated))))
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

fn extended_registry() -> TypeRegistry {
    let mut registry = builtin_registry();
    registry.register_value_type::<ColorValue>();
    registry.register_node_type::<NegateNode>();
    registry
}

fn int_value(graph: &Graph, node_id: NodeId) -> Option<i32> {
    graph
        .node_value(node_id)
        .and_then(|value| value.downcast_ref::<IntValue>())
        .map(IntValue::get)
}

// ============================================================================
// 1. Evaluation
// ============================================================================

#[test]
fn constant_feeds_addition_until_disconnected() {
    let mut graph = Graph::new();
    let a = graph.add_node(Node::new("A", ConstantNode::new(share(IntValue::new(2)))));
    let b = graph.add_node(Node::new("B", AdditionNode));

    graph.connect(a, "out", b, "a").unwrap();
    graph.evaluate();
    assert_eq!(int_value(&graph, b), Some(2));

    graph.disconnect(a, "out", b, "a").unwrap();
    assert_eq!(graph.node_state(b), Some(NodeState::Dirty));
    assert!(graph.node_value(b).is_none());
    graph.evaluate();
    assert_eq!(int_value(&graph, b), Some(0));
}

#[test]
fn diamond_evaluates_each_node_once() {
    let mut graph = Graph::new();
    let source = graph.add_node(Node::new("Source", ConstantNode::new(share(IntValue::new(3)))));
    let left = graph.add_node(Node::new("Left", AdditionNode));
    let right = graph.add_node(Node::new("Right", AdditionNode));
    let join = graph.add_node(Node::new("Join", AdditionNode));
    graph.connect(source, "out", left, "a").unwrap();
    graph.connect(source, "out", right, "a").unwrap();
    graph.connect(source, "out", right, "b").unwrap();
    graph.connect(left, "result", join, "a").unwrap();
    graph.connect(right, "result", join, "b").unwrap();

    let report = graph.evaluate();
    assert_eq!(report.calculated, vec![source, left, right, join]);
    assert_eq!(int_value(&graph, join), Some(9));

    graph
        .update_kind::<ConstantNode, _>(source, |kind| kind.set_value(share(IntValue::new(1))))
        .unwrap();
    assert_eq!(graph.evaluate().recalculated(), 4);
    assert_eq!(int_value(&graph, join), Some(3));
}

#[test]
fn viewer_renders_list_and_missing_values() {
    let mut graph = Graph::new();
    let text = graph.add_node(Node::new("Text", ConstantNode::new(share(StringValue::new("hello")))));
    let list = graph.add_node(Node::new("List", ListBuilderNode));
    let negate = graph.add_node(Node::new("Negate", NegateNode));
    let viewer = graph.add_node(Node::new("Viewer", ViewerNode::new(1)));
    graph.connect(text, "out", list, "items").unwrap();
    graph.connect(list, "list", viewer, "values").unwrap();
    graph.connect(negate, "out", viewer, "values").unwrap();
    graph
        .set_default_value(negate, "in", share(IntValue::new(i32::MIN)))
        .unwrap();

    let report = graph.evaluate();
    assert_eq!(report.failed.len(), 1);
    let rendered = graph.output_value(viewer, "text").unwrap();
    assert!(rendered.equals(&StringValue::new("[hello]\n<no value>")));
    let pages = graph.output_value(viewer, "page_count").unwrap();
    assert!(pages.equals(&IntValue::new(2)));

    let list_value = graph.node_value(list).unwrap();
    assert_eq!(list_value.downcast_ref::<ListValue>().map(ListValue::len), Some(1));
}

// ============================================================================
// 2. Persistence
// ============================================================================

fn extension_graph() -> (Graph, NodeId, NodeId) {
    let mut graph = Graph::new();
    let color = graph.add_node(
        Node::new(
            "Tint",
            ConstantNode::new(share(ColorValue {
                r: 1.0,
                g: 0.5,
                b: 0.25,
            })),
        )
        .with_position(-40.0, 12.5),
    );
    let viewer = graph.add_node(Node::new("Ansicht", ViewerNode::new(3)));
    let negate = graph.add_node(Node::new("Negate", NegateNode));
    graph.connect(color, "out", viewer, "values").unwrap();
    graph.connect(negate, "out", viewer, "values").unwrap();
    graph
        .set_default_value(negate, "in", share(IntValue::new(5)))
        .unwrap();
    graph.select(viewer).unwrap();
    graph.select(color).unwrap();
    graph
        .add_group("Colors", [color, negate].into_iter().collect())
        .unwrap();
    graph.set_node_position(viewer, Point::new(200.0, 0.0)).unwrap();
    (graph, color, viewer)
}

#[test]
fn round_trip_preserves_structure_and_extensions() {
    let (mut graph, color, viewer) = extension_graph();
    let registry = extended_registry();
    let bytes = graph.to_bytes().unwrap();
    let mut loaded = Graph::from_bytes(&bytes, &registry).unwrap();

    assert_eq!(loaded.to_bytes().unwrap(), bytes);
    assert_eq!(loaded.node_ids().collect::<Vec<_>>(), graph.node_ids().collect::<Vec<_>>());
    assert_eq!(
        loaded.connections().collect::<Vec<_>>(),
        graph.connections().collect::<Vec<_>>()
    );
    assert_eq!(loaded.selection(), &[viewer, color].into_iter().collect::<NodeCollection>());
    assert_eq!(loaded.node(viewer).unwrap().name(), "Ansicht");
    assert_eq!(
        loaded.node(viewer).unwrap().kind_as::<ViewerNode>().map(ViewerNode::lines_per_page),
        Some(3)
    );
    assert!(loaded.node_ids().all(|id| loaded.node_state(id) == Some(NodeState::Dirty)));

    graph.evaluate();
    loaded.evaluate();
    let expected = graph.output_value(viewer, "text").unwrap();
    let actual = loaded.output_value(viewer, "text").unwrap();
    assert!(actual.equals(expected.as_ref()));
    assert!(actual.equals(&StringValue::new("rgb(1, 0.5, 0.25)\n-5")));
}

#[test]
fn unknown_value_type_fails_without_partial_graph() {
    let (graph, _, _) = extension_graph();
    let bytes = graph.to_bytes().unwrap();
    let result = Graph::from_bytes(&bytes, &builtin_registry());
    assert_eq!(result.err(), Some(StreamError::UnknownType("ColorValue".into())));
}

#[test]
fn unknown_node_type_fails() {
    let mut graph = Graph::new();
    graph.add_node(Node::new("Negate", NegateNode));
    let bytes = graph.to_bytes().unwrap();
    let result = Graph::from_bytes(&bytes, &builtin_registry());
    assert_eq!(result.err(), Some(StreamError::UnknownType("NegateNode".into())));
}

#[test]
fn viewer_version_one_records_migrate() {
    let node_id = NodeId::new();
    let mut out = MemoryOutputStream::new();
    write_header(&mut out, &SerializationInfo::new("NodeGraph", 1));
    out.write_count(1);

    write_header(&mut out, &SerializationInfo::new("ViewerNode", 1));
    node_id.write(&mut out);
    out.write_wide_str("Old viewer");
    Point::new(1.0, 2.0).write(&mut out);
    out.write_count(1);
    InputSlot::new("values", ValueType::Any)
        .with_mode(ConnectionMode::Multiple)
        .write(&mut out);
    out.write_count(2);
    OutputSlot::new("text", ValueType::String).write(&mut out);
    OutputSlot::new("page_count", ValueType::Int).write(&mut out);
    // Version 1 stores no viewer fields.

    out.write_count(0);
    NodeCollection::new().write(&mut out);
    out.write_count(0);
    let bytes = out.into_inner().unwrap();

    let graph = Graph::from_bytes(&bytes, &builtin_registry()).unwrap();
    let node = graph.node(node_id).unwrap();
    assert_eq!(node.name(), "Old viewer");
    assert_eq!(
        node.kind_as::<ViewerNode>().map(ViewerNode::lines_per_page),
        Some(ViewerNode::default().lines_per_page())
    );
}

#[test]
fn newer_graph_version_is_rejected() {
    let mut out = MemoryOutputStream::new();
    write_header(&mut out, &SerializationInfo::new("NodeGraph", 2));
    out.write_count(0);
    let bytes = out.into_inner().unwrap();
    assert!(matches!(
        Graph::from_bytes(&bytes, &builtin_registry()),
        Err(StreamError::FormatVersion { found: 2, .. })
    ));
}

#[test]
fn global_registry_serves_extension_types() {
    let installed = registry::initialize(extended_registry()).unwrap();
    assert!(installed.contains("ColorValue"));
    assert!(std::ptr::eq(installed, registry::global_or_builtin()));

    let (graph, _, _) = extension_graph();
    let bytes = graph.to_bytes().unwrap();
    let loaded = Graph::from_bytes(&bytes, registry::global_or_builtin()).unwrap();
    assert_eq!(loaded.node_count(), 3);
}
