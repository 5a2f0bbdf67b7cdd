// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dataflow node graph engine.
//!
//! Nodes own typed input and output slots; the [`Graph`] owns the nodes and
//! the connections between their slots, keeps the connection structure
//! acyclic, and recalculates only what became stale.
//!
//! ## Architecture
//!
//! - [`stream`]: sticky-error binary streams and the wire encoding
//! - [`registry`]: type identifiers to factories, frozen once per process
//! - [`value`] / [`node`]: polymorphic values and node kinds
//! - [`graph`] / [`evaluation`]: structure, invalidation and scheduling
//! - [`persistence`]: the graph file format
//!
//! ```
//! use nodeflow_engine::nodes::{AdditionNode, ConstantNode};
//! use nodeflow_engine::value::{share, IntValue};
//! use nodeflow_engine::{Graph, Node};
//!
//! let mut graph = Graph::new();
//! let two = graph.add_node(Node::new("Two", ConstantNode::new(share(IntValue::new(2)))));
//! let add = graph.add_node(Node::new("Add", AdditionNode));
//! graph.connect(two, "out", add, "a").unwrap();
//! graph.evaluate();
//! let sum = graph.node_value(add).unwrap();
//! assert!(sum.equals(&IntValue::new(2)));
//! ```

pub mod checksum;
pub mod collection;
pub mod connection;
pub mod evaluation;
pub mod geometry;
pub mod graph;
pub mod group;
pub mod node;
pub mod nodes;
pub mod persistence;
pub mod registry;
pub mod serialization;
pub mod slot;
pub mod stream;
pub mod value;

pub use collection::NodeCollection;
pub use connection::Connection;
pub use evaluation::{CalculationError, EvaluationEnv, EvaluationReport, InputValues, NodeOutput};
pub use graph::{Graph, GraphError};
pub use group::{GroupId, NodeGroup, NodeRectProvider};
pub use node::{Node, NodeId, NodeKind, NodeState};
pub use registry::{RegistryError, TypeRegistry};
pub use slot::{ConnectionMode, InputSlot, OutputSlot, SlotId};
pub use stream::{StreamError, StreamResult};
pub use value::{Value, ValuePtr, ValueType};
