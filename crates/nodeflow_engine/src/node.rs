// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph engine.
//!
//! A [`Node`] pairs graph-managed state (identity, slots, evaluation state,
//! cached outputs) with a [`NodeKind`]: the polymorphic part that declares
//! the slots, performs the calculation and persists its own parameters.

use crate::evaluation::{CalculationError, InputValues, NodeOutput};
use crate::geometry::Point;
use crate::registry::TypeRegistry;
use crate::serialization::{write_header, ObjectHeader, SerializationInfo};
use crate::slot::{InputSlot, OutputSlot, SlotId};
use crate::stream::{InputStream, OutputStream, StreamError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Sentinel meaning "no node"
    pub const NULL: NodeId = NodeId(Uuid::nil());

    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Whether this is the [`NodeId::NULL`] sentinel
    pub fn is_null(&self) -> bool {
        self.0.is_nil()
    }

    /// Read 16 raw bytes
    pub fn read(stream: &mut dyn InputStream) -> Self {
        let mut bytes = [0u8; 16];
        stream.read_bytes(&mut bytes);
        Self(Uuid::from_bytes(bytes))
    }

    /// Write 16 raw bytes
    pub fn write(&self, stream: &mut dyn OutputStream) {
        stream.write_bytes(self.0.as_bytes());
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Evaluation state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    /// Cached outputs are stale or missing
    Dirty,
    /// Calculation in progress
    Evaluating,
    /// Cached outputs are valid
    Clean,
}

/// The computation behind a node.
///
/// Implementations are registered in the [`TypeRegistry`] under their
/// [`SerializationInfo`] so nodes can be reconstructed from a graph file.
pub trait NodeKind: fmt::Debug + Send + Sync + Any {
    /// Serialization record of the concrete kind
    fn serialization_info(&self) -> &'static SerializationInfo;

    /// Input slots of a freshly created node, in display order
    fn input_slots(&self) -> Vec<InputSlot>;

    /// Output slots of a freshly created node, in display order
    fn output_slots(&self) -> Vec<OutputSlot>;

    /// Produce one value per output slot from the resolved inputs.
    ///
    /// Must be a pure function of `inputs`; omitting an output means that
    /// slot has no value this round.
    fn calculate(&self, inputs: &InputValues<'_>) -> Result<NodeOutput, CalculationError>;

    /// Read kind-specific fields. `version` is the stored version.
    fn read(&mut self, _stream: &mut dyn InputStream, _version: u32, _registry: &TypeRegistry) {}

    /// Write kind-specific fields
    fn write(&self, _stream: &mut dyn OutputStream) {}

    /// Deep copy
    fn clone_kind(&self) -> Box<dyn NodeKind>;

    /// Upcast for downcasting to the concrete kind
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for parameter changes
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A node instance in the graph
#[derive(Debug)]
pub struct Node {
    pub(crate) id: NodeId,
    name: String,
    position: Point,
    kind: Box<dyn NodeKind>,
    pub(crate) inputs: IndexMap<SlotId, InputSlot>,
    outputs: IndexMap<SlotId, OutputSlot>,
    pub(crate) state: NodeState,
    pub(crate) cached: Option<NodeOutput>,
    pub(crate) error: Option<CalculationError>,
}

impl Node {
    /// Create a node; its slots come from the kind
    pub fn new(name: impl Into<String>, kind: impl NodeKind) -> Self {
        Self::from_boxed(name, Box::new(kind))
    }

    /// Create a node from an already boxed kind
    pub fn from_boxed(name: impl Into<String>, kind: Box<dyn NodeKind>) -> Self {
        let inputs = slot_map(kind.input_slots(), InputSlot::id);
        let outputs = slot_map(kind.output_slots(), OutputSlot::id);
        Self {
            id: NodeId::NULL,
            name: name.into(),
            position: Point::default(),
            kind,
            inputs,
            outputs,
            state: NodeState::Dirty,
            cached: None,
            error: None,
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Point::new(x, y);
        self
    }

    /// Node ID; [`NodeId::NULL`] until the node is added to a graph
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Position in model space
    pub fn position(&self) -> Point {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    /// The computation
    pub fn kind(&self) -> &dyn NodeKind {
        self.kind.as_ref()
    }

    /// Swap in an updated kind; outputs are redeclared from it, inputs keep
    /// their defaults.
    pub(crate) fn replace_kind(&mut self, kind: Box<dyn NodeKind>) {
        self.outputs = slot_map(kind.output_slots(), OutputSlot::id);
        self.kind = kind;
    }

    /// Type identifier of the kind
    pub fn kind_id(&self) -> &'static str {
        self.kind.serialization_info().type_id
    }

    /// Downcast the kind
    pub fn kind_as<K: NodeKind>(&self) -> Option<&K> {
        self.kind.as_any().downcast_ref::<K>()
    }

    /// Input slot by ID
    pub fn input(&self, id: &str) -> Option<&InputSlot> {
        self.inputs.get(id)
    }

    /// Output slot by ID
    pub fn output(&self, id: &str) -> Option<&OutputSlot> {
        self.outputs.get(id)
    }

    /// Input slots in registration order
    pub fn inputs(&self) -> impl Iterator<Item = &InputSlot> {
        self.inputs.values()
    }

    /// Output slots in registration order
    pub fn outputs(&self) -> impl Iterator<Item = &OutputSlot> {
        self.outputs.values()
    }

    /// Evaluation state
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Outputs of the last successful calculation
    pub fn cached_output(&self) -> Option<&NodeOutput> {
        self.cached.as_ref()
    }

    /// Error of the last failed calculation
    pub fn calculation_error(&self) -> Option<&CalculationError> {
        self.error.as_ref()
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.state = NodeState::Dirty;
        self.cached = None;
        self.error = None;
    }

    /// Write the node record: dynamic header, identity, slots, kind fields
    pub fn write(&self, stream: &mut dyn OutputStream) {
        write_header(stream, self.kind.serialization_info());
        self.id.write(stream);
        stream.write_wide_str(&self.name);
        self.position.write(stream);
        stream.write_count(self.inputs.len());
        for slot in self.inputs.values() {
            slot.write(stream);
        }
        stream.write_count(self.outputs.len());
        for slot in self.outputs.values() {
            slot.write(stream);
        }
        self.kind.write(stream);
    }

    /// Read a node record, constructing the kind through `registry`.
    ///
    /// Returns `None` once the stream is in an error state; an unregistered
    /// kind fails the stream with `UnknownType`.
    pub fn read(stream: &mut dyn InputStream, registry: &TypeRegistry) -> Option<Self> {
        let header = ObjectHeader::read(stream);
        if !stream.is_ok() {
            return None;
        }
        let mut kind = match registry.create_node(&header.type_id) {
            Ok(kind) => kind,
            Err(e) => {
                stream.fail(e.into());
                return None;
            }
        };
        kind.serialization_info().check_version(stream, header.version);

        let id = NodeId::read(stream);
        let name = stream.read_wide_str();
        let position = Point::read(stream);

        let mut inputs = IndexMap::new();
        let input_count = stream.read_count();
        for _ in 0..input_count {
            if !stream.is_ok() {
                break;
            }
            let slot = InputSlot::read(stream, registry);
            let id = slot.id().clone();
            if inputs.insert(id.clone(), slot).is_some() {
                stream.fail(StreamError::Malformed(format!("duplicate input slot {id}")));
            }
        }

        let mut outputs = IndexMap::new();
        let output_count = stream.read_count();
        for _ in 0..output_count {
            if !stream.is_ok() {
                break;
            }
            let slot = OutputSlot::read(stream);
            let id = slot.id().clone();
            if outputs.insert(id.clone(), slot).is_some() {
                stream.fail(StreamError::Malformed(format!("duplicate output slot {id}")));
            }
        }

        kind.read(stream, header.version, registry);
        if !stream.is_ok() {
            return None;
        }

        Some(Self {
            id,
            name,
            position,
            kind,
            inputs,
            outputs,
            state: NodeState::Dirty,
            cached: None,
            error: None,
        })
    }
}

impl Clone for Node {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            position: self.position,
            kind: self.kind.clone_kind(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            state: self.state,
            cached: self.cached.clone(),
            error: self.error.clone(),
        }
    }
}

fn slot_map<S>(slots: Vec<S>, id: fn(&S) -> &SlotId) -> IndexMap<SlotId, S> {
    let mut map = IndexMap::with_capacity(slots.len());
    for slot in slots {
        let key = id(&slot).clone();
        if map.contains_key(&key) {
            tracing::warn!("Duplicate slot id {} ignored", key);
            continue;
        }
        map.insert(key, slot);
    }
    map
}
