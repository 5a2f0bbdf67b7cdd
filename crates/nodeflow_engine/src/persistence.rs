// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph file format.
//!
//! A graph file is a `NodeGraph` static header followed by the node records,
//! the connection records, the selection and the groups. Cached outputs are
//! never stored; a loaded graph starts fully dirty. A read either yields a
//! complete graph or an error, never a partial graph.

use crate::checksum::Checksum;
use crate::collection::NodeCollection;
use crate::connection::Connection;
use crate::graph::Graph;
use crate::group::{GroupId, NodeGroup};
use crate::node::Node;
use crate::registry::TypeRegistry;
use crate::serialization::{read_static_header, write_header, SerializationInfo};
use crate::stream::{
    InputStream, MemoryInputStream, MemoryOutputStream, OutputStream, ReaderInputStream,
    StreamError, StreamResult, WriterOutputStream,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;

/// Serialization record of a whole graph
pub const GRAPH_INFO: SerializationInfo = SerializationInfo::new("NodeGraph", 1);

impl Graph {
    /// Write the graph to a stream
    pub fn write(&self, stream: &mut dyn OutputStream) {
        write_header(stream, &GRAPH_INFO);

        stream.write_count(self.nodes.len());
        for node in self.nodes.values() {
            node.write(stream);
        }

        stream.write_count(self.connections.len());
        for connection in &self.connections {
            connection.write(stream);
        }

        self.selection.write(stream);

        stream.write_count(self.groups.len());
        for (id, group) in &self.groups {
            id.write(stream);
            group.write(stream);
        }
    }

    /// Read a graph from a stream.
    ///
    /// Connections are checked against the same rules as [`Graph::connect`];
    /// selection and group members must name nodes in the file. Any
    /// violation fails the stream with `Malformed`.
    pub fn read(stream: &mut dyn InputStream, registry: &TypeRegistry) -> StreamResult<Graph> {
        match read_graph(stream, registry) {
            Ok(graph) => {
                tracing::debug!(
                    "Read graph with {} nodes and {} connections",
                    graph.node_count(),
                    graph.connection_count()
                );
                Ok(graph)
            }
            Err(error) => {
                stream.fail(error.clone());
                Err(error)
            }
        }
    }

    /// Serialize into a byte buffer
    pub fn to_bytes(&self) -> StreamResult<Vec<u8>> {
        let mut stream = MemoryOutputStream::new();
        self.write(&mut stream);
        stream.into_inner()
    }

    /// Deserialize from a byte buffer that holds exactly one graph
    pub fn from_bytes(bytes: &[u8], registry: &TypeRegistry) -> StreamResult<Graph> {
        let mut stream = MemoryInputStream::new(bytes);
        let graph = Graph::read(&mut stream, registry)?;
        if !stream.is_at_end() {
            return Err(StreamError::Malformed(format!(
                "{} trailing bytes after graph",
                bytes.len() - stream.position()
            )));
        }
        Ok(graph)
    }

    /// Save to a file
    pub fn save(&self, path: impl AsRef<Path>) -> StreamResult<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| StreamError::Io(e.to_string()))?;
        let mut stream = WriterOutputStream::new(BufWriter::new(file));
        self.write(&mut stream);
        stream.finish()?;
        tracing::info!("Saved graph with {} nodes to {}", self.node_count(), path.display());
        Ok(())
    }

    /// Load from a file
    pub fn load(path: impl AsRef<Path>, registry: &TypeRegistry) -> StreamResult<Graph> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| StreamError::Io(e.to_string()))?;
        let mut stream = ReaderInputStream::new(BufReader::new(file));
        let graph = Graph::read(&mut stream, registry)?;

        let mut probe = [0u8; 1];
        let mut reader = stream.into_inner();
        if reader.read(&mut probe).map_err(|e| StreamError::Io(e.to_string()))? != 0 {
            return Err(StreamError::Malformed("trailing bytes after graph".into()));
        }

        tracing::info!("Loaded graph with {} nodes from {}", graph.node_count(), path.display());
        Ok(graph)
    }

    /// Checksum of the serialized graph.
    ///
    /// Equal for graphs that would be written identically.
    pub fn checksum(&self) -> Checksum {
        let mut stream = MemoryOutputStream::new();
        self.write(&mut stream);
        let mut checksum = Checksum::new();
        checksum.add_raw(stream.buffer());
        checksum
    }
}

fn read_graph(stream: &mut dyn InputStream, registry: &TypeRegistry) -> StreamResult<Graph> {
    read_static_header(stream, &GRAPH_INFO);
    stream.status()?;

    let mut graph = Graph::new();

    let node_count = stream.read_count();
    for _ in 0..node_count {
        let node = Node::read(stream, registry);
        stream.status()?;
        let Some(node) = node else {
            return Err(StreamError::Malformed("unreadable node record".into()));
        };
        let id = node.id();
        if !graph.insert_loaded_node(node) {
            return Err(StreamError::Malformed(format!("duplicate or null node id {id}")));
        }
    }

    let connection_count = stream.read_count();
    for _ in 0..connection_count {
        let connection = Connection::read(stream);
        stream.status()?;
        graph
            .validate_connection(&connection)
            .map_err(|e| StreamError::Malformed(format!("invalid connection: {e}")))?;
        graph.connections.insert(connection);
    }

    let selection = NodeCollection::read(stream);
    stream.status()?;
    graph
        .set_selection(selection)
        .map_err(|e| StreamError::Malformed(format!("invalid selection: {e}")))?;

    let group_count = stream.read_count();
    for _ in 0..group_count {
        let id = GroupId::read(stream);
        let group = NodeGroup::read(stream);
        stream.status()?;
        if group.nodes().is_empty() {
            return Err(StreamError::Malformed(format!("group {id} has no members")));
        }
        if let Some(member) = group.nodes().iter().find(|node| {
            !graph.contains_node(*node) || graph.group_of(*node).is_some()
        }) {
            return Err(StreamError::Malformed(format!(
                "group {id} lists unknown or already grouped node {member}"
            )));
        }
        if !graph.insert_loaded_group(id, group) {
            return Err(StreamError::Malformed(format!("duplicate group id {id}")));
        }
    }

    Ok(graph)
}
