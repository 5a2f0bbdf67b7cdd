// SPDX-License-Identifier: MIT OR Apache-2.0
//! Print the structure of a graph file.

use super::Context;
use clap::Args;
use nodeflow_engine::geometry::{Rect, Size};
use nodeflow_engine::{ConnectionMode, Graph, NodeId, NodeRectProvider};
use std::collections::HashMap;
use std::path::PathBuf;

/// Width of a node frame in layout units
const NODE_WIDTH: f64 = 160.0;
/// Height of a node's title bar
const TITLE_HEIGHT: f64 = 24.0;
/// Height of one slot row
const ROW_HEIGHT: f64 = 20.0;
/// Advance of one character of label text
const CHAR_WIDTH: f64 = 7.0;
/// Height of a line of label text
const LINE_HEIGHT: f64 = 14.0;

/// Print the structure of a graph file.
#[derive(Args)]
pub struct InspectArgs {
    /// Graph file to inspect
    pub file: PathBuf,
}

/// Node frames derived from stored positions and slot counts
pub struct FixedMetrics {
    rects: HashMap<NodeId, Rect>,
}

impl FixedMetrics {
    /// Measure every node of `graph`
    pub fn new(graph: &Graph) -> Self {
        let rects = graph
            .nodes()
            .map(|node| {
                let rows = node.inputs().count().max(node.outputs().count()) as f64;
                let size = Size::new(NODE_WIDTH, TITLE_HEIGHT + rows * ROW_HEIGHT);
                (node.id(), Rect::from_position_and_size(node.position(), size))
            })
            .collect();
        Self { rects }
    }
}

impl NodeRectProvider for FixedMetrics {
    fn node_rect(&self, node_id: NodeId) -> Option<Rect> {
        self.rects.get(&node_id).copied()
    }

    fn measure_text(&self, text: &str) -> Size {
        Size::new(text.chars().count() as f64 * CHAR_WIDTH, LINE_HEIGHT)
    }
}

fn format_rect(rect: &Rect) -> String {
    format!(
        "({:.1}, {:.1}) {:.1} x {:.1}",
        rect.position.x, rect.position.y, rect.size.width, rect.size.height
    )
}

/// Run the inspect command.
pub fn run(args: InspectArgs, context: &Context) -> anyhow::Result<()> {
    let mut graph = context.load_graph(&args.file)?;

    println!("File:        {}", args.file.display());
    println!("Checksum:    {:016x}", graph.checksum().value());
    println!("Nodes:       {}", graph.node_count());
    println!("Connections: {}", graph.connection_count());

    println!();
    for node in graph.nodes() {
        let position = node.position();
        println!(
            "{} [{}] {} at ({:.1}, {:.1})",
            node.name(),
            node.kind_id(),
            node.id(),
            position.x,
            position.y
        );
        for slot in node.inputs() {
            let mode = match slot.mode() {
                ConnectionMode::Single => "",
                ConnectionMode::Multiple => ", multiple",
            };
            let default = slot
                .default_value()
                .map(|value| format!(" = {}", value.to_display_string()))
                .unwrap_or_default();
            println!("  in  {}: {}{mode}{default}", slot.id(), slot.value_type());
        }
        for slot in node.outputs() {
            println!("  out {}: {}", slot.id(), slot.value_type());
        }
    }

    if graph.connection_count() > 0 {
        println!();
        println!("Connections:");
        for connection in graph.connections() {
            let name = |id: NodeId| graph.node(id).map_or("?", |node| node.name());
            println!(
                "  {}.{} -> {}.{}",
                name(connection.from_node),
                connection.from_slot,
                name(connection.to_node),
                connection.to_slot
            );
        }
    }

    if !graph.selection().is_empty() {
        let names: Vec<&str> = graph
            .selection()
            .iter()
            .filter_map(|id| graph.node(id).map(|node| node.name()))
            .collect();
        println!();
        println!("Selection:   {}", names.join(", "));
    }

    let group_ids: Vec<_> = graph.groups().map(|(id, _)| id).collect();
    if !group_ids.is_empty() {
        let metrics = FixedMetrics::new(&graph);
        println!();
        println!("Groups:");
        for group_id in group_ids {
            let frame = graph.group_layout(group_id, &metrics, context.config.group_padding)?;
            let Some(group) = graph.group(group_id) else {
                continue;
            };
            let frame = frame.as_ref().map_or_else(|| "no frame".to_string(), format_rect);
            println!("  {} ({} nodes): {frame}", group.name(), group.nodes().count());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::demo::build_demo_graph;

    #[test]
    fn test_metrics_follow_positions() {
        let demo = build_demo_graph(2, 5).unwrap();
        let metrics = FixedMetrics::new(&demo.graph);

        let adder = metrics.node_rect(demo.adder).unwrap();
        assert_eq!(adder, Rect::new(200.0, 0.0, NODE_WIDTH, TITLE_HEIGHT + 2.0 * ROW_HEIGHT));
        assert_eq!(metrics.node_rect(NodeId::new()), None);
        assert_eq!(metrics.measure_text("Sum"), Size::new(21.0, LINE_HEIGHT));
    }

    #[test]
    fn test_demo_group_frame() {
        let mut demo = build_demo_graph(2, 5).unwrap();
        let metrics = FixedMetrics::new(&demo.graph);
        let (group_id, _) = demo.graph.groups().next().unwrap();

        let frame = demo.graph.group_layout(group_id, &metrics, 8.0).unwrap().unwrap();
        // Constant (0,0,160,44) and adder (200,0,160,64) enclose (0,0,360,64)
        assert_eq!(frame, Rect::new(-8.0, -30.0, 376.0, 102.0));
    }
}
