// SPDX-License-Identifier: MIT OR Apache-2.0
//! Load a graph file and evaluate it.

use super::Context;
use clap::Args;
use nodeflow_engine::{Graph, NodeId, NodeState, SlotId, ValueType};
use serde::Serialize;
use std::path::PathBuf;

/// Evaluate a graph file.
#[derive(Args)]
pub struct EvalArgs {
    /// Graph file to evaluate
    pub file: PathBuf,

    /// Print a JSON report instead of text
    #[arg(long)]
    pub json: bool,
}

/// One output value after evaluation
#[derive(Debug, Serialize)]
pub struct OutputReport {
    /// Output slot
    pub slot: SlotId,
    /// Declared slot type
    pub value_type: ValueType,
    /// Display form of the cached value, if any
    pub value: Option<String>,
}

/// One node after evaluation
#[derive(Debug, Serialize)]
pub struct NodeReport {
    /// Node identity
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// Registered kind
    pub kind: String,
    /// State after the pass
    pub state: NodeState,
    /// Output values
    pub outputs: Vec<OutputReport>,
    /// Calculation error, if the node failed
    pub error: Option<String>,
}

/// Result of evaluating a whole graph
#[derive(Debug, Serialize)]
pub struct EvalReport {
    /// Number of nodes calculated successfully
    pub calculated: usize,
    /// Number of nodes that failed
    pub failed: usize,
    /// Per-node results in graph order
    pub nodes: Vec<NodeReport>,
}

/// Evaluate `graph` and describe every node
pub fn evaluate_graph(graph: &mut Graph) -> EvalReport {
    let pass = graph.evaluate();

    let nodes = graph
        .nodes()
        .map(|node| NodeReport {
            id: node.id(),
            name: node.name().to_string(),
            kind: node.kind_id().to_string(),
            state: node.state(),
            outputs: node
                .outputs()
                .map(|slot| OutputReport {
                    slot: slot.id().clone(),
                    value_type: slot.value_type().clone(),
                    value: node
                        .cached_output()
                        .and_then(|output| output.get(slot.id().as_str()))
                        .map(|value| value.to_display_string()),
                })
                .collect(),
            error: node.calculation_error().map(ToString::to_string),
        })
        .collect();

    EvalReport {
        calculated: pass.calculated.len(),
        failed: pass.failed.len(),
        nodes,
    }
}

/// Run the eval command.
pub fn run(args: EvalArgs, context: &Context) -> anyhow::Result<()> {
    let mut graph = context.load_graph(&args.file)?;
    let report = evaluate_graph(&mut graph);

    if args.json {
        println!("{}", context.to_json(&report)?);
        return Ok(());
    }

    println!("File:       {}", args.file.display());
    println!("Calculated: {}", report.calculated);
    println!("Failed:     {}", report.failed);
    for node in &report.nodes {
        println!();
        println!("{} [{}] {}", node.name, node.kind, node.id);
        for output in &node.outputs {
            let value = output.value.as_deref().unwrap_or("<none>");
            println!("  {} ({}): {}", output.slot, output.value_type, value.replace('\n', " | "));
        }
        if let Some(error) = &node.error {
            println!("  error: {error}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::demo::build_demo_graph;
    use nodeflow_engine::nodes::IncreaseNode;
    use nodeflow_engine::Node;

    #[test]
    fn test_report_covers_every_node() {
        let mut demo = build_demo_graph(4, 5).unwrap();
        let report = evaluate_graph(&mut demo.graph);
        assert_eq!(report.calculated, 3);
        assert_eq!(report.failed, 0);

        let adder = &report.nodes[1];
        assert_eq!(adder.name, "Add");
        assert_eq!(adder.outputs[0].value.as_deref(), Some("4"));
        assert_eq!(adder.state, NodeState::Clean);
    }

    #[test]
    fn test_failure_is_reported() {
        let mut graph = Graph::new();
        graph.add_node(Node::new("Lonely", IncreaseNode));
        let report = evaluate_graph(&mut graph);
        assert_eq!(report.failed, 1);
        assert!(report.nodes[0].error.is_some());
        assert_eq!(report.nodes[0].outputs[0].value, None);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["nodes"][0]["state"], "Dirty");
    }
}
