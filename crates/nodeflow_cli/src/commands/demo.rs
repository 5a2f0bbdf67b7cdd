// SPDX-License-Identifier: MIT OR Apache-2.0
//! Build, evaluate and save the demonstration graph.

use super::Context;
use anyhow::Context as _;
use clap::Args;
use nodeflow_engine::nodes::{AdditionNode, ConstantNode, ViewerNode};
use nodeflow_engine::value::{share, IntValue};
use nodeflow_engine::{Graph, Node, NodeId};
use std::path::PathBuf;

/// Build the demonstration graph.
#[derive(Args)]
pub struct DemoArgs {
    /// Output graph file
    #[arg(short, long, default_value = "demo.graph")]
    pub out: PathBuf,

    /// Constant fed into the adder
    #[arg(long, default_value_t = 2)]
    pub value: i32,
}

/// Nodes of the demonstration graph
pub struct DemoGraph {
    /// The graph itself
    pub graph: Graph,
    /// Constant source
    pub constant: NodeId,
    /// Adder fed by the constant on `a`
    pub adder: NodeId,
    /// Viewer showing the constant and the sum
    pub viewer: NodeId,
}

/// Constant into an adder, both shown by a viewer. The constant and the
/// adder form the `Sum` group and the adder is selected.
pub fn build_demo_graph(value: i32, viewer_lines: u32) -> anyhow::Result<DemoGraph> {
    let mut graph = Graph::new();
    let constant = graph.add_node(
        Node::new("Constant", ConstantNode::new(share(IntValue::new(value))))
            .with_position(0.0, 0.0),
    );
    let adder = graph.add_node(Node::new("Add", AdditionNode).with_position(200.0, 0.0));
    let viewer = graph.add_node(
        Node::new("Viewer", ViewerNode::new(viewer_lines)).with_position(400.0, 40.0),
    );

    graph.connect(constant, "out", adder, "a")?;
    graph.connect(constant, "out", viewer, "values")?;
    graph.connect(adder, "result", viewer, "values")?;
    graph.select(adder)?;
    graph.add_group("Sum", [constant, adder].into_iter().collect())?;

    Ok(DemoGraph {
        graph,
        constant,
        adder,
        viewer,
    })
}

/// Run the demo command.
pub fn run(args: DemoArgs, context: &Context) -> anyhow::Result<()> {
    let DemoGraph {
        mut graph,
        constant,
        adder,
        viewer,
    } = build_demo_graph(args.value, context.config.viewer_lines)?;

    let report = graph.evaluate();
    tracing::info!("Evaluated demo graph: {} nodes calculated", report.recalculated());
    tracing::debug!("Constant {constant}, adder {adder}, viewer {viewer}");

    let sum = graph
        .node_value(adder)
        .map_or_else(|| "<none>".to_string(), |v| v.to_display_string());
    println!("Sum:    {sum}");
    if let Some(text) = graph.output_value(viewer, "text") {
        println!("Viewer: {}", text.to_display_string().replace('\n', " | "));
    }

    graph
        .save(&args.out)
        .with_context(|| format!("failed to save graph to {}", args.out.display()))?;
    println!("Saved:  {}", args.out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeflow_engine::NodeState;

    #[test]
    fn test_demo_graph_evaluates() {
        let DemoGraph {
            mut graph,
            constant,
            adder,
            viewer,
        } = build_demo_graph(2, 5).unwrap();
        assert_eq!(graph.connection_count(), 3);
        assert_eq!(graph.groups().count(), 1);
        assert!(graph.selection().contains(adder));

        let report = graph.evaluate();
        assert_eq!(report.calculated, vec![constant, adder, viewer]);
        assert!(graph.node_value(adder).unwrap().equals(&IntValue::new(2)));
        assert_eq!(
            graph.output_value(viewer, "text").unwrap().to_display_string(),
            "2\n2"
        );
        assert_eq!(graph.node_state(viewer), Some(NodeState::Clean));
    }
}
