// SPDX-License-Identifier: MIT OR Apache-2.0
//! Check that a graph file survives save and reload byte for byte.

use super::Context;
use anyhow::{bail, Context as _};
use clap::Args;
use nodeflow_engine::{Graph, TypeRegistry};
use std::path::PathBuf;

/// Verify a graph file.
#[derive(Args)]
pub struct VerifyArgs {
    /// Graph file to verify
    pub file: PathBuf,
}

/// Outcome of a round trip
#[derive(Debug, PartialEq, Eq)]
pub struct RoundTrip {
    /// Size of the re-serialized graph
    pub bytes: usize,
    /// Whether the source bytes already were the current encoding
    pub canonical: bool,
}

/// Serialize `graph`, reload it and serialize again; both encodings must agree.
///
/// `source` is the encoding the graph was loaded from. It may legitimately
/// differ from the re-serialized bytes when it was written with older type
/// versions.
pub fn round_trip(graph: &Graph, source: &[u8], registry: &TypeRegistry) -> anyhow::Result<RoundTrip> {
    let first = graph.to_bytes()?;
    let reloaded = Graph::from_bytes(&first, registry).context("reloading the saved graph")?;
    let second = reloaded.to_bytes()?;

    if first != second {
        let offset = first
            .iter()
            .zip(&second)
            .position(|(a, b)| a != b)
            .unwrap_or(first.len().min(second.len()));
        bail!(
            "re-serialized graph differs at byte {offset} ({} vs {} bytes)",
            first.len(),
            second.len()
        );
    }
    if reloaded.checksum() != graph.checksum() {
        bail!("checksum changed across reload");
    }

    Ok(RoundTrip {
        bytes: first.len(),
        canonical: first == source,
    })
}

/// Run the verify command.
pub fn run(args: VerifyArgs, context: &Context) -> anyhow::Result<()> {
    let source = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let graph = context.load_graph(&args.file)?;
    let result = round_trip(&graph, &source, context.registry)?;

    if !result.canonical {
        tracing::warn!(
            "{} uses older type versions; saving would rewrite it",
            args.file.display()
        );
    }
    println!("OK: {} ({} bytes)", args.file.display(), result.bytes);
    Ok(())
}
