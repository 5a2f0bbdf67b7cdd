// SPDX-License-Identifier: MIT OR Apache-2.0
//! Subcommand implementations.

pub mod config;
pub mod demo;
pub mod eval;
pub mod inspect;
pub mod verify;

use crate::config::CliConfig;
use anyhow::Context as _;
use nodeflow_engine::{Graph, TypeRegistry};
use std::path::Path;

/// State shared by every subcommand
pub struct Context {
    /// Effective configuration
    pub config: CliConfig,
    /// Frozen type registry used for every load
    pub registry: &'static TypeRegistry,
}

impl Context {
    /// Load a graph file with the shared registry
    pub fn load_graph(&self, path: &Path) -> anyhow::Result<Graph> {
        Graph::load(path, self.registry)
            .with_context(|| format!("failed to load graph from {}", path.display()))
    }

    /// Render a serializable report as JSON, honoring `pretty_json`
    pub fn to_json<T: serde::Serialize>(&self, value: &T) -> anyhow::Result<String> {
        let json = if self.config.pretty_json {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(json)
    }
}
