// SPDX-License-Identifier: MIT OR Apache-2.0
//! `nodeflow` - command line harness for the Nodeflow graph engine.
//!
//! Builds a demonstration graph, evaluates graph files, dumps their
//! structure and checks that they survive a save/load cycle unchanged.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use nodeflow_engine::registry::{self, builtin_registry};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nodeflow")]
#[command(author, version, about = "Nodeflow graph engine harness", long_about = None)]
struct Cli {
    /// RON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, evaluate and save the demonstration graph
    Demo(commands::demo::DemoArgs),

    /// Load a graph file and evaluate it
    Eval(commands::eval::EvalArgs),

    /// Print the structure of a graph file
    Inspect(commands::inspect::InspectArgs),

    /// Check that a graph file survives save and reload byte for byte
    Verify(commands::verify::VerifyArgs),

    /// Print or write the effective configuration
    Config(commands::config::ConfigArgs),
}

fn init_logging(filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();

    let config = match CliConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(config::DEFAULT_LOG_FILTER);
            tracing::error!("{e}");
            std::process::exit(2);
        }
    };
    init_logging(&config.log_filter);

    tracing::debug!("Starting nodeflow v{}", env!("CARGO_PKG_VERSION"));

    let registry =
        registry::initialize(builtin_registry()).unwrap_or_else(|_| registry::global_or_builtin());
    let context = commands::Context { config, registry };

    let result = match cli.command {
        Commands::Demo(args) => commands::demo::run(args, &context),
        Commands::Eval(args) => commands::eval::run(args, &context),
        Commands::Inspect(args) => commands::inspect::run(args, &context),
        Commands::Verify(args) => commands::verify::run(args, &context),
        Commands::Config(args) => commands::config::run(args, &context),
    };

    if let Err(e) = result {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}
