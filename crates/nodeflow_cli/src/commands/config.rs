// SPDX-License-Identifier: MIT OR Apache-2.0
//! Print or write the effective configuration.

use super::Context;
use clap::Args;
use std::path::PathBuf;

/// Print or write the effective configuration.
#[derive(Args)]
pub struct ConfigArgs {
    /// Write the configuration here instead of printing it
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Run the config command.
pub fn run(args: ConfigArgs, context: &Context) -> anyhow::Result<()> {
    match args.out {
        Some(path) => {
            context.config.save(&path)?;
            tracing::info!("Wrote configuration to {}", path.display());
        }
        None => println!("{}", context.config.to_ron()?),
    }
    Ok(())
}
