//! ERNI Agents - Multi-agent customer assistant for building projects
//!
//! CLI entry point for the ERNI Agents server.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod api;
mod cli;
mod server;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    let config = server::load_config()?;
    let _log_guard = server::init_logging(&config.logging);

    info!(
        environment = %config.server.environment,
        "Starting ERNI Agents v{}",
        env!("CARGO_PKG_VERSION")
    );

    cli::run(cli, config).await
}
