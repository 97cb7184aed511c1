//! CLI module for ERNI Agents
//!
//! Provides commands:
//! - `serve`: Run the HTTP server (default)
//! - `agents`: Print the validated handoff graph

use crate::server::config::AppConfig;
use clap::{Parser, Subcommand};

/// ERNI Building Agents CLI
#[derive(Parser, Debug)]
#[command(name = "erni-agents")]
#[command(about = "Multi-agent customer assistant for ERNI building projects")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the server (default)
    Serve,
    /// Validate and print the agent graph
    Agents,
}

/// Run the CLI command
pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => crate::server::run(config).await,
        Commands::Agents => print_agents(&config),
    }
}

fn print_agents(config: &AppConfig) -> anyhow::Result<()> {
    let tools = crate::server::build_tools(config)?;
    let agents = crate::server::build_agents(&tools)?;

    println!("Routing agent: {}", agents.routing_name());
    for summary in agents.summaries() {
        println!();
        println!("{}", summary.name);
        println!("  {}", summary.description);
        println!("  handoffs:   {}", summary.handoffs.join(", "));
        if !summary.tools.is_empty() {
            println!("  tools:      {}", summary.tools.join(", "));
        }
        println!("  guardrails: {}", summary.input_guardrails.join(", "));
    }
    Ok(())
}
