//! Server module for ERNI Agents
//!
//! # Module Structure
//!
//! - `config`: Configuration structures for the binary
//! - `loader`: Configuration loading from files and environment
//! - `logging`: Tracing subscriber setup
//! - `init`: Pipeline wiring and the HTTP run loop

pub mod config;
mod init;
mod loader;
mod logging;

pub use init::{build_agents, build_state, build_tools, run};
pub use loader::load_config;
pub use logging::init_logging;
