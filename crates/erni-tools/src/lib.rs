//! ERNI Tools - Building-project context and domain tools
//!
//! This crate provides:
//! - [`BuildingProjectContext`]: the typed record of facts collected in one
//!   customer conversation
//! - [`Tool`] and [`ToolRegistry`]: the seam agents use to call domain logic
//! - The built-in tools: FAQ lookup, cost estimation, specialist
//!   availability, consultation booking and project status
//! - [`Catalog`]: pricing, specialist, time-slot and project data with an
//!   optional JSON override

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builtins;
pub mod catalog;
pub mod context;
pub mod error;
pub mod registry;

pub use builtins::register_builtins;
pub use catalog::{Catalog, ProjectRecord, SpecialistGroup};
pub use context::{BuildingProjectContext, ConstructionType, ProjectType};
pub use error::{Error, Result};
pub use registry::{Tool, ToolDefinition, ToolRegistry, ToolResult};
