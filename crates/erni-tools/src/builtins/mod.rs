//! Builtins - Domain tools for the ERNI agents
//!
//! - FAQ: faq_lookup_building
//! - Cost: estimate_project_cost
//! - Appointments: check_specialist_availability, book_consultation
//! - Projects: get_project_status

mod cost;
mod faq;
mod project_status;
mod specialists;

pub use cost::{format_chf, EstimateProjectCostTool};
pub use faq::FaqLookupTool;
pub use project_status::GetProjectStatusTool;
pub use specialists::{BookConsultationTool, CheckSpecialistAvailabilityTool};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::registry::ToolRegistry;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Register all built-in tools backed by the given catalog
pub fn register_builtins(registry: &mut ToolRegistry, catalog: Arc<Catalog>) {
    registry.register(Arc::new(FaqLookupTool::new()));
    registry.register(Arc::new(EstimateProjectCostTool::new(catalog.clone())));
    registry.register(Arc::new(CheckSpecialistAvailabilityTool::new(catalog.clone())));
    registry.register(Arc::new(BookConsultationTool::new()));
    registry.register(Arc::new(GetProjectStatusTool::new(catalog)));
}

pub(crate) fn parse_input<T: DeserializeOwned>(input: serde_json::Value) -> Result<T> {
    serde_json::from_value(input).map_err(|e| Error::InvalidInput(e.to_string()))
}
