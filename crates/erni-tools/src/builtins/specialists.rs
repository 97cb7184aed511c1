//! Specialist availability and consultation booking

use crate::catalog::{Catalog, OFFICE_ADDRESS};
use crate::context::BuildingProjectContext;
use crate::error::{Error, Result};
use crate::registry::{Tool, ToolDefinition, ToolResult};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Lists specialists of a type and the open consultation slots
pub struct CheckSpecialistAvailabilityTool {
    definition: ToolDefinition,
    catalog: Arc<Catalog>,
}

impl CheckSpecialistAvailabilityTool {
    /// Create a new availability tool
    #[must_use]
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let mut types: Vec<&str> = catalog.specialists.keys().map(String::as_str).collect();
        types.sort_unstable();

        let definition = ToolDefinition::new(
            "check_specialist_availability",
            "Check availability of ERNI specialists for consultation.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "specialist_type": {
                    "type": "string",
                    "description": format!("Specialist type, one of: {}", types.join(", "))
                },
                "preferred_date": {
                    "type": "string",
                    "description": "Date the customer would like to meet"
                }
            },
            "required": ["specialist_type", "preferred_date"]
        }));

        Self {
            definition,
            catalog,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AvailabilityInput {
    specialist_type: String,
    preferred_date: String,
}

#[async_trait::async_trait]
impl Tool for CheckSpecialistAvailabilityTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        input: serde_json::Value,
        _ctx: &mut BuildingProjectContext,
    ) -> Result<ToolResult> {
        let start = Instant::now();
        let input: AvailabilityInput = super::parse_input(input)?;

        let names = self.catalog.specialists_for(&input.specialist_type);
        let slots = self
            .catalog
            .time_slots
            .iter()
            .map(|slot| format!("- {slot}"))
            .collect::<Vec<_>>()
            .join("\n");

        let output = format!(
            "📅 Available {}:\n{}\n\n\
             Free time slots on {}:\n{}\n\n\
             Office location: {}",
            input.specialist_type,
            names.join(", "),
            input.preferred_date,
            slots,
            OFFICE_ADDRESS
        );
        Ok(ToolResult::timed(true, output, start))
    }
}

/// Books a consultation and records the customer's contact details
pub struct BookConsultationTool {
    definition: ToolDefinition,
}

impl BookConsultationTool {
    /// Create a new booking tool
    #[must_use]
    pub fn new() -> Self {
        let definition = ToolDefinition::new(
            "book_consultation",
            "Book a consultation with an ERNI specialist. Requires customer contact information.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "specialist_type": { "type": "string", "description": "Architekt, Holzbau-Ingenieur or Bauleiter" },
                "date": { "type": "string", "description": "Consultation date" },
                "time": { "type": "string", "description": "Consultation time slot" },
                "customer_name": { "type": "string", "description": "Customer's full name" },
                "customer_email": { "type": "string", "description": "Customer's email address" },
                "customer_phone": { "type": "string", "description": "Customer's phone number" }
            },
            "required": [
                "specialist_type", "date", "time",
                "customer_name", "customer_email", "customer_phone"
            ]
        }));

        Self { definition }
    }
}

impl Default for BookConsultationTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct BookingInput {
    specialist_type: String,
    date: String,
    time: String,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
}

impl BookingInput {
    fn validate(&self) -> Result<()> {
        let required = [
            ("specialist_type", &self.specialist_type),
            ("date", &self.date),
            ("time", &self.time),
            ("customer_name", &self.customer_name),
            ("customer_email", &self.customer_email),
            ("customer_phone", &self.customer_phone),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(Error::InvalidInput(format!("{field} must not be empty")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Tool for BookConsultationTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        input: serde_json::Value,
        ctx: &mut BuildingProjectContext,
    ) -> Result<ToolResult> {
        let start = Instant::now();
        let input: BookingInput = super::parse_input(input)?;
        input.validate()?;

        ctx.record_booking(
            input.customer_name.trim(),
            input.customer_email.trim(),
            input.customer_phone.trim(),
            input.specialist_type.trim(),
        );
        info!(
            inquiry_id = ctx.inquiry_id().unwrap_or("-"),
            specialist = %input.specialist_type,
            "Consultation booked"
        );

        let output = format!(
            "✅ Consultation Booked!\n\n\
             Details:\n\
             - Customer: {}\n\
             - Specialist: {}\n\
             - Date: {}\n\
             - Time: {}\n\
             - Location: {}\n\n\
             Confirmation sent to {}.\n\
             Phone: {}\n\
             We will contact you one day before the appointment.",
            input.customer_name,
            input.specialist_type,
            input.date,
            input.time,
            OFFICE_ADDRESS,
            input.customer_email,
            input.customer_phone
        );
        Ok(ToolResult::timed(true, output, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_availability_lists_names_and_slots() {
        let tool = CheckSpecialistAvailabilityTool::new(Arc::new(Catalog::default()));
        let mut ctx = BuildingProjectContext::new();
        let before = ctx.clone();

        let result = tool
            .execute(
                serde_json::json!({"specialist_type": "Architekt", "preferred_date": "2025-06-02"}),
                &mut ctx,
            )
            .await
            .unwrap();

        assert!(result.output.contains("André Arnold, Stefan Gisler"));
        assert!(result.output.contains("- 14:00-15:00"));
        assert!(result.output.contains("Guggibadstrasse 8"));
        assert_eq!(ctx, before);
    }

    #[tokio::test]
    async fn test_unknown_specialist_type_uses_fallback() {
        let tool = CheckSpecialistAvailabilityTool::new(Arc::new(Catalog::default()));
        let mut ctx = BuildingProjectContext::new();
        let result = tool
            .execute(
                serde_json::json!({"specialist_type": "Gärtner", "preferred_date": "morgen"}),
                &mut ctx,
            )
            .await
            .unwrap();
        assert!(result.output.contains("📅 Available Gärtner:\nSpecialist"));
    }

    #[tokio::test]
    async fn test_booking_records_contact_details() {
        let tool = BookConsultationTool::new();
        let mut ctx = BuildingProjectContext::new();

        let result = tool
            .execute(
                serde_json::json!({
                    "specialist_type": "Architekt",
                    "date": "2025-06-02",
                    "time": "09:00-10:00",
                    "customer_name": "Anna Muster",
                    "customer_email": "anna@example.ch",
                    "customer_phone": "079 123 45 67"
                }),
                &mut ctx,
            )
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.output.contains("Confirmation sent to anna@example.ch."));
        assert!(ctx.consultation_booked());
        assert_eq!(ctx.customer_name(), Some("Anna Muster"));
        assert_eq!(ctx.customer_phone(), Some("079 123 45 67"));
        assert_eq!(ctx.specialist_assigned(), Some("Architekt"));
    }

    #[tokio::test]
    async fn test_booking_rejects_blank_fields() {
        let tool = BookConsultationTool::new();
        let mut ctx = BuildingProjectContext::new();

        let err = tool
            .execute(
                serde_json::json!({
                    "specialist_type": "Architekt",
                    "date": "2025-06-02",
                    "time": "09:00-10:00",
                    "customer_name": " ",
                    "customer_email": "anna@example.ch",
                    "customer_phone": "079 123 45 67"
                }),
                &mut ctx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("customer_name")));
        assert!(!ctx.consultation_booked());
    }
}
