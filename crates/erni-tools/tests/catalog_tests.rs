//! Registry-level tests for the built-in tools with a catalog override

use erni_tools::{register_builtins, BuildingProjectContext, Catalog, ToolRegistry};
use std::io::Write;
use std::sync::Arc;

fn registry_with(catalog: Catalog) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry, Arc::new(catalog));
    registry
}

#[tokio::test]
async fn test_override_pricing_reaches_cost_tool() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"pricing": {{"Einfamilienhaus": {{"Holzbau": 3200, "Systembau": 2600}}}}}}"#
    )
    .unwrap();
    let registry = registry_with(Catalog::from_json_file(file.path()).unwrap());
    let mut ctx = BuildingProjectContext::new();

    let result = registry
        .execute(
            "estimate_project_cost",
            serde_json::json!({
                "project_type": "Einfamilienhaus",
                "area_sqm": 100.0,
                "construction_type": "Holzbau"
            }),
            &mut ctx,
        )
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(ctx.budget_chf(), Some(320_000.0));

    // Agrar is no longer priced once the pricing section is replaced
    let result = registry
        .execute(
            "estimate_project_cost",
            serde_json::json!({
                "project_type": "Agrar",
                "area_sqm": 100.0,
                "construction_type": "Holzbau"
            }),
            &mut ctx,
        )
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(ctx.project_type(), Some("Einfamilienhaus"));
}

#[tokio::test]
async fn test_tools_share_one_context() {
    let registry = registry_with(Catalog::default());
    let mut ctx = BuildingProjectContext::new();
    let inquiry = ctx.inquiry_id().map(str::to_string);

    registry
        .execute(
            "get_project_status",
            serde_json::json!({"project_number": "2023-234"}),
            &mut ctx,
        )
        .await
        .unwrap();
    registry
        .execute(
            "book_consultation",
            serde_json::json!({
                "specialist_type": "Bauleiter",
                "date": "2025-07-01",
                "time": "16:00-17:00",
                "customer_name": "Beat Keller",
                "customer_email": "beat@example.ch",
                "customer_phone": "041 000 00 00"
            }),
            &mut ctx,
        )
        .await
        .unwrap();

    assert_eq!(ctx.project_number(), Some("2023-234"));
    assert!(ctx.consultation_booked());
    assert_eq!(ctx.inquiry_id().map(str::to_string), inquiry);
}
