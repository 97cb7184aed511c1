//! The ERNI customer-service agent graph
//!
//! Triage routes every conversation. Specialists hand back to Triage when a
//! request falls outside their area.

use super::{Agent, AgentRegistry, AgentRegistryBuilder, HandoffHook, Instructions};
use crate::error::Result;
use crate::guardrail::GuardrailKind;
use erni_tools::{BuildingProjectContext, ToolRegistry};

/// Routing agent
pub const TRIAGE: &str = "Triage Agent";
/// General building information
pub const PROJECT_INFORMATION: &str = "Project Information Agent";
/// Preliminary cost estimates
pub const COST_ESTIMATION: &str = "Cost Estimation Agent";
/// Status of running projects
pub const PROJECT_STATUS: &str = "Project Status Agent";
/// Consultation booking
pub const APPOINTMENT_BOOKING: &str = "Appointment Booking Agent";
/// Frequently asked questions
pub const FAQ: &str = "FAQ Agent";

const HANDOFF_PREAMBLE: &str = "# System context\n\
You are one agent in a team of ERNI Gruppe customer-service agents. \
Each agent owns one area. Transfer the conversation with the matching \
transfer_to_<agent> function when a request belongs to another agent. \
Transfers happen silently; do not announce them to the customer.\n\n";

fn with_preamble(body: &str) -> String {
    format!("{HANDOFF_PREAMBLE}{body}")
}

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("[unknown]")
}

fn triage_instructions() -> String {
    with_preamble(
        "You are the first point of contact for ERNI Gruppe, a timber construction \
         company in Schongau, Switzerland. Greet the customer, find out what they \
         need and transfer them:\n\
         - general questions about the building process or services: Project Information Agent\n\
         - price or budget questions: Cost Estimation Agent\n\
         - questions about a running project with a project number: Project Status Agent\n\
         - booking a meeting with a specialist: Appointment Booking Agent\n\
         - short factual questions about ERNI or timber: FAQ Agent\n\
         Answer greetings yourself and keep replies short.",
    )
}

fn project_information_instructions() -> String {
    with_preamble(
        "You explain how building with ERNI works: planning, timber and system \
         construction, energy standards, timelines and services. Use \
         faq_lookup_building for concrete facts. Offer a cost estimate or a \
         consultation when the customer shows interest in a project.",
    )
}

fn cost_estimation_instructions(ctx: &BuildingProjectContext) -> String {
    with_preamble(&format!(
        "You prepare preliminary cost estimates. The current inquiry number is {}.\n\
         1. Ask for the project type (Einfamilienhaus, Mehrfamilienhaus, Agrar, Renovation).\n\
         2. Ask for the construction type (Holzbau or Systembau).\n\
         3. Ask for the living area in m².\n\
         4. Call estimate_project_cost and present the range.\n\
         Stress that the estimate is preliminary and offer a consultation. \
         Transfer back to Triage for anything unrelated to costs.",
        or_unknown(ctx.inquiry_id())
    ))
}

fn project_status_instructions(ctx: &BuildingProjectContext) -> String {
    with_preamble(&format!(
        "You report the status of running building projects. The current \
         project number is {}. Ask for the project number if it is unknown, \
         then call get_project_status and summarize the result. Transfer back \
         to Triage for anything else.",
        or_unknown(ctx.project_number())
    ))
}

fn appointment_booking_instructions(ctx: &BuildingProjectContext) -> String {
    with_preamble(&format!(
        "You book consultations with ERNI specialists. The current inquiry \
         number is {}. A consultation is already booked: {}.\n\
         1. Ask which kind of specialist is needed and call check_specialist_availability.\n\
         2. Collect the customer's name, email and phone number and a preferred slot.\n\
         3. Call book_consultation and confirm the booking.\n\
         Do not book twice. Transfer back to Triage for anything else.",
        or_unknown(ctx.inquiry_id()),
        ctx.consultation_booked()
    ))
}

fn faq_instructions() -> String {
    with_preamble(
        "You answer frequently asked questions about ERNI and building with timber. \
         Always use faq_lookup_building instead of answering from memory. \
         Transfer back to Triage when the question is not a FAQ.",
    )
}

fn guarded(agent: Agent) -> Agent {
    agent
        .with_input_guardrail(GuardrailKind::Relevance)
        .with_input_guardrail(GuardrailKind::Jailbreak)
        .with_output_guardrail(GuardrailKind::Pii)
}

/// All six ERNI agents, routing agent first
#[must_use]
pub fn erni_agents() -> Vec<Agent> {
    vec![
        guarded(
            Agent::new(
                TRIAGE,
                "Main routing agent that directs customers to the appropriate specialist.",
                Instructions::Static(triage_instructions()),
            )
            .with_handoff(PROJECT_INFORMATION)
            .with_handoff_hook(COST_ESTIMATION, HandoffHook::CostEstimationIntake)
            .with_handoff(PROJECT_STATUS)
            .with_handoff_hook(APPOINTMENT_BOOKING, HandoffHook::AppointmentIntake)
            .with_handoff(FAQ),
        ),
        guarded(
            Agent::new(
                PROJECT_INFORMATION,
                "Provides general information about ERNI's building process and services.",
                Instructions::Static(project_information_instructions()),
            )
            .with_tool("faq_lookup_building")
            .with_handoff(TRIAGE)
            .with_handoff(COST_ESTIMATION)
            .with_handoff(APPOINTMENT_BOOKING),
        ),
        guarded(
            Agent::new(
                COST_ESTIMATION,
                "Provides preliminary cost estimates for building projects.",
                Instructions::Dynamic(cost_estimation_instructions),
            )
            .with_tool("estimate_project_cost")
            .with_handoff(TRIAGE)
            .with_handoff(APPOINTMENT_BOOKING),
        ),
        guarded(
            Agent::new(
                PROJECT_STATUS,
                "Provides status updates for ongoing building projects.",
                Instructions::Dynamic(project_status_instructions),
            )
            .with_tool("get_project_status")
            .with_handoff(TRIAGE)
            .with_handoff(PROJECT_INFORMATION),
        ),
        guarded(
            Agent::new(
                APPOINTMENT_BOOKING,
                "Books consultations with ERNI specialists.",
                Instructions::Dynamic(appointment_booking_instructions),
            )
            .with_tool("check_specialist_availability")
            .with_tool("book_consultation")
            .with_handoff(TRIAGE),
        ),
        guarded(
            Agent::new(
                FAQ,
                "Answers frequently asked questions about ERNI and building with timber.",
                Instructions::Static(faq_instructions()),
            )
            .with_tool("faq_lookup_building")
            .with_handoff(TRIAGE),
        ),
    ]
}

/// Build and validate the ERNI agent graph
///
/// # Errors
/// Returns a configuration error if a tool the agents need is not registered
pub fn build_erni_registry(tools: &ToolRegistry) -> Result<AgentRegistry> {
    let mut builder = AgentRegistryBuilder::new(TRIAGE);
    for agent in erni_agents() {
        builder.register(agent)?;
    }
    builder.build(tools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use erni_tools::{register_builtins, Catalog};
    use std::sync::Arc;

    fn tools() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        register_builtins(&mut registry, Arc::new(Catalog::default()));
        registry
    }

    #[test]
    fn test_graph_is_closed() {
        let registry = build_erni_registry(&tools()).unwrap();
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.routing_name(), TRIAGE);

        let triage = registry.routing_agent();
        for name in registry.names().iter().filter(|n| *n != TRIAGE) {
            let agent = registry.resolve(name).unwrap();
            assert!(agent.handoff_to(TRIAGE).is_some(), "{name} cannot return");
            assert!(triage.handoff_to(name).is_some(), "{name} unreachable");
        }
    }

    #[test]
    fn test_intake_hooks_on_triage_edges() {
        let registry = build_erni_registry(&tools()).unwrap();
        let triage = registry.routing_agent();
        assert_eq!(
            triage.handoff_to(COST_ESTIMATION).and_then(|e| e.hook),
            Some(HandoffHook::CostEstimationIntake)
        );
        assert_eq!(
            triage.handoff_to(APPOINTMENT_BOOKING).and_then(|e| e.hook),
            Some(HandoffHook::AppointmentIntake)
        );
        assert_eq!(triage.handoff_to(FAQ).and_then(|e| e.hook), None);
    }

    #[test]
    fn test_every_agent_is_guarded() {
        for agent in erni_agents() {
            assert_eq!(
                agent.input_guardrails,
                vec![GuardrailKind::Relevance, GuardrailKind::Jailbreak]
            );
            assert_eq!(agent.output_guardrails, vec![GuardrailKind::Pii]);
        }
    }

    #[test]
    fn test_dynamic_instructions() {
        let ctx = BuildingProjectContext::default();
        let text = cost_estimation_instructions(&ctx);
        assert!(text.contains("inquiry number is [unknown]"));

        let ctx = BuildingProjectContext::new();
        let id = ctx.inquiry_id().unwrap_or_default().to_string();
        assert!(appointment_booking_instructions(&ctx).contains(&id));
        assert!(appointment_booking_instructions(&ctx).contains("booked: false"));
        assert!(project_status_instructions(&ctx).contains("[unknown]"));
    }

    #[test]
    fn test_missing_tools_fail_fast() {
        let err = build_erni_registry(&ToolRegistry::new()).unwrap_err();
        assert!(matches!(err, crate::Error::Configuration(_)));
    }
}
