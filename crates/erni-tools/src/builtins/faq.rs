//! FAQ lookup tool
//!
//! Keyword-matched answers to common questions about building with ERNI.
//! Keywords cover English and German phrasing.

use crate::context::BuildingProjectContext;
use crate::error::Result;
use crate::registry::{Tool, ToolDefinition, ToolResult};
use serde::Deserialize;
use std::time::Instant;

struct FaqEntry {
    keywords: &'static [&'static str],
    answer: &'static str,
}

const FAQ: &[FaqEntry] = &[
    FaqEntry {
        keywords: &["holz", "wood", "timber", "material"],
        answer: "🌲 Why Wood?\n\n\
            Wood is the ideal building material:\n\
            ✓ Ecological and renewable\n\
            ✓ Grows in Swiss forests\n\
            ✓ Excellent thermal insulation\n\
            ✓ Healthy indoor climate\n\
            ✓ CO2-neutral\n\
            ✓ Fast assembly (saves time)\n\n\
            ERNI is a certified Minergie partner.",
    },
    FaqEntry {
        keywords: &["zeit", "time", "dauer", "duration"],
        answer: "⏱️ Construction Timeline:\n\n\
            Typical timelines for ERNI projects:\n\
            - Planning: 2-3 months\n\
            - Production: 4-6 weeks\n\
            - Assembly: 2-4 weeks\n\
            - Finishing: 4-8 weeks\n\n\
            Total duration: 6-9 months for a single-family house\n\n\
            Thanks to prefabrication in our workshop, on-site assembly takes only a few weeks!",
    },
    FaqEntry {
        keywords: &["minergie", "certificate", "zertifikat"],
        answer: "🏆 ERNI Certifications:\n\n\
            ✓ Minergie-Fachpartner Gebäudehülle\n\
            ✓ Holzbau Plus (quality and innovation)\n\n\
            Minergie is the Swiss standard for energy efficiency.\n\
            Minergie houses consume 80% less energy!",
    },
    FaqEntry {
        keywords: &["garantie", "warranty"],
        answer: "🛡️ ERNI Warranties:\n\n\
            - Construction warranty: 5 years\n\
            - Roof warranty: 5 years\n\
            - Windows/doors warranty: 2 years\n\n\
            Plus regular maintenance through our Dachservice.",
    },
    FaqEntry {
        keywords: &["preis", "cost", "price", "kosten"],
        answer: "💰 Pricing:\n\n\
            For a detailed cost estimate, we need to know:\n\
            - Project type (single-family house, multi-family, agricultural)\n\
            - Area in m²\n\
            - Construction type (timber frame, system construction)\n\
            - Location\n\n\
            I can provide a preliminary estimate or arrange a consultation with our architect.",
    },
    FaqEntry {
        keywords: &["service", "wartung", "maintenance"],
        answer: "🔧 ERNI Services:\n\n\
            We offer comprehensive services:\n\
            - Planning & Architecture\n\
            - Timber Construction (Holzbau)\n\
            - Roofing & Sheet Metal Work (Spenglerei)\n\
            - Interior Finishing (Ausbau)\n\
            - General/Total Contracting (Realisation)\n\
            - Agricultural Buildings (Agrar)\n\n\
            Everything under one roof!",
    },
];

const FALLBACK: &str = "I'm sorry, I don't have an answer to that specific question. \
    Would you like to speak with one of our consultants?";

/// Answer a question from the FAQ, first matching topic wins
#[must_use]
pub fn lookup(question: &str) -> Option<&'static str> {
    let q = question.to_lowercase();
    FAQ.iter()
        .find(|entry| entry.keywords.iter().any(|k| q.contains(k)))
        .map(|entry| entry.answer)
}

/// FAQ lookup tool
pub struct FaqLookupTool {
    definition: ToolDefinition,
}

impl FaqLookupTool {
    /// Create a new FAQ tool
    #[must_use]
    pub fn new() -> Self {
        let definition = ToolDefinition::new(
            "faq_lookup_building",
            "Lookup frequently asked questions about building and construction.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The customer's question"
                }
            },
            "required": ["question"]
        }));

        Self { definition }
    }
}

impl Default for FaqLookupTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct FaqInput {
    question: String,
}

#[async_trait::async_trait]
impl Tool for FaqLookupTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        input: serde_json::Value,
        _ctx: &mut BuildingProjectContext,
    ) -> Result<ToolResult> {
        let start = Instant::now();
        let input: FaqInput = super::parse_input(input)?;
        let (found, answer) = match lookup(&input.question) {
            Some(answer) => (true, answer),
            None => (false, FALLBACK),
        };
        Ok(ToolResult::timed(found, answer.to_string(), start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_matching() {
        assert!(lookup("Why should I build with wood?")
            .unwrap()
            .contains("Why Wood?"));
        assert!(lookup("Wie lange dauert der Bau?")
            .unwrap()
            .contains("Construction Timeline"));
        assert!(lookup("Do you have a MINERGIE certificate?")
            .unwrap()
            .contains("Certifications"));
        assert!(lookup("What is the warranty?").unwrap().contains("Warranties"));
        assert!(lookup("Was kosten Sie?").unwrap().contains("Pricing"));
        assert!(lookup("Do you offer maintenance?")
            .unwrap()
            .contains("Services"));
        assert!(lookup("Where is the moon?").is_none());
    }

    #[tokio::test]
    async fn test_fallback_answer() {
        let tool = FaqLookupTool::new();
        let mut ctx = BuildingProjectContext::new();
        let before = ctx.clone();

        let result = tool
            .execute(serde_json::json!({"question": "Can I park here?"}), &mut ctx)
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.contains("consultants"));
        assert_eq!(ctx, before);
    }

    #[tokio::test]
    async fn test_missing_question_is_invalid() {
        let tool = FaqLookupTool::new();
        let mut ctx = BuildingProjectContext::new();
        assert!(tool.execute(serde_json::json!({}), &mut ctx).await.is_err());
    }
}
