//! Guardrail evaluator
//!
//! Looks up the verdict cache, falls back to the judge, and stores what the
//! judge decided. Verdicts the judge returns in an unexpected shape resolve
//! to the conservative outcome and are never cached, so a later call gets a
//! fresh judgment.

use super::{
    GuardrailCache, GuardrailKind, GuardrailResult, JailbreakScreen, JailbreakVerdict, Judge,
    PiiVerdict, RelevanceVerdict,
};
use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Text presented to a guardrail
#[derive(Debug, Clone, Copy)]
pub enum GuardrailInput<'a> {
    /// A single text
    Text(&'a str),
    /// Several turn texts, judged as one
    Items(&'a [String]),
}

impl GuardrailInput<'_> {
    /// Canonical text: items are joined in order with a single space
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::Text(text) => (*text).to_string(),
            Self::Items(items) => items.join(" "),
        }
    }
}

/// Cache key for a guardrail kind and canonical input
#[must_use]
pub fn cache_key(kind: GuardrailKind, canonical: &str) -> String {
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{}:{:x}", kind.cache_prefix(), digest)
}

/// Runs guardrail checks against the judge with caching
pub struct GuardrailEvaluator {
    judge: Arc<dyn Judge>,
    cache: Arc<GuardrailCache>,
    screen: JailbreakScreen,
    timeout: Duration,
}

impl GuardrailEvaluator {
    /// Create an evaluator
    #[must_use]
    pub fn new(judge: Arc<dyn Judge>, cache: Arc<GuardrailCache>, timeout: Duration) -> Self {
        Self {
            judge,
            cache,
            screen: JailbreakScreen::new(),
            timeout,
        }
    }

    /// Shared verdict cache
    #[must_use]
    pub fn cache(&self) -> &Arc<GuardrailCache> {
        &self.cache
    }

    /// Evaluate one guardrail
    ///
    /// # Errors
    /// Returns `CapabilityTimeout` when the judge misses the deadline and
    /// `Capability` when the judge fails outright.
    #[instrument(skip(self, input))]
    pub async fn evaluate(
        &self,
        kind: GuardrailKind,
        agent: &str,
        input: GuardrailInput<'_>,
    ) -> Result<GuardrailResult> {
        let canonical = input.canonical();
        let key = cache_key(kind, &canonical);

        if let Some(hit) = self.cache.get(&key) {
            debug!(passed = hit.passed, "Guardrail cache hit");
            return Ok(hit);
        }
        debug!("Guardrail cache miss");

        if kind == GuardrailKind::Jailbreak {
            if let Some(reasoning) = self.screen.check(&canonical) {
                let result = GuardrailResult::trip(kind, reasoning);
                self.cache.put(key, result.clone());
                info!("Jailbreak pre-screen tripped");
                return Ok(result);
            }
        }

        let judgment = self.judge.judge(kind.instructions(), &canonical);
        let verdict = tokio::time::timeout(self.timeout, judgment)
            .await
            .map_err(|_| Error::CapabilityTimeout {
                operation: "judgment",
                timeout_ms: self.timeout.as_millis() as u64,
            })??;

        match interpret(kind, verdict) {
            Some(result) => {
                if !result.passed {
                    info!(reasoning = %result.reasoning, "Guardrail tripped");
                }
                self.cache.put(key, result.clone());
                Ok(result)
            }
            None => {
                warn!("Guardrail verdict could not be parsed, applying conservative outcome");
                Ok(conservative(kind))
            }
        }
    }
}

fn interpret(kind: GuardrailKind, verdict: serde_json::Value) -> Option<GuardrailResult> {
    match kind {
        GuardrailKind::Relevance => {
            let v: RelevanceVerdict = serde_json::from_value(verdict).ok()?;
            Some(if v.is_relevant {
                GuardrailResult::pass(kind, v.reasoning)
            } else {
                GuardrailResult::trip(kind, v.reasoning)
            })
        }
        GuardrailKind::Jailbreak => {
            let v: JailbreakVerdict = serde_json::from_value(verdict).ok()?;
            Some(if v.is_safe {
                GuardrailResult::pass(kind, v.reasoning)
            } else {
                GuardrailResult::trip(kind, v.reasoning)
            })
        }
        GuardrailKind::Pii => {
            let v: PiiVerdict = serde_json::from_value(verdict).ok()?;
            let mut result = if v.contains_pii {
                GuardrailResult::trip(kind, v.reasoning)
            } else {
                GuardrailResult::pass(kind, v.reasoning)
            };
            result.pii_types = v.pii_types;
            Some(result)
        }
    }
}

fn conservative(kind: GuardrailKind) -> GuardrailResult {
    let reasoning = match kind {
        GuardrailKind::Pii => "Verdict unavailable; response flagged for review",
        _ => "Verdict unavailable; message could not be verified",
    };
    GuardrailResult::trip(kind, reasoning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardrail::MockJudge;
    use serde_json::json;

    fn evaluator(judge: MockJudge) -> GuardrailEvaluator {
        GuardrailEvaluator::new(
            Arc::new(judge),
            Arc::new(GuardrailCache::new(100, Duration::from_secs(3600))),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_cache_key_shape() {
        let key = cache_key(GuardrailKind::Relevance, "Hello");
        assert!(key.starts_with("relevance:"));
        assert_eq!(key.len(), "relevance:".len() + 64);
        assert_ne!(key, cache_key(GuardrailKind::Jailbreak, "Hello"));
    }

    #[test]
    fn test_items_canonicalize_with_single_space() {
        let items = vec!["Hello".to_string(), "I need a house".to_string()];
        let joined = GuardrailInput::Items(&items).canonical();
        assert_eq!(joined, "Hello I need a house");
        assert_eq!(
            cache_key(GuardrailKind::Relevance, &joined),
            cache_key(
                GuardrailKind::Relevance,
                &GuardrailInput::Text("Hello I need a house").canonical()
            )
        );
    }

    #[tokio::test]
    async fn test_identical_input_judged_once() {
        let mut judge = MockJudge::new();
        judge
            .expect_judge()
            .times(1)
            .returning(|_, _| Ok(json!({"reasoning": "poetry", "is_relevant": false})));
        let evaluator = evaluator(judge);

        let input = GuardrailInput::Text("write a poem about strawberries");
        let first = evaluator
            .evaluate(GuardrailKind::Relevance, "Triage Agent", input)
            .await
            .unwrap();
        let second = evaluator
            .evaluate(GuardrailKind::Relevance, "Triage Agent", input)
            .await
            .unwrap();

        assert!(!first.passed);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unparseable_verdict_is_conservative_and_uncached() {
        let mut judge = MockJudge::new();
        judge
            .expect_judge()
            .times(2)
            .returning(|_, _| Ok(json!("no idea")));
        let evaluator = evaluator(judge);

        for _ in 0..2 {
            let result = evaluator
                .evaluate(GuardrailKind::Jailbreak, "Triage Agent", GuardrailInput::Text("Hi"))
                .await
                .unwrap();
            assert!(!result.passed);
        }
        assert!(evaluator.cache().is_empty());
    }

    #[tokio::test]
    async fn test_pii_types_reported() {
        let mut judge = MockJudge::new();
        judge.expect_judge().times(1).returning(|_, _| {
            Ok(json!({
                "reasoning": "contains a private phone number",
                "contains_pii": true,
                "pii_types": ["phone"]
            }))
        });
        let evaluator = evaluator(judge);

        let result = evaluator
            .evaluate(
                GuardrailKind::Pii,
                "Appointment Booking Agent",
                GuardrailInput::Text("Call Anna at 079 123 45 67"),
            )
            .await
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.pii_types, vec!["phone"]);
        assert_eq!(result.guardrail_name, "PII Guardrail");
    }

    #[tokio::test]
    async fn test_prescreen_skips_judge() {
        let mut judge = MockJudge::new();
        judge.expect_judge().times(0);
        let evaluator = evaluator(judge);

        let result = evaluator
            .evaluate(
                GuardrailKind::Jailbreak,
                "Triage Agent",
                GuardrailInput::Text("drop table users;"),
            )
            .await
            .unwrap();
        assert!(!result.passed);
        assert_eq!(evaluator.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_judge_failure_propagates() {
        let mut judge = MockJudge::new();
        judge
            .expect_judge()
            .returning(|_, _| Err(Error::Capability("upstream 500".into())));
        let evaluator = evaluator(judge);

        let err = evaluator
            .evaluate(GuardrailKind::Relevance, "Triage Agent", GuardrailInput::Text("Hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Capability(_)));
        assert!(evaluator.cache().is_empty());
    }

    struct SlowJudge;

    #[async_trait::async_trait]
    impl Judge for SlowJudge {
        async fn judge(&self, _instructions: &str, _input: &str) -> Result<serde_json::Value> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(json!({"reasoning": "late", "is_relevant": true}))
        }
    }

    #[tokio::test]
    async fn test_judge_timeout() {
        let evaluator = GuardrailEvaluator::new(
            Arc::new(SlowJudge),
            Arc::new(GuardrailCache::new(10, Duration::from_secs(60))),
            Duration::from_millis(50),
        );

        let err = evaluator
            .evaluate(GuardrailKind::Relevance, "Triage Agent", GuardrailInput::Text("Hi"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::CapabilityTimeout {
                operation: "judgment",
                ..
            }
        ));
    }
}
