//! Error types for erni-core
//!
//! Every variant maps to a message that is safe to return to API callers.
//! Capability failures keep their detail for the logs only.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Agent registry or handoff graph is inconsistent
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Generation or judgment exceeded its deadline
    #[error("{operation} timed out after {timeout_ms}ms")]
    CapabilityTimeout {
        /// What timed out ("generation" or "judgment")
        operation: &'static str,
        /// Deadline in milliseconds
        timeout_ms: u64,
    },

    /// Generation or judgment failed
    #[error("capability error: {0}")]
    Capability(String),

    /// Turn request rejected before entering the state machine
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown agent or conversation
    #[error("not found: {0}")]
    NotFound(String),

    /// Conversation store or history failure
    #[error("store error: {0}")]
    Store(String),

    /// LLM provider error
    #[error("llm error: {0}")]
    Llm(#[from] erni_llm::Error),

    /// Tool error
    #[error("tool error: {0}")]
    Tool(#[from] erni_tools::Error),

    /// Internal error (serialization, task failures)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the caller is at fault (maps to a 4xx status)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }

    /// Message safe to show to API callers
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::NotFound(what) => format!("not found: {what}"),
            _ => "internal error".to_string(),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(Error::Validation("too long".into()).is_client_error());
        assert!(Error::NotFound("agent".into()).is_client_error());
        assert!(!Error::Capability("boom".into()).is_client_error());
    }

    #[test]
    fn test_public_message_hides_detail() {
        let err = Error::Capability("upstream said: sk-secret".into());
        assert_eq!(err.public_message(), "internal error");

        let err = Error::CapabilityTimeout {
            operation: "generation",
            timeout_ms: 30_000,
        };
        assert_eq!(err.public_message(), "internal error");
        assert_eq!(err.to_string(), "generation timed out after 30000ms");

        let err = Error::Validation("message exceeds 4000 characters".into());
        assert_eq!(err.public_message(), "message exceeds 4000 characters");
    }
}
