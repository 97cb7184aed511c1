//! Configuration for the orchestration pipeline
//!
//! Every section deserializes with defaults, so a partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What happens to agent output when an output guardrail trips
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputPolicy {
    /// Report the check and return the content unchanged
    #[default]
    Flag,
    /// Replace the turn's messages with a withheld notice
    Suppress,
}

/// Guardrail evaluation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailConfig {
    /// Maximum cached verdicts
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    /// Verdict lifetime in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Deadline for one judgment call
    #[serde(default = "default_judge_timeout_secs")]
    pub judge_timeout_secs: u64,
    /// Output guardrail policy
    #[serde(default)]
    pub output_policy: OutputPolicy,
    /// Text shown instead of suppressed output
    #[serde(default = "default_withheld_message")]
    pub withheld_message: String,
}

fn default_cache_size() -> usize {
    1000
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_judge_timeout_secs() -> u64 {
    15
}

fn default_withheld_message() -> String {
    "This response was withheld because it may contain personal information. \
     Please contact us at 041 570 70 70."
        .to_string()
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            cache_size: default_cache_size(),
            cache_ttl_secs: default_cache_ttl_secs(),
            judge_timeout_secs: default_judge_timeout_secs(),
            output_policy: OutputPolicy::default(),
            withheld_message: default_withheld_message(),
        }
    }
}

impl GuardrailConfig {
    /// Cache TTL
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Judgment deadline
    #[must_use]
    pub fn judge_timeout(&self) -> Duration {
        Duration::from_secs(self.judge_timeout_secs)
    }
}

/// Turn execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Deadline for one agent invocation
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    /// Handoffs followed within one turn
    #[serde(default = "default_max_handoffs")]
    pub max_handoffs_per_turn: usize,
    /// Tool rounds per agent invocation
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
    /// Longest accepted user message, in characters
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    /// Reply sent when an input guardrail trips
    #[serde(default = "default_refusal_message")]
    pub refusal_message: String,
}

fn default_generation_timeout_secs() -> u64 {
    60
}

fn default_max_handoffs() -> usize {
    3
}

fn default_max_tool_iterations() -> usize {
    8
}

fn default_max_message_chars() -> usize {
    4000
}

fn default_refusal_message() -> String {
    "Sorry, I can only answer questions related to building and construction.".to_string()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            generation_timeout_secs: default_generation_timeout_secs(),
            max_handoffs_per_turn: default_max_handoffs(),
            max_tool_iterations: default_max_tool_iterations(),
            max_message_chars: default_max_message_chars(),
            refusal_message: default_refusal_message(),
        }
    }
}

impl RunnerConfig {
    /// Generation deadline
    #[must_use]
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

/// Conversation store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process memory
    #[default]
    Memory,
    /// SQLite file
    Sqlite,
}

/// Conversation store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend
    #[serde(default)]
    pub backend: StoreBackend,
    /// Idle lifetime of a conversation in seconds
    #[serde(default = "default_store_ttl_secs")]
    pub ttl_secs: u64,
    /// Maximum live conversations
    #[serde(default = "default_max_conversations")]
    pub max_conversations: usize,
    /// Database path for the SQLite backend
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
}

fn default_store_ttl_secs() -> u64 {
    3600
}

fn default_max_conversations() -> usize {
    1000
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("data/state.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            ttl_secs: default_store_ttl_secs(),
            max_conversations: default_max_conversations(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

impl StoreConfig {
    /// Conversation TTL
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Turn history backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    /// SQLite file
    #[default]
    Sqlite,
    /// Process memory
    Memory,
}

/// Replication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Redis URL; contexts stay local when unset
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Lifetime of a replicated context in seconds
    #[serde(default = "default_context_ttl_secs")]
    pub context_ttl_secs: u64,
    /// Turn history backend
    #[serde(default)]
    pub history_backend: HistoryBackend,
    /// Turn history database
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
}

fn default_context_ttl_secs() -> u64 {
    86400
}

fn default_history_path() -> PathBuf {
    PathBuf::from(crate::replication::DEFAULT_HISTORY_PATH)
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            context_ttl_secs: default_context_ttl_secs(),
            history_backend: HistoryBackend::default(),
            history_path: default_history_path(),
        }
    }
}

impl ReplicationConfig {
    /// Context TTL
    #[must_use]
    pub fn context_ttl(&self) -> Duration {
        Duration::from_secs(self.context_ttl_secs)
    }
}
