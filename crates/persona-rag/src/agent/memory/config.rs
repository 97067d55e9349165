//! Memory configuration for the chatbot

use super::compression::CompactionConfig;
use std::time::Duration;

/// Configuration for cached answers and session history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConfig {
    /// How long a cached answer lives
    pub answer_ttl: Duration,

    /// How long an idle session's history lives
    pub history_ttl: Duration,

    /// History compaction policy
    pub compaction: CompactionConfig,
}

impl MemoryConfig {
    /// Create the default configuration (one hour TTLs, compact above 10 turns)
    pub fn new() -> Self {
        Self {
            answer_ttl: Duration::from_secs(3600),
            history_ttl: Duration::from_secs(3600),
            compaction: CompactionConfig::default(),
        }
    }

    /// Set both TTLs
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.answer_ttl = ttl;
        self.history_ttl = ttl;
        self
    }

    /// Set the cached answer TTL
    pub fn with_answer_ttl(mut self, ttl: Duration) -> Self {
        self.answer_ttl = ttl;
        self
    }

    /// Set the session history TTL
    pub fn with_history_ttl(mut self, ttl: Duration) -> Self {
        self.history_ttl = ttl;
        self
    }

    /// Set the compaction policy
    pub fn with_compaction(mut self, compaction: CompactionConfig) -> Self {
        self.compaction = compaction;
        self
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::new()
    }
}
