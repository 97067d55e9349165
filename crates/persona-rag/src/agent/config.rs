//! Chatbot configuration

use super::memory::MemoryConfig;
use super::retriever::RetrieverConfig;
use crate::error::{RagError, RagResult};

/// User-facing reply for every "cannot answer" outcome
pub const REFUSAL_MESSAGE: &str =
    "제 이력서나 요약에는 해당 정보가 포함되어 있지 않아서 답변드리기 어려워요.";

/// Persona name used when none is configured
pub const DEFAULT_PERSONA_NAME: &str = "Yoonha Lee";

/// Configuration for the chat pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ChatbotConfig {
    /// Name the persona speaks as
    pub persona_name: String,

    /// Minimum top-1 similarity before any generation happens
    pub relevance_threshold: f32,

    /// Passages passed to the generator
    pub top_k: usize,

    /// Candidates fetched before date re-ranking
    pub time_candidate_k: usize,

    /// Passages returned by the unfiltered fallback query
    pub fallback_k: usize,

    /// Recent exchanges replayed to the generator
    pub history_window: usize,

    /// Reply for low relevance, empty context, ungrounded drafts and
    /// unclassifiable questions
    pub refusal_message: String,

    /// Cache and history settings
    pub memory: MemoryConfig,
}

impl ChatbotConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        let retrieval = RetrieverConfig::default();
        Self {
            persona_name: DEFAULT_PERSONA_NAME.to_string(),
            relevance_threshold: retrieval.relevance_threshold,
            top_k: retrieval.top_k,
            time_candidate_k: retrieval.time_candidate_k,
            fallback_k: retrieval.fallback_k,
            history_window: 3,
            refusal_message: REFUSAL_MESSAGE.to_string(),
            memory: MemoryConfig::default(),
        }
    }

    /// Set the persona name
    pub fn with_persona_name(mut self, name: impl Into<String>) -> Self {
        self.persona_name = name.into();
        self
    }

    /// Set the relevance threshold
    pub fn with_relevance_threshold(mut self, threshold: f32) -> Self {
        self.relevance_threshold = threshold;
        self
    }

    /// Set the number of passages passed to the generator
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the candidate count for date re-ranking
    pub fn with_time_candidate_k(mut self, k: usize) -> Self {
        self.time_candidate_k = k;
        self
    }

    /// Set the fallback query size
    pub fn with_fallback_k(mut self, k: usize) -> Self {
        self.fallback_k = k;
        self
    }

    /// Set the history window
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Set the refusal reply
    pub fn with_refusal_message(mut self, message: impl Into<String>) -> Self {
        self.refusal_message = message.into();
        self
    }

    /// Set the memory configuration
    pub fn with_memory(mut self, memory: MemoryConfig) -> Self {
        self.memory = memory;
        self
    }

    /// Retrieval settings derived from this configuration
    pub fn retriever_config(&self) -> RetrieverConfig {
        RetrieverConfig {
            top_k: self.top_k,
            time_candidate_k: self.time_candidate_k,
            fallback_k: self.fallback_k,
            relevance_threshold: self.relevance_threshold,
        }
    }

    /// Check the configuration for values the pipeline cannot run with
    pub fn validate(&self) -> RagResult<()> {
        if self.persona_name.trim().is_empty() {
            return Err(RagError::validation(
                "persona_name",
                "must not be empty",
                "",
            ));
        }
        if !(-1.0..=1.0).contains(&self.relevance_threshold) {
            return Err(RagError::validation(
                "relevance_threshold",
                "must be a cosine similarity in [-1, 1]",
                self.relevance_threshold.to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(RagError::validation("top_k", "must be positive", "0"));
        }
        if self.time_candidate_k < self.top_k {
            return Err(RagError::validation(
                "time_candidate_k",
                "must be at least top_k",
                self.time_candidate_k.to_string(),
            ));
        }
        if self.fallback_k == 0 {
            return Err(RagError::validation("fallback_k", "must be positive", "0"));
        }
        if self.memory.compaction.keep_recent > self.memory.compaction.threshold {
            return Err(RagError::validation(
                "memory.compaction.keep_recent",
                "must not exceed the compaction threshold",
                self.memory.compaction.keep_recent.to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        Self::new()
    }
}
