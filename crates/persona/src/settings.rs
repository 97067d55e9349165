//! Chat surface settings
//!
//! Loaded with the `config` crate from an optional TOML file, overridden by
//! `PERSONA__*` environment variables (`__` separates nested keys, e.g.
//! `PERSONA__SOURCES__PROJECTS=data/projects.json`).

use crate::rag::agent::memory::MemoryConfig;
use crate::rag::agent::{ChatbotConfig, DEFAULT_PERSONA_NAME};
use crate::rag::ingest::ResumeSources;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Embedding backend used to index the resume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// The OpenAI-compatible embeddings endpoint
    #[default]
    OpenAi,
    /// Local feature hashing, no network
    Hash,
}

/// Resume source files
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Project list JSON
    pub projects: Option<PathBuf>,
    /// Q&A list JSON
    pub qna: Option<PathBuf>,
    /// Self introduction text
    pub introduction: Option<PathBuf>,
}

/// Settings for the `persona-chat` binary
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name the persona speaks as
    pub persona_name: String,

    /// Minimum cosine similarity for a question to be answered
    pub relevance_threshold: f32,

    /// TTL in seconds for cached answers and session history
    pub ttl_secs: u64,

    /// Redis URL; in-memory storage when unset
    pub redis_url: Option<String>,

    /// Embedding backend
    pub embedding: EmbeddingBackend,

    /// Resume sources
    pub sources: SourceSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let defaults = ChatbotConfig::default();
        Self {
            persona_name: DEFAULT_PERSONA_NAME.to_string(),
            relevance_threshold: defaults.relevance_threshold,
            ttl_secs: defaults.memory.answer_ttl.as_secs(),
            redis_url: None,
            embedding: EmbeddingBackend::default(),
            sources: SourceSettings::default(),
        }
    }
}

impl Settings {
    /// Load from `path` (when given) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        builder
            .add_source(
                Environment::with_prefix("PERSONA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Pipeline configuration
    pub fn chatbot_config(&self) -> ChatbotConfig {
        ChatbotConfig::new()
            .with_persona_name(&self.persona_name)
            .with_relevance_threshold(self.relevance_threshold)
            .with_memory(MemoryConfig::new().with_ttl(Duration::from_secs(self.ttl_secs)))
    }

    /// Resume sources to ingest
    pub fn resume_sources(&self) -> ResumeSources {
        ResumeSources {
            projects: self.sources.projects.clone(),
            qna: self.sources.qna.clone(),
            introduction: self.sources.introduction.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_pipeline() {
        let settings = Settings::default();
        assert_eq!(settings.persona_name, "Yoonha Lee");
        assert_eq!(settings.ttl_secs, 3600);
        assert_eq!(settings.embedding, EmbeddingBackend::OpenAi);
        assert_eq!(settings.chatbot_config(), ChatbotConfig::default());
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
persona_name = "Kim"
relevance_threshold = 0.35
ttl_secs = 60
embedding = "hash"

[sources]
projects = "data/projects.json"
introduction = "data/introduce.txt"
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.persona_name, "Kim");
        assert_eq!(settings.embedding, EmbeddingBackend::Hash);
        assert_eq!(settings.redis_url, None);

        let config = settings.chatbot_config();
        assert_eq!(config.relevance_threshold, 0.35);
        assert_eq!(config.memory.history_ttl, Duration::from_secs(60));

        let sources = settings.resume_sources();
        assert_eq!(sources.projects, Some(PathBuf::from("data/projects.json")));
        assert_eq!(sources.qna, None);
    }
}
