//! # Persona - Resume Persona Chatbot
//!
//! **Persona** answers questions about one person's career, in their own
//! voice, grounded in their resume:
//!
//! - **Persona LLM**: OpenAI-compatible chat and embedding client
//! - **Persona RAG**: classify → retrieve → generate → refine pipeline with
//!   an answer cache and per-session history
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use persona::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(Client::from_env()?);
//!
//!     let index = Arc::new(InMemoryVectorIndex::new(client.clone()));
//!     let sources = ResumeSources::new()
//!         .with_projects("data/projects.json")
//!         .with_qna("data/qna.json")
//!         .with_introduction("data/introduce.txt");
//!     index.add_documents(load_documents(&sources).await?).await?;
//!
//!     let bot = Chatbot::builder()
//!         .with_llm(client)
//!         .with_index(index)
//!         .build()?;
//!
//!     let session = generate_session_id();
//!     println!("{}", bot.chat("최근에 진행한 프로젝트는?", &session).await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────┐
//! │            Persona              │
//! │  (Umbrella crate + chat CLI)    │
//! └───────────────┬─────────────────┘
//!                 │
//!         ┌───────┴───────┐
//!         │               │
//!     ┌───▼───┐       ┌───▼───┐
//!     │  LLM  │◄──────│  RAG  │
//!     └───────┘       └───────┘
//! ```

#![warn(missing_docs)]

// Re-export sub-crates
#[cfg(feature = "llm")]
pub use persona_llm as llm;

#[cfg(feature = "rag")]
pub use persona_rag as rag;

#[cfg(feature = "rag")]
pub mod settings;

/// Commonly used types and traits
pub mod prelude {
    #[cfg(feature = "llm")]
    pub use crate::llm::{ChatMessage, ChatResponse, Client, ClientConfig, LlmClient, MessageRole};

    #[cfg(feature = "rag")]
    pub use crate::rag::{
        agent::{ChatOutcome, Chatbot, ChatbotBuilder, ChatbotConfig},
        error::{RagError, RagResult},
        ingest::{load_documents, ResumeSources},
        storage::{InMemoryStorage, Memory},
        vector::{HashEmbeddingProvider, InMemoryVectorIndex, VectorIndex},
    };

    #[cfg(feature = "rag")]
    pub use crate::rag::agent::memory::{
        generate_session_id, AnswerRepository, CacheStore, CompactionConfig, ConversationTurn,
        HistoryRepository, MemoryConfig,
    };

    #[cfg(feature = "redis")]
    pub use crate::rag::storage::RedisStorage;
}
