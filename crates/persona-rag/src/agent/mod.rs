//! # Persona Agent
//!
//! The resume persona chatbot and the stages it chains together.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use persona_rag::agent::Chatbot;
//! use persona_rag::vector::{HashEmbeddingProvider, InMemoryVectorIndex};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(persona_llm::Client::from_env()?);
//! let index = Arc::new(InMemoryVectorIndex::new(Arc::new(HashEmbeddingProvider::new(512))));
//!
//! let bot = Chatbot::builder()
//!     .with_llm(client)
//!     .with_index(index)
//!     .build()?;
//!
//! let session = persona_rag::agent::memory::generate_session_id();
//! let reply = bot.chat("최근에 진행한 프로젝트는?", &session).await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Stages
//!
//! - [`Classifier`]: category, temporal hint and metadata filter
//! - [`Retriever`]: filtered search, date re-ranking, relevance gate
//! - [`PersonaGenerator`]: grounded first-person draft
//! - [`Refiner`]: spoken-register polish
//! - [`Summarizer`]: history condensation
//! - [`memory`]: answer cache and session history

mod chatbot;
mod classifier;
mod config;
pub mod memory;
mod persona;
mod refiner;
mod retriever;
mod summarizer;

pub use chatbot::{ChatOutcome, Chatbot, ChatbotBuilder};
pub use classifier::{parse_classification, Category, Classification, Classifier, TimeCondition};
pub use config::{ChatbotConfig, DEFAULT_PERSONA_NAME, REFUSAL_MESSAGE};
pub use persona::{build_messages, PersonaGenerator, PersonaReply, GROUNDING_REFUSAL};
pub use refiner::Refiner;
pub use retriever::{parse_period, sort_by_period, Retriever, RetrieverConfig};
pub use summarizer::{render_transcript, Summarizer};
