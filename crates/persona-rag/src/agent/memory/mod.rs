//! # Chatbot Memory
//!
//! Persistent state of the persona chatbot, all held in a TTL key-value
//! store behind [`crate::storage::Memory`].
//!
//! ## Key Scopes
//!
//! - **Answer**: `answer::<sha256(question)>` - exact-match answer cache
//! - **Session**: `session::<session_id>::history` - per-session turn log
//!
//! ## Components
//!
//! - [`CacheStore`]: typed JSON get/set with TTL
//! - [`AnswerRepository`]: question → answer history
//! - [`HistoryRepository`]: turn log with lazy compaction
//! - [`compression`]: pure compaction helpers
//!
//! ## Example
//!
//! ```rust,no_run
//! use persona_rag::agent::memory::{AnswerRepository, CacheStore};
//! use persona_rag::storage::InMemoryStorage;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = CacheStore::new(Arc::new(InMemoryStorage::new()));
//! let answers = AnswerRepository::new(cache, Duration::from_secs(3600));
//!
//! answers.save("기술 스택은?", "주로 Rust를 씁니다.", "tech_stack").await?;
//! assert!(answers.get_answer("기술 스택은?").await?.is_some());
//! # Ok(())
//! # }
//! ```

mod answers;
mod cache;
pub mod compression;
mod config;
mod conversation;

pub use answers::{AnswerRepository, CachedAnswer};
pub use cache::CacheStore;
pub use compression::CompactionConfig;
pub use config::MemoryConfig;
pub use conversation::{generate_session_id, ConversationTurn, HistoryRepository};
