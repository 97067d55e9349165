//! # Persona LLM
//!
//! Minimal chat-completion client used by the persona pipeline.
//!
//! - [`ChatMessage`] / [`MessageRole`]: ordered prompt messages
//! - [`ResponseFormat`]: free text or strict JSON object output
//! - [`LlmClient`]: the seam every pipeline stage talks to
//! - [`Client`]: OpenAI-compatible HTTP implementation (chat + embeddings)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use persona_llm::{ChatMessage, Client, LlmClient, ResponseFormat};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::from_env()?;
//! let response = client
//!     .chat_completion(vec![ChatMessage::user("Hello")], ResponseFormat::Text)
//!     .await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod client;
mod error;
mod message;

pub use client::{Client, ClientConfig};
pub use error::{LlmError, LlmResult};
pub use message::{ChatMessage, ChatResponse, MessageRole, ResponseFormat, Usage};

/// A text-generation backend.
///
/// Implementations turn an ordered message list into a single completion.
/// `ResponseFormat::JsonObject` asks the backend to emit one JSON object.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete the conversation and return the assistant's reply
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        format: ResponseFormat,
    ) -> LlmResult<ChatResponse>;

    /// Model identifier used for completions
    fn model_name(&self) -> &str;
}
