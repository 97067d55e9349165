//! # Persona RAG
//!
//! Retrieval-augmented resume persona: answers questions about one person's
//! career in their own voice, grounded in an indexed resume.
//!
//! ## Pipeline
//!
//! ```text
//! question ─► answer cache ─► relevance gate ─► classify ─► retrieve
//!                 │                 │                          │
//!                 ▼                 ▼                          ▼
//!              cached            refusal       generate ─► refine ─► persist
//! ```
//!
//! ## Modules
//!
//! - [`agent`]: chatbot orchestrator, stages, answer cache and session history
//! - [`vector`]: embeddings, metadata filters and the vector index
//! - [`storage`]: TTL key-value backends
//! - [`ingest`]: resume sources to documents
//! - [`document`]: the indexed unit of knowledge
//!
//! ## Features
//!
//! - `redis`: [`storage::RedisStorage`] backend

#![warn(missing_docs)]

pub mod agent;
pub mod document;
pub mod error;
pub mod ingest;
pub mod storage;
pub mod vector;

pub use agent::{ChatOutcome, Chatbot, ChatbotBuilder, ChatbotConfig};
pub use document::{DocType, Document, DocumentMetadata};
pub use error::{RagError, RagResult};

#[cfg(test)]
pub(crate) mod testing {
    use persona_llm::{
        ChatMessage, ChatResponse, LlmClient, LlmError, LlmResult, ResponseFormat,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;

    type Responder = Box<dyn Fn(&[ChatMessage], ResponseFormat) -> String + Send + Sync>;

    /// LLM double: queued replies first, then the responder, recording every request
    #[derive(Default)]
    pub struct ScriptedLlm {
        replies: Mutex<VecDeque<String>>,
        responder: Option<Responder>,
        requests: Mutex<Vec<(Vec<ChatMessage>, ResponseFormat)>>,
    }

    impl ScriptedLlm {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_reply(self, reply: impl Into<String>) -> Self {
            self.replies.lock().unwrap().push_back(reply.into());
            self
        }

        pub fn with_responder(
            mut self,
            responder: impl Fn(&[ChatMessage], ResponseFormat) -> String + Send + Sync + 'static,
        ) -> Self {
            self.responder = Some(Box::new(responder));
            self
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(messages, _)| messages.clone())
                .collect()
        }

        pub fn formats(&self) -> Vec<ResponseFormat> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(_, format)| *format)
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedLlm {
        async fn chat_completion(
            &self,
            messages: Vec<ChatMessage>,
            format: ResponseFormat,
        ) -> LlmResult<ChatResponse> {
            let queued = self.replies.lock().unwrap().pop_front();
            let reply = match (queued, &self.responder) {
                (Some(reply), _) => Some(reply),
                (None, Some(responder)) => Some(responder(&messages, format)),
                (None, None) => None,
            };

            self.requests.lock().unwrap().push((messages, format));
            reply
                .map(|reply| ChatResponse::text(reply, "scripted"))
                .ok_or_else(|| LlmError::invalid_response("no scripted reply"))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }
}
