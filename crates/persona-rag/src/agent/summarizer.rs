//! Conversation summarizer

use super::memory::ConversationTurn;
use crate::error::{RagError, RagResult};
use persona_llm::{ChatMessage, LlmClient, ResponseFormat};
use std::sync::Arc;
use tracing::debug;

/// Condenses a Q/A transcript into a short narrative (at most five sentences)
pub struct Summarizer {
    client: Arc<dyn LlmClient>,
}

impl Summarizer {
    /// Create a summarizer backed by `client`
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Summarize `turns`; an empty slice yields an empty summary without a backend call
    pub async fn summarize(&self, turns: &[ConversationTurn]) -> RagResult<String> {
        if turns.is_empty() {
            return Ok(String::new());
        }

        let prompt = format!(
            "아래 대화를 5문장 이내로 요약해줘:\n{}",
            render_transcript(turns)
        );

        debug!(turns = turns.len(), "Summarizing conversation");

        let response = self
            .client
            .chat_completion(vec![ChatMessage::system(prompt)], ResponseFormat::Text)
            .await
            .map_err(|e| RagError::llm("summarize", e))?;

        Ok(response.content.trim().to_string())
    }
}

/// Render turns as a `Q:`/`A:` transcript; earlier summaries lead the text
pub fn render_transcript(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|turn| match turn {
            ConversationTurn::Exchange { question, answer } => {
                format!("Q: {question}\nA: {answer}")
            }
            ConversationTurn::Summary { summary } => format!("이전 대화 요약: {summary}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
