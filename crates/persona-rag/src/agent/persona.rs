//! First-person answer generator
//!
//! Drafts an interview-style answer in the resume owner's voice, constrained
//! to the retrieved context. When the backend signals that the context holds
//! nothing relevant, the draft comes back as [`PersonaReply::Ungrounded`]
//! instead of a string the caller would have to pattern-match.

use super::classifier::Category;
use super::memory::{ConversationTurn, HistoryRepository};
use crate::error::{RagError, RagResult};
use persona_llm::{ChatMessage, LlmClient, ResponseFormat};
use std::sync::Arc;
use tracing::debug;

/// Literal the backend is told to emit when the context lacks the answer
///
/// Only ever produced on that path; it never appears in a grounded answer.
pub const GROUNDING_REFUSAL: &str = "제 이력서에는 해당 정보가 없습니다.";

/// Outcome of drafting an answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonaReply {
    /// Draft supported by the context
    Grounded(String),
    /// The context did not cover the question
    Ungrounded,
}

impl PersonaReply {
    /// Classify raw backend output; a blank draft carries no grounded content
    pub fn from_draft(draft: &str) -> Self {
        if draft.trim().is_empty() || draft.contains(GROUNDING_REFUSAL) {
            Self::Ungrounded
        } else {
            Self::Grounded(draft.trim().to_string())
        }
    }

    /// The draft text, if grounded
    pub fn draft(&self) -> Option<&str> {
        match self {
            Self::Grounded(draft) => Some(draft),
            Self::Ungrounded => None,
        }
    }
}

/// Persona answer generator
pub struct PersonaGenerator {
    client: Arc<dyn LlmClient>,
    history: Arc<HistoryRepository>,
    name: String,
    history_window: usize,
}

impl PersonaGenerator {
    /// Create a generator speaking as `name`
    pub fn new(
        client: Arc<dyn LlmClient>,
        history: Arc<HistoryRepository>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            history,
            name: name.into(),
            history_window: 3,
        }
    }

    /// Number of recent exchanges replayed before the question
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Persona name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Draft an answer to `question` from `context`
    ///
    /// Reads the session's compacted history, so a long session is
    /// summarized here as a side effect.
    pub async fn answer(
        &self,
        question: &str,
        category: Category,
        context: &str,
        session_id: &str,
    ) -> RagResult<PersonaReply> {
        let history = self.history.get_summary(session_id).await?;
        let messages = build_messages(
            &self.name,
            question,
            category,
            context,
            &history,
            self.history_window,
        );

        debug!(
            session_id = %session_id,
            category = %category,
            context_chars = context.chars().count(),
            history_turns = history.len(),
            "Drafting persona answer"
        );

        let response = self
            .client
            .chat_completion(messages, ResponseFormat::Text)
            .await
            .map_err(|e| RagError::llm("persona_answer", e))?;

        Ok(PersonaReply::from_draft(&response.content))
    }
}

/// Assemble the prompt: instructions, prior context, then the question
///
/// History contributes the summary marker when present plus the last
/// `window` raw exchanges.
pub fn build_messages(
    name: &str,
    question: &str,
    category: Category,
    context: &str,
    history: &[ConversationTurn],
    window: usize,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(persona_prompt(
        name, question, category, context,
    ))];

    for turn in history.iter().filter(|t| t.is_summary()) {
        if let ConversationTurn::Summary { summary } = turn {
            messages.push(ChatMessage::system(format!("이전 대화 요약: {summary}")));
        }
    }

    let exchanges: Vec<&ConversationTurn> = history.iter().filter(|t| !t.is_summary()).collect();
    let start = exchanges.len().saturating_sub(window);
    for turn in &exchanges[start..] {
        if let ConversationTurn::Exchange { question, answer } = turn {
            messages.push(ChatMessage::user(question.clone()));
            messages.push(ChatMessage::assistant(answer.clone()));
        }
    }

    messages.push(ChatMessage::user(question));
    messages
}

fn persona_prompt(name: &str, question: &str, category: Category, context: &str) -> String {
    format!(
        r#"당신은 {name}으로서 행동하고 있습니다.
당신은 {name}의 웹사이트에서 질문에 답변하고 있으며, 특히 {name}의 경력, 배경, 기술 및 경험과 관련된 질문에 응답하고 있습니다.
당신의 책임은 {name}을 웹사이트 상에서 가능한 한 충실하게 대표하는 것입니다.
당신은 질문에 답하기 위해 {name}의 자기소개 요약과 경력기술서를 제공받았습니다.
잠재적인 고객이나 미래의 고용주가 웹사이트에 방문했을 때 대화하는 것처럼, 전문적이고 매력적인 태도로 답변해야 합니다.
프로젝트 관련 질문을 한다면 STAR 구조(Situation, Task, Action, Result)로 답변을 정리하고, 각 요소는 1문장씩, 총 4문장 이내로 구성합니다.
resume/summary에 없는 질문에는 절대 새로운 사실을 만들어내지 않습니다.
만약 resume/summary에 해당 정보가 전혀 없다면, "{GROUNDING_REFUSAL}"라고만 대답하세요.
추측하거나 새로운 사실을 만들어내지 마세요.

질문: {question}
분류: {label}
이력서 및 요약에서 가져온 컨텍스트: {context}

답변 지침:
- 반드시 한국어로 대답한다.
- 1인칭 시점("저는 ...")으로 말한다.
- 답변은 실제 면접 대화처럼 자연스럽게, 문장 끝을 다양하게 사용한다. (예: ~했습니다 / ~한 경험이 있습니다 / ~한 것이 기억에 남습니다)
- '감사합니다' 같은 형식적인 마무리 문구는 사용하지 않는다.
- 불필요하게 장황하지 않고, 핵심만 담아 3~5문장 정도로 답한다.
- 글을 읽는 듯한 딱딱한 어투가 아니라, 편안하지만 전문적인 면접 톤으로 한다.
- 위와 같은 문맥과 함께, {name}으로서 사용자에게 응답함을 명심한다.
- 개인적인 경험과 성과, 배운 점을 강조한다."#,
        label = category.label(),
    )
}
