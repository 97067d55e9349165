//! Chat pipeline orchestration
//!
//! One message makes one linear pass:
//! cache → relevance gate → classify → retrieve → generate → refine → persist.
//! Every early exit returns before persistence, so only completed passes are
//! cached or remembered.

use super::classifier::{Category, Classifier};
use super::config::ChatbotConfig;
use super::memory::{AnswerRepository, CacheStore, HistoryRepository};
use super::persona::{PersonaGenerator, PersonaReply};
use super::refiner::Refiner;
use super::retriever::Retriever;
use super::summarizer::Summarizer;
use crate::error::{RagError, RagResult};
use crate::storage::{InMemoryStorage, Memory};
use crate::vector::VectorIndex;
use persona_llm::LlmClient;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Terminal state of one chat pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    /// A cached answer for the exact question
    CacheHit(String),
    /// Best match fell below the relevance threshold
    LowRelevance,
    /// The classifier produced unusable output
    Unclassified,
    /// The filtered search found no passages
    EmptyContext,
    /// The generator reported that the context does not cover the question
    Ungrounded,
    /// A refined, persisted answer
    Answered {
        /// Final reply
        answer: String,
        /// Category the question was classified into
        category: Category,
    },
}

impl ChatOutcome {
    /// Reply text, substituting `refusal` for every "cannot answer" state
    pub fn reply<'a>(&'a self, refusal: &'a str) -> &'a str {
        match self {
            Self::CacheHit(answer) | Self::Answered { answer, .. } => answer,
            Self::LowRelevance | Self::Unclassified | Self::EmptyContext | Self::Ungrounded => {
                refusal
            }
        }
    }

    /// Owned reply text
    pub fn into_reply(self, refusal: &str) -> String {
        match self {
            Self::CacheHit(answer) | Self::Answered { answer, .. } => answer,
            _ => refusal.to_string(),
        }
    }

    /// Whether this pass wrote to the answer cache and session history
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Answered { .. })
    }

    /// Short state name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CacheHit(_) => "cache_hit",
            Self::LowRelevance => "low_relevance",
            Self::Unclassified => "unclassified",
            Self::EmptyContext => "empty_context",
            Self::Ungrounded => "ungrounded",
            Self::Answered { .. } => "answered",
        }
    }
}

/// Resume persona chatbot
pub struct Chatbot {
    config: ChatbotConfig,
    answers: AnswerRepository,
    history: Arc<HistoryRepository>,
    classifier: Classifier,
    retriever: Retriever,
    persona: PersonaGenerator,
    refiner: Refiner,
}

impl Chatbot {
    /// Start building a chatbot
    pub fn builder() -> ChatbotBuilder {
        ChatbotBuilder::new()
    }

    /// Answer `message` within `session_id`, returning the reply text
    pub async fn chat(&self, message: &str, session_id: &str) -> RagResult<String> {
        let outcome = self.respond(message, session_id).await?;
        Ok(outcome.into_reply(&self.config.refusal_message))
    }

    /// Run the pipeline and report which terminal state it reached
    ///
    /// Backend and storage failures propagate; retrieval faults are absorbed
    /// by the retriever and malformed classifications end as
    /// [`ChatOutcome::Unclassified`].
    pub async fn respond(&self, message: &str, session_id: &str) -> RagResult<ChatOutcome> {
        if let Some(answer) = self.answers.get_answer(message).await? {
            info!(session_id = %session_id, "Answer cache hit");
            return Ok(ChatOutcome::CacheHit(answer));
        }
        debug!(session_id = %session_id, "Answer cache miss");

        if !self.retriever.is_context_valid(message).await? {
            return Ok(self.exit(session_id, ChatOutcome::LowRelevance));
        }

        let classification = match self.classifier.classify(message).await {
            Ok(classification) => classification,
            Err(RagError::Classification { reason }) => {
                warn!(session_id = %session_id, reason = %reason, "Classification failed");
                return Ok(self.exit(session_id, ChatOutcome::Unclassified));
            }
            Err(e) => return Err(e),
        };

        let context = self.retriever.retrieve(message, &classification).await?;
        if context.trim().is_empty() {
            return Ok(self.exit(session_id, ChatOutcome::EmptyContext));
        }

        let draft = match self
            .persona
            .answer(message, classification.category, &context, session_id)
            .await?
        {
            PersonaReply::Grounded(draft) => draft,
            PersonaReply::Ungrounded => {
                return Ok(self.exit(session_id, ChatOutcome::Ungrounded));
            }
        };

        let refined = self.refiner.refine(&draft).await?;
        let answer = if refined.trim().is_empty() {
            warn!(session_id = %session_id, "Refiner returned a blank answer, keeping the draft");
            draft
        } else {
            refined
        };

        // Answer cache first: a failed history write still leaves a retry served from cache
        self.answers
            .save(message, &answer, classification.category.as_str())
            .await?;
        self.history.save(session_id, message, &answer).await?;

        info!(
            session_id = %session_id,
            category = %classification.category,
            answer_chars = answer.chars().count(),
            "Answered and persisted"
        );

        Ok(ChatOutcome::Answered {
            answer,
            category: classification.category,
        })
    }

    fn exit(&self, session_id: &str, outcome: ChatOutcome) -> ChatOutcome {
        info!(session_id = %session_id, outcome = outcome.as_str(), "Refusing without persistence");
        outcome
    }

    /// Pipeline configuration
    pub fn config(&self) -> &ChatbotConfig {
        &self.config
    }

    /// Answer cache
    pub fn answers(&self) -> &AnswerRepository {
        &self.answers
    }

    /// Session history
    pub fn history(&self) -> &HistoryRepository {
        &self.history
    }
}

/// Builder for [`Chatbot`]
///
/// An LLM client and a vector index are required; storage defaults to
/// [`InMemoryStorage`].
#[derive(Default)]
pub struct ChatbotBuilder {
    llm: Option<Arc<dyn LlmClient>>,
    index: Option<Arc<dyn VectorIndex>>,
    storage: Option<Arc<dyn Memory>>,
    config: ChatbotConfig,
}

impl ChatbotBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the generation backend
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Set the knowledge base index
    pub fn with_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the key-value store for answers and history
    pub fn with_storage(mut self, storage: Arc<dyn Memory>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set the pipeline configuration
    pub fn with_config(mut self, config: ChatbotConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate and assemble the chatbot
    pub fn build(self) -> RagResult<Chatbot> {
        let llm = self
            .llm
            .ok_or_else(|| RagError::validation("llm", "required", "none"))?;
        let index = self
            .index
            .ok_or_else(|| RagError::validation("index", "required", "none"))?;
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(InMemoryStorage::new()));
        let config = self.config;
        config.validate()?;

        let cache = CacheStore::new(storage);
        let answers = AnswerRepository::new(cache.clone(), config.memory.answer_ttl);
        let history = Arc::new(
            HistoryRepository::new(
                cache.clone(),
                Arc::new(Summarizer::new(llm.clone())),
                config.memory.history_ttl,
            )
            .with_compaction(config.memory.compaction),
        );

        let persona = PersonaGenerator::new(llm.clone(), history.clone(), &config.persona_name)
            .with_history_window(config.history_window);

        info!(
            model = llm.model_name(),
            storage = cache.backend_name(),
            persona = %config.persona_name,
            "Chatbot ready"
        );

        Ok(Chatbot {
            answers,
            history,
            classifier: Classifier::new(llm.clone()),
            retriever: Retriever::new(index, config.retriever_config()),
            persona,
            refiner: Refiner::new(llm),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::config::REFUSAL_MESSAGE;
    use crate::agent::persona::GROUNDING_REFUSAL;
    use crate::document::{DocType, Document, DocumentMetadata};
    use crate::testing::ScriptedLlm;
    use crate::vector::{HashEmbeddingProvider, InMemoryVectorIndex};
    use persona_llm::{ChatMessage, ResponseFormat};

    const TECH_CLASSIFICATION: &str =
        r#"{"category": "tech_stack", "time_condition": "none", "filters": {"doc_type": "projects"}}"#;

    async fn index() -> Arc<InMemoryVectorIndex> {
        let index = Arc::new(InMemoryVectorIndex::new(Arc::new(
            HashEmbeddingProvider::new(4096),
        )));
        index
            .add_documents(vec![Document::new(
                "rust tokio backend project",
                DocumentMetadata::new(DocType::Projects).with_tech_stack("Rust, Tokio"),
            )])
            .await
            .unwrap();
        index
    }

    async fn chatbot(llm: Arc<ScriptedLlm>) -> Chatbot {
        Chatbot::builder()
            .with_llm(llm)
            .with_index(index().await)
            .build()
            .unwrap()
    }

    /// Answers by stage: classification in JSON mode, refinement by its prompt,
    /// everything else as the persona draft
    fn staged(draft: &'static str) -> Arc<ScriptedLlm> {
        Arc::new(ScriptedLlm::new().with_responder(
            move |messages: &[ChatMessage], format: ResponseFormat| {
                if format == ResponseFormat::JsonObject {
                    TECH_CLASSIFICATION.to_string()
                } else if messages[0].content.contains("면접 답변 초안") {
                    "다듬은 답변".to_string()
                } else {
                    draft.to_string()
                }
            },
        ))
    }

    #[tokio::test]
    async fn test_second_identical_question_hits_cache() {
        let llm = staged("초안 답변");
        let bot = chatbot(llm.clone()).await;

        let first = bot.respond("rust backend 기술은?", "s1").await.unwrap();
        assert!(first.is_persisted());
        let calls = llm.call_count();
        assert_eq!(calls, 3);

        let second = bot.respond("rust backend 기술은?", "s2").await.unwrap();
        assert_eq!(second, ChatOutcome::CacheHit("다듬은 답변".to_string()));
        assert_eq!(llm.call_count(), calls);
    }

    #[tokio::test]
    async fn test_answered_pass_persists_history_and_cache() {
        let llm = staged("초안 답변");
        let bot = chatbot(llm).await;

        let reply = bot.chat("rust backend 기술은?", "s1").await.unwrap();
        assert_eq!(reply, "다듬은 답변");

        let history = bot.history().get("s1").await.unwrap();
        assert_eq!(history.len(), 1);
        let cached = bot.answers().history("rust backend 기술은?").await.unwrap();
        assert_eq!(cached[0].category, "tech_stack");
    }

    #[tokio::test]
    async fn test_low_relevance_skips_generation() {
        let llm = staged("초안 답변");
        let bot = chatbot(llm.clone()).await;

        let outcome = bot.respond("주말에 뭐 하세요?", "s1").await.unwrap();
        assert_eq!(outcome, ChatOutcome::LowRelevance);
        assert_eq!(outcome.reply(REFUSAL_MESSAGE), REFUSAL_MESSAGE);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_context_refuses_without_writes() {
        let llm = Arc::new(ScriptedLlm::new().with_reply(
            r#"{"category": "self_intro", "time_condition": "none", "filters": {"doc_type": "summary"}}"#,
        ));
        let bot = chatbot(llm.clone()).await;

        let reply = bot.chat("rust 개발자 자기소개", "s1").await.unwrap();
        assert_eq!(reply, REFUSAL_MESSAGE);
        assert_eq!(llm.call_count(), 1);
        assert!(bot.history().get("s1").await.unwrap().is_empty());
        assert!(bot
            .answers()
            .get_answer("rust 개발자 자기소개")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_sentinel_draft_maps_to_refusal() {
        let llm = staged(GROUNDING_REFUSAL);
        let bot = chatbot(llm.clone()).await;

        let outcome = bot.respond("rust backend 기술은?", "s1").await.unwrap();
        assert_eq!(outcome, ChatOutcome::Ungrounded);
        assert_eq!(bot.chat("rust backend 기술은?", "s1").await.unwrap(), REFUSAL_MESSAGE);

        // classify + draft per pass, refiner never called
        assert_eq!(llm.call_count(), 4);
        assert!(bot.history().get("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_classification_is_refused() {
        let llm = Arc::new(ScriptedLlm::new().with_reply("tech stack"));
        let bot = chatbot(llm).await;

        let outcome = bot.respond("rust backend 기술은?", "s1").await.unwrap();
        assert_eq!(outcome, ChatOutcome::Unclassified);
    }

    #[tokio::test]
    async fn test_blank_refinement_keeps_draft() {
        let llm = Arc::new(ScriptedLlm::new().with_responder(
            |messages: &[ChatMessage], format: ResponseFormat| {
                if format == ResponseFormat::JsonObject {
                    TECH_CLASSIFICATION.to_string()
                } else if messages[0].content.contains("면접 답변 초안") {
                    "  \n".to_string()
                } else {
                    "초안 답변".to_string()
                }
            },
        ));
        let bot = chatbot(llm).await;

        assert_eq!(bot.chat("rust backend 기술은?", "s1").await.unwrap(), "초안 답변");
        assert_eq!(
            bot.answers().get_answer("rust backend 기술은?").await.unwrap().as_deref(),
            Some("초안 답변")
        );
    }

    #[tokio::test]
    async fn test_blank_draft_is_refused_without_writes() {
        let llm = staged("");
        let bot = chatbot(llm.clone()).await;

        let outcome = bot.respond("rust backend 기술은?", "s1").await.unwrap();
        assert_eq!(outcome, ChatOutcome::Ungrounded);
        assert!(bot.history().get("s1").await.unwrap().is_empty());
        assert!(bot.answers().history("rust backend 기술은?").await.unwrap().is_empty());
    }

    /// Storage whose session history writes fail
    struct HistoryOutage(InMemoryStorage);

    #[async_trait::async_trait]
    impl Memory for HistoryOutage {
        async fn set_with_ttl(
            &self,
            key: &str,
            value: serde_json::Value,
            ttl: Option<std::time::Duration>,
        ) -> RagResult<()> {
            if key.starts_with("session::") {
                return Err(RagError::storage("set", "history backend unavailable"));
            }
            self.0.set_with_ttl(key, value, ttl).await
        }

        async fn get(&self, key: &str) -> RagResult<Option<serde_json::Value>> {
            self.0.get(key).await
        }

        async fn delete(&self, key: &str) -> RagResult<bool> {
            self.0.delete(key).await
        }

        fn backend_name(&self) -> &str {
            "history_outage"
        }
    }

    #[tokio::test]
    async fn test_answer_is_cached_before_history_write() {
        let llm = staged("초안 답변");
        let bot = Chatbot::builder()
            .with_llm(llm.clone())
            .with_index(index().await)
            .with_storage(Arc::new(HistoryOutage(InMemoryStorage::new())))
            .build()
            .unwrap();

        let err = bot.respond("rust backend 기술은?", "s1").await.unwrap_err();
        assert!(matches!(err, RagError::Storage { .. }));

        let calls = llm.call_count();
        let retry = bot.respond("rust backend 기술은?", "s1").await.unwrap();
        assert_eq!(retry, ChatOutcome::CacheHit("다듬은 답변".to_string()));
        assert_eq!(llm.call_count(), calls);
    }

    #[test]
    fn test_builder_requires_collaborators() {
        assert!(Chatbot::builder().build().is_err());
        assert!(Chatbot::builder()
            .with_llm(Arc::new(ScriptedLlm::new()))
            .build()
            .is_err());
    }
}
