//! Session-scoped conversation history with persistence

use super::cache::CacheStore;
use super::compression::{self, CompactionConfig};
use crate::agent::summarizer::Summarizer;
use crate::error::RagResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// One entry of a session's history
///
/// Stored as `{"q": .., "a": ..}` or `{"summary": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConversationTurn {
    /// A completed question/answer pair
    Exchange {
        /// User question
        #[serde(rename = "q")]
        question: String,
        /// Assistant answer
        #[serde(rename = "a")]
        answer: String,
    },

    /// Compaction marker standing in for older turns
    Summary {
        /// Condensed narrative of the folded turns
        summary: String,
    },
}

impl ConversationTurn {
    /// Create a question/answer turn
    pub fn exchange(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self::Exchange {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Create a summary marker
    pub fn summary(summary: impl Into<String>) -> Self {
        Self::Summary {
            summary: summary.into(),
        }
    }

    /// Whether this is a compaction marker
    pub fn is_summary(&self) -> bool {
        matches!(self, Self::Summary { .. })
    }
}

/// Per-session turn log
///
/// Writes append; compaction happens only when [`Self::get_summary`] is
/// called, so [`Self::get`] and [`Self::get_window`] may see a longer raw log.
pub struct HistoryRepository {
    cache: CacheStore,
    summarizer: Arc<Summarizer>,
    ttl: Duration,
    compaction: CompactionConfig,
}

impl HistoryRepository {
    /// Create a repository whose sessions expire after `ttl` of inactivity
    pub fn new(cache: CacheStore, summarizer: Arc<Summarizer>, ttl: Duration) -> Self {
        Self {
            cache,
            summarizer,
            ttl,
            compaction: CompactionConfig::default(),
        }
    }

    /// Override the compaction policy
    pub fn with_compaction(mut self, compaction: CompactionConfig) -> Self {
        self.compaction = compaction;
        self
    }

    /// Append a completed turn
    pub async fn save(&self, session_id: &str, question: &str, answer: &str) -> RagResult<()> {
        let mut history = self.get(session_id).await?;
        history.push(ConversationTurn::exchange(question, answer));
        self.set(session_id, &history).await
    }

    /// Replace the stored history
    pub async fn set(&self, session_id: &str, history: &[ConversationTurn]) -> RagResult<()> {
        self.cache
            .save(&Self::history_key(session_id), self.ttl, history)
            .await
    }

    /// Full stored history, oldest first
    pub async fn get(&self, session_id: &str) -> RagResult<Vec<ConversationTurn>> {
        Ok(self
            .cache
            .get(&Self::history_key(session_id))
            .await?
            .unwrap_or_default())
    }

    /// The last `n` stored entries
    pub async fn get_window(&self, session_id: &str, n: usize) -> RagResult<Vec<ConversationTurn>> {
        let mut history = self.get(session_id).await?;
        let start = history.len().saturating_sub(n);
        Ok(history.split_off(start))
    }

    /// History bounded by the configured compaction threshold
    pub async fn get_summary(&self, session_id: &str) -> RagResult<Vec<ConversationTurn>> {
        self.get_summary_with_threshold(session_id, self.compaction.threshold)
            .await
    }

    /// History bounded by `threshold`
    ///
    /// When the stored history is longer than `threshold`, everything but the
    /// most recent turns is summarized into a marker at position 0 and the
    /// compacted sequence replaces the stored one. The compacted sequence
    /// never exceeds `threshold`, so repeated reads do not compact again.
    pub async fn get_summary_with_threshold(
        &self,
        session_id: &str,
        threshold: usize,
    ) -> RagResult<Vec<ConversationTurn>> {
        let history = self.get(session_id).await?;
        if !compression::needs_compaction(&history, threshold) {
            return Ok(history);
        }

        let keep = compression::keep_count(threshold, self.compaction.keep_recent);
        let (older, recent) = compression::split_for_compaction(&history, keep);
        if older.is_empty() {
            return Ok(history);
        }

        let summary = self.summarizer.summarize(older).await?;
        let compacted = compression::compact(summary, recent);

        info!(
            session_id = %session_id,
            folded = older.len(),
            kept = recent.len(),
            "Compacted conversation history"
        );

        self.set(session_id, &compacted).await?;
        Ok(compacted)
    }

    fn history_key(session_id: &str) -> String {
        format!("session::{}::history", session_id)
    }
}

/// Generate a unique session ID
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use crate::testing::ScriptedLlm;

    fn repository(llm: Arc<ScriptedLlm>) -> HistoryRepository {
        let cache = CacheStore::new(Arc::new(InMemoryStorage::new()));
        HistoryRepository::new(
            cache,
            Arc::new(Summarizer::new(llm)),
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn test_turn_json_shapes() {
        let exchange = serde_json::to_value(ConversationTurn::exchange("q", "a")).unwrap();
        assert_eq!(exchange, serde_json::json!({"q": "q", "a": "a"}));

        let marker: ConversationTurn =
            serde_json::from_value(serde_json::json!({"summary": "s"})).unwrap();
        assert!(marker.is_summary());
    }

    #[tokio::test]
    async fn test_save_get_window() {
        let repo = repository(Arc::new(ScriptedLlm::new()));
        let session = generate_session_id();

        assert!(repo.get(&session).await.unwrap().is_empty());

        for i in 0..4 {
            repo.save(&session, &format!("q{i}"), &format!("a{i}"))
                .await
                .unwrap();
        }

        let all = repo.get(&session).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0], ConversationTurn::exchange("q0", "a0"));

        let window = repo.get_window(&session, 2).await.unwrap();
        assert_eq!(
            window,
            vec![
                ConversationTurn::exchange("q2", "a2"),
                ConversationTurn::exchange("q3", "a3"),
            ]
        );
        assert_eq!(repo.get_window(&session, 10).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let repo = repository(Arc::new(ScriptedLlm::new()));
        repo.save("s1", "q", "a").await.unwrap();

        assert_eq!(repo.get("s1").await.unwrap().len(), 1);
        assert!(repo.get("s2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_summary_below_threshold_does_not_summarize() {
        let llm = Arc::new(ScriptedLlm::new());
        let repo = repository(llm.clone());

        for i in 0..10 {
            repo.save("s", &format!("q{i}"), &format!("a{i}")).await.unwrap();
        }

        let history = repo.get_summary("s").await.unwrap();
        assert_eq!(history.len(), 10);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_get_summary_compacts_and_persists() {
        let llm = Arc::new(ScriptedLlm::new().with_reply("이전에 프로젝트 이야기를 나눴습니다."));
        let repo = repository(llm.clone());

        for i in 0..12 {
            repo.save("s", &format!("q{i}"), &format!("a{i}")).await.unwrap();
        }

        let history = repo.get_summary("s").await.unwrap();
        assert!(history.len() <= 6);
        assert_eq!(
            history[0],
            ConversationTurn::summary("이전에 프로젝트 이야기를 나눴습니다.")
        );
        assert_eq!(history[5], ConversationTurn::exchange("q11", "a11"));
        assert_eq!(llm.call_count(), 1);

        // Compacted history replaced the stored log
        assert_eq!(repo.get("s").await.unwrap(), history);

        // The summarizer saw only the folded turns
        let prompt = &llm.requests()[0][0].content;
        assert!(prompt.contains("Q: q0"));
        assert!(prompt.contains("Q: q6"));
        assert!(!prompt.contains("Q: q7"));
    }

    #[tokio::test]
    async fn test_custom_threshold() {
        let llm = Arc::new(ScriptedLlm::new().with_reply("요약"));
        let repo = repository(llm.clone())
            .with_compaction(CompactionConfig::default().with_keep_recent(2));

        for i in 0..4 {
            repo.save("s", &format!("q{i}"), &format!("a{i}")).await.unwrap();
        }

        let history = repo.get_summary_with_threshold("s", 3).await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history[0].is_summary());
    }

    #[tokio::test]
    async fn test_threshold_below_keep_recent_compacts_once() {
        let llm = Arc::new(ScriptedLlm::new().with_reply("앞선 대화 요약"));
        let repo = repository(llm.clone());

        for i in 0..4 {
            repo.save("s", &format!("q{i}"), &format!("a{i}")).await.unwrap();
        }

        for _ in 0..3 {
            let history = repo.get_summary_with_threshold("s", 3).await.unwrap();
            assert!(history.len() <= 3);
            assert_eq!(history[0], ConversationTurn::summary("앞선 대화 요약"));
            assert_eq!(history.iter().filter(|t| t.is_summary()).count(), 1);
            assert_eq!(history.last(), Some(&ConversationTurn::exchange("q3", "a3")));
        }
        assert_eq!(llm.call_count(), 1);
    }
}
