//! Answer cache keyed by question content

use super::cache::CacheStore;
use crate::error::RagResult;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

/// One stored answer to a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAnswer {
    /// Question exactly as asked
    #[serde(default)]
    pub question: String,

    /// Final answer returned to the user
    pub answer: String,

    /// Category the question was classified into
    #[serde(default)]
    pub category: String,

    /// When the answer was stored
    #[serde(deserialize_with = "lenient_timestamp", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Accepts RFC 3339 as well as naive ISO timestamps written by older writers
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

/// Stored value under an answer key
///
/// Current writers store a list; a bare object is the older single-entry shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredAnswers {
    History(Vec<CachedAnswer>),
    Single(CachedAnswer),
}

impl StoredAnswers {
    fn into_history(self) -> Vec<CachedAnswer> {
        match self {
            Self::History(entries) => entries,
            Self::Single(entry) => vec![entry],
        }
    }
}

/// Exact-match answer cache
///
/// Keys are the SHA-256 of the raw question, so only byte-identical
/// questions hit. Each key holds the timestamped history of answers.
#[derive(Clone)]
pub struct AnswerRepository {
    cache: CacheStore,
    ttl: Duration,
}

impl AnswerRepository {
    /// Create a repository whose entries live for `ttl`
    pub fn new(cache: CacheStore, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Append an answer to the question's history; blank answers are not stored
    pub async fn save(&self, question: &str, answer: &str, category: &str) -> RagResult<()> {
        let key = Self::question_key(question);
        if answer.trim().is_empty() {
            debug!(key = %key, "Skipping blank answer");
            return Ok(());
        }
        let mut history = self.history(question).await?;

        history.push(CachedAnswer {
            question: question.to_string(),
            answer: answer.to_string(),
            category: category.to_string(),
            timestamp: Utc::now(),
        });

        debug!(key = %key, entries = history.len(), "Saving cached answer");
        self.cache.save(&key, self.ttl, &history).await
    }

    /// Most recent non-blank answer to `question`, if any
    pub async fn get_answer(&self, question: &str) -> RagResult<Option<String>> {
        Ok(self
            .history(question)
            .await?
            .into_iter()
            .rev()
            .map(|entry| entry.answer)
            .find(|answer| !answer.trim().is_empty()))
    }

    /// Every stored answer to `question`, oldest first
    pub async fn history(&self, question: &str) -> RagResult<Vec<CachedAnswer>> {
        let key = Self::question_key(question);
        Ok(self
            .cache
            .get::<StoredAnswers>(&key)
            .await?
            .map(StoredAnswers::into_history)
            .unwrap_or_default())
    }

    /// Storage key for a question
    pub fn question_key(question: &str) -> String {
        format!("answer::{:x}", Sha256::digest(question.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryStorage, Memory};
    use serde_json::json;
    use std::sync::Arc;

    fn repository(storage: Arc<InMemoryStorage>) -> AnswerRepository {
        AnswerRepository::new(CacheStore::new(storage), Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_latest_answer_wins() {
        let repo = repository(Arc::new(InMemoryStorage::new()));

        assert_eq!(repo.get_answer("자기소개 해주세요").await.unwrap(), None);

        repo.save("자기소개 해주세요", "첫 답변", "self_intro").await.unwrap();
        repo.save("자기소개 해주세요", "둘째 답변", "self_intro").await.unwrap();

        assert_eq!(
            repo.get_answer("자기소개 해주세요").await.unwrap().as_deref(),
            Some("둘째 답변")
        );
        let history = repo.history("자기소개 해주세요").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].answer, "첫 답변");
        assert_eq!(history[1].category, "self_intro");
    }

    #[tokio::test]
    async fn test_exact_match_only() {
        let repo = repository(Arc::new(InMemoryStorage::new()));
        repo.save("기술 스택은?", "Rust", "tech_stack").await.unwrap();

        assert!(repo.get_answer("기술 스택은? ").await.unwrap().is_none());
        assert!(repo.get_answer("기술스택은?").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reads_single_object_shape() {
        let storage = Arc::new(InMemoryStorage::new());
        let key = AnswerRepository::question_key("협업 경험은?");
        storage
            .set_with_ttl(
                &key,
                json!({
                    "answer": "예전 답변",
                    "category": "협업",
                    "timestamp": "2024-05-01T10:20:30.123456"
                }),
                None,
            )
            .await
            .unwrap();

        let repo = repository(storage);
        assert_eq!(
            repo.get_answer("협업 경험은?").await.unwrap().as_deref(),
            Some("예전 답변")
        );

        // Appending upgrades the stored value to the list shape
        repo.save("협업 경험은?", "새 답변", "collaboration").await.unwrap();
        let history = repo.history("협업 경험은?").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].question, "");
    }

    #[tokio::test]
    async fn test_blank_answers_never_hit() {
        let storage = Arc::new(InMemoryStorage::new());
        let repo = repository(storage.clone());

        repo.save("경력은?", "  ", "project_experience").await.unwrap();
        assert!(repo.history("경력은?").await.unwrap().is_empty());
        assert!(storage.is_empty());

        storage
            .set_with_ttl(
                &AnswerRepository::question_key("경력은?"),
                json!({"answer": "", "category": "project_experience",
                       "timestamp": "2024-05-01T10:20:30Z"}),
                None,
            )
            .await
            .unwrap();
        assert_eq!(repo.get_answer("경력은?").await.unwrap(), None);
    }

    #[test]
    fn test_question_key_is_stable_sha256() {
        let key = AnswerRepository::question_key("abc");
        assert_eq!(
            key,
            "answer::ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
