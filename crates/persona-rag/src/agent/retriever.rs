//! Context retriever
//!
//! Runs the classifier's filter against the vector index, re-ranks project
//! passages by start date when the question asks for the most recent or the
//! first project, and falls back to a broad unfiltered query when the
//! filtered one faults.

use super::classifier::{Category, Classification, TimeCondition};
use crate::document::Document;
use crate::error::RagResult;
use crate::vector::{ScoredDocument, VectorIndex};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Retrieval knobs
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieverConfig {
    /// Passages returned for a regular query
    pub top_k: usize,

    /// Candidates fetched before date re-ranking
    pub time_candidate_k: usize,

    /// Passages returned by the unfiltered fallback query
    pub fallback_k: usize,

    /// Minimum top-1 similarity for a question to count as answerable
    pub relevance_threshold: f32,
}

impl RetrieverConfig {
    /// Create the default configuration (5 / 20 / 3, threshold 0.2)
    pub fn new() -> Self {
        Self {
            top_k: 5,
            time_candidate_k: 20,
            fallback_k: 3,
            relevance_threshold: 0.2,
        }
    }
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Filtered similarity search with temporal re-ranking
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    config: RetrieverConfig,
}

impl Retriever {
    /// Create a retriever over `index`
    pub fn new(index: Arc<dyn VectorIndex>, config: RetrieverConfig) -> Self {
        Self { index, config }
    }

    /// Retrieval settings
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Matched passages joined by newlines; empty when nothing matched
    pub async fn retrieve(
        &self,
        question: &str,
        classification: &Classification,
    ) -> RagResult<String> {
        let documents = self.retrieve_documents(question, classification).await?;
        Ok(documents
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Matched documents, best first
    ///
    /// A faulting filtered query degrades to an unfiltered top-`fallback_k`
    /// query; only a failure of that fallback is returned as an error.
    pub async fn retrieve_documents(
        &self,
        question: &str,
        classification: &Classification,
    ) -> RagResult<Vec<Document>> {
        match self.filtered_search(question, classification).await {
            Ok(documents) => {
                debug!(
                    passages = documents.len(),
                    doc_type = %classification.filter.doc_type(),
                    "Retrieved passages"
                );
                Ok(documents)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    filter = %classification.filter.to_json(),
                    "Filtered search failed, falling back to unfiltered query"
                );
                let fallback = self
                    .index
                    .search(question, self.config.fallback_k, None)
                    .await?;
                Ok(fallback.into_iter().map(|s| s.document).collect())
            }
        }
    }

    async fn filtered_search(
        &self,
        question: &str,
        classification: &Classification,
    ) -> RagResult<Vec<Document>> {
        let filter = Some(&classification.filter);

        let time_ranked = classification.category == Category::ProjectExperience
            && classification.time_condition != TimeCondition::None;

        if !time_ranked {
            let hits = self.index.search(question, self.config.top_k, filter).await?;
            return Ok(hits.into_iter().map(|s| s.document).collect());
        }

        let candidates = self
            .index
            .search(question, self.config.time_candidate_k, filter)
            .await?;
        let mut documents: Vec<Document> = candidates.into_iter().map(|s| s.document).collect();
        sort_by_period(&mut documents, classification.time_condition);
        documents.truncate(self.config.top_k);

        Ok(documents)
    }

    /// Whether the best unfiltered match clears the relevance threshold
    ///
    /// An empty index is never relevant.
    pub async fn is_context_valid(&self, question: &str) -> RagResult<bool> {
        let best = self.top_score(question).await?;
        let valid = best.is_some_and(|score| score >= self.config.relevance_threshold);

        info!(
            score = best.unwrap_or_default(),
            threshold = self.config.relevance_threshold,
            valid,
            "Relevance check"
        );

        Ok(valid)
    }

    async fn top_score(&self, question: &str) -> RagResult<Option<f32>> {
        if self.index.is_empty().await? {
            return Ok(None);
        }
        let hits: Vec<ScoredDocument> = self.index.search(question, 1, None).await?;
        Ok(hits.first().map(|hit| hit.score))
    }
}

/// Order documents by `period_from` for `condition`
///
/// Documents without a parsable date always go to the back, whichever the
/// direction. The sort is stable, so equal dates keep similarity order.
pub fn sort_by_period(documents: &mut [Document], condition: TimeCondition) {
    if condition == TimeCondition::None {
        return;
    }

    documents.sort_by(|a, b| {
        let a = a.metadata.period_from.as_deref().and_then(parse_period);
        let b = b.metadata.period_from.as_deref().and_then(parse_period);
        match (a, b) {
            (Some(a), Some(b)) => match condition {
                TimeCondition::Recent => b.cmp(&a),
                _ => a.cmp(&b),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

/// Parse a period boundary such as `2023-03-01`, `2023.03` or an ISO timestamp
pub fn parse_period(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }
    for format in ["%Y-%m-%d", "%Y.%m.%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }

    // Year-month only
    let (year, month) = raw.split_once(['-', '.'])?;
    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)?;
    Some(date)
}
