//! Brute-force in-memory vector index

use super::{Embedding, EmbeddingProvider, MetadataFilter, ScoredDocument, VectorIndex};
use crate::document::Document;
use crate::error::RagResult;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

struct IndexedDocument {
    document: Document,
    embedding: Embedding,
}

/// Exact cosine-similarity index held in memory
pub struct InMemoryVectorIndex {
    provider: Arc<dyn EmbeddingProvider>,
    entries: RwLock<Vec<IndexedDocument>>,
}

impl InMemoryVectorIndex {
    /// Create an empty index embedding with `provider`
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Embed and index `documents`, returning how many were added
    pub async fn add_documents(&self, documents: Vec<Document>) -> RagResult<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.provider.embed_batch(&texts).await?;

        let added = documents.len();
        let mut entries = self.entries.write().await;
        entries.extend(
            documents
                .into_iter()
                .zip(embeddings)
                .map(|(document, embedding)| IndexedDocument {
                    document,
                    embedding,
                }),
        );

        debug!(
            added,
            total = entries.len(),
            model = self.provider.model_name(),
            "Indexed documents"
        );

        Ok(added)
    }
}

#[async_trait::async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> RagResult<Vec<ScoredDocument>> {
        let compiled = filter.map(MetadataFilter::compile).transpose()?;
        let query_embedding = self.provider.embed(query).await?;

        let entries = self.entries.read().await;
        let mut scored = Vec::new();
        for entry in entries.iter() {
            if let Some(filter) = &compiled {
                if !filter.matches(&entry.document.metadata) {
                    continue;
                }
            }

            let score = query_embedding.cosine_similarity(&entry.embedding)?;
            scored.push(ScoredDocument {
                document: entry.document.clone(),
                score,
            });
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);

        Ok(scored)
    }

    async fn len(&self) -> RagResult<usize> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocType, DocumentMetadata};
    use crate::vector::{FieldPredicate, HashEmbeddingProvider};

    async fn index_with(docs: Vec<Document>) -> InMemoryVectorIndex {
        let index = InMemoryVectorIndex::new(Arc::new(HashEmbeddingProvider::new(512)));
        index.add_documents(docs).await.unwrap();
        index
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let index = index_with(vec![
            Document::new("Kafka streaming pipeline", DocumentMetadata::new(DocType::Projects)),
            Document::new("Rust gateway rewrite", DocumentMetadata::new(DocType::Projects)),
        ])
        .await;

        let results = index.search("Rust gateway", 5, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.content, "Rust gateway rewrite");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_search_applies_filter_and_k() {
        let index = index_with(vec![
            Document::new(
                "Rust at Kakao",
                DocumentMetadata::new(DocType::Projects).with_company("Kakao"),
            ),
            Document::new(
                "Rust at Naver",
                DocumentMetadata::new(DocType::Projects).with_company("Naver"),
            ),
            Document::new("Rust study group", DocumentMetadata::new(DocType::Qna)),
        ])
        .await;

        let filter = MetadataFilter::new(DocType::Projects)
            .with_field("company", FieldPredicate::Regex(".*Kakao.*".to_string()));
        let results = index.search("Rust", 5, Some(&filter)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.content, "Rust at Kakao");

        let results = index.search("Rust", 2, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(index.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_bad_regex_fails_search() {
        let index = index_with(vec![Document::new(
            "Rust",
            DocumentMetadata::new(DocType::Projects),
        )])
        .await;

        let filter = MetadataFilter::new(DocType::Projects)
            .with_field("company", FieldPredicate::Regex("[".to_string()));
        assert!(index.search("Rust", 5, Some(&filter)).await.is_err());
    }
}
