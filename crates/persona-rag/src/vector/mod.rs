//! Vector embeddings and similarity search over the knowledge base
//!
//! Scores are cosine similarities: higher means closer, range `[-1.0, 1.0]`.
//! Relevance gates therefore compare with `score >= threshold`.

mod filter;
mod in_memory;

pub use filter::{CompiledFilter, FieldPredicate, MetadataFilter};
pub use in_memory::InMemoryVectorIndex;

use crate::document::Document;
use crate::error::{RagError, RagResult};

/// Dense embedding vector
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Wrap a raw vector
    pub fn new(vector: Vec<f32>) -> Self {
        Self(vector)
    }

    /// Number of components
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// Cosine similarity in `[-1.0, 1.0]`; zero when either vector is all zeros
    pub fn cosine_similarity(&self, other: &Embedding) -> RagResult<f32> {
        if self.dimensions() != other.dimensions() {
            return Err(RagError::validation(
                "embedding_dimensions",
                "dimensions must match",
                format!("{} vs {}", self.dimensions(), other.dimensions()),
            ));
        }

        let (dot, norm_a, norm_b) = self
            .0
            .iter()
            .zip(&other.0)
            .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (a, b)| {
                (dot + a * b, na + a * a, nb + b * b)
            });

        if norm_a == 0.0 || norm_b == 0.0 {
            return Ok(0.0);
        }
        Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
    }
}

/// Trait for embedding generation backends
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for the given text
    async fn embed(&self, text: &str) -> RagResult<Embedding>;

    /// Generate embeddings for several texts, in input order
    async fn embed_batch(&self, texts: &[String]) -> RagResult<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Feature-hashing embedding provider (offline use and tests)
///
/// Each lowercase alphanumeric token is hashed into one of `dimensions`
/// buckets, so texts sharing words get positive similarity and texts with
/// no common token score zero.
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    /// Create a new hash-based embedding provider
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn hash_embed(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut vector = vec![0.0; self.dimensions];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> RagResult<Embedding> {
        Ok(Embedding::new(self.hash_embed(text)))
    }

    fn model_name(&self) -> &str {
        "hash-embedding"
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for persona_llm::Client {
    async fn embed(&self, text: &str) -> RagResult<Embedding> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch
            .pop()
            .ok_or_else(|| RagError::retrieval("embed", "backend returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[String]) -> RagResult<Vec<Embedding>> {
        let vectors = self
            .embeddings(texts.to_vec())
            .await
            .map_err(|e| RagError::llm("embed", e))?;

        Ok(vectors.into_iter().map(Embedding::new).collect())
    }

    fn model_name(&self) -> &str {
        &self.config().embedding_model
    }
}

/// A document returned by a similarity search
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    /// The matched document
    pub document: Document,

    /// Cosine similarity to the query (higher is closer)
    pub score: f32,
}

/// Nearest-neighbour search over indexed documents
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `k` documents closest to `query`, best first
    ///
    /// Errors when the filter cannot be evaluated or the backend fails.
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> RagResult<Vec<ScoredDocument>>;

    /// Number of indexed documents
    async fn len(&self) -> RagResult<usize>;

    /// Whether the index holds no documents
    async fn is_empty(&self) -> RagResult<bool> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_cosine_similarity() {
        let emb1 = Embedding::new(vec![1.0, 0.0, 0.0]);
        let emb2 = Embedding::new(vec![2.0, 0.0, 0.0]);
        let emb3 = Embedding::new(vec![0.0, 1.0, 0.0]);
        let opposite = Embedding::new(vec![-1.0, 0.0, 0.0]);

        let sim = emb1.cosine_similarity(&emb2).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);

        let sim = emb1.cosine_similarity(&emb3).unwrap();
        assert!(sim.abs() < 1e-6);

        let sim = emb1.cosine_similarity(&opposite).unwrap();
        assert!((sim + 1.0).abs() < 1e-6);

        let short = Embedding::new(vec![1.0]);
        assert!(emb1.cosine_similarity(&short).is_err());
    }

    #[tokio::test]
    async fn test_hash_embedding_provider() {
        let provider = HashEmbeddingProvider::new(256);

        let emb1 = provider.embed("Rust backend project").await.unwrap();
        let emb2 = provider.embed("rust BACKEND project").await.unwrap();
        let emb3 = provider.embed("Kafka").await.unwrap();
        let empty = provider.embed("").await.unwrap();

        assert_eq!(emb1.dimensions(), 256);

        // Case-insensitive tokens produce the same vector
        let sim = emb1.cosine_similarity(&emb2).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);

        let sim = emb1.cosine_similarity(&emb3).unwrap();
        assert!(sim < 1.0);

        assert_eq!(emb1.cosine_similarity(&empty).unwrap(), 0.0);
    }
}
