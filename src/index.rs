//! In-memory vector similarity index.
//!
//! An immutable snapshot mapping each corpus chunk to its embedding vector.
//! Built atomically from the full chunk set; a partially built index is
//! never observable because construction either returns a complete value or
//! an error. Search is brute-force cosine similarity, which is ample for a
//! single-document corpus.

use crate::chunk::Chunk;
use crate::embedding::{cosine_similarity, Embedder};
use crate::error::RagError;

#[derive(Debug)]
struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Immutable chunk-to-vector snapshot supporting top-K similarity search.
#[derive(Debug)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
}

/// A retrieved chunk with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

impl VectorIndex {
    /// Embed every chunk and build the snapshot in one pass.
    ///
    /// Any embedding failure aborts the whole build; nothing is retained
    /// from a failed attempt.
    pub async fn build(chunks: Vec<Chunk>, embedder: &dyn Embedder) -> Result<Self, RagError> {
        if chunks.is_empty() {
            return Err(RagError::retrieval("cannot build an index from zero chunks"));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;

        if vectors.len() != chunks.len() {
            return Err(RagError::retrieval(format!(
                "embedding count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();

        Ok(Self { entries })
    }

    /// The `k` most similar chunks to the query vector, highest first.
    /// Ties break on chunk index for determinism.
    pub fn top_k(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(query, &entry.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.chunk.index.cmp(&b.chunk.index))
        });
        scored.truncate(k);
        scored
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::split_corpus;
    use crate::embedding::HashEmbedder;
    use async_trait::async_trait;

    fn corpus_chunks() -> Vec<Chunk> {
        let text = "Squat with a neutral spine and drive through the heels.\n\n\
            Protein intake supports muscle recovery after training.\n\n\
            Treadmill warm ups raise the heart rate before lifting.";
        split_corpus(text, 60, 10)
    }

    #[tokio::test]
    async fn test_build_and_search() {
        let embedder = HashEmbedder::new(64);
        let index = VectorIndex::build(corpus_chunks(), &embedder).await.unwrap();
        assert!(index.len() >= 3);

        let query = embedder.embed("how to squat with neutral spine").await.unwrap();
        let results = index.top_k(&query, 2);
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
        assert!(results[0].chunk.text.contains("Squat"));
    }

    #[tokio::test]
    async fn test_top_k_never_exceeds_index_size() {
        let embedder = HashEmbedder::new(32);
        let index = VectorIndex::build(corpus_chunks(), &embedder).await.unwrap();
        let query = embedder.embed("protein").await.unwrap();
        let results = index.top_k(&query, 100);
        assert_eq!(results.len(), index.len());
    }

    #[tokio::test]
    async fn test_zero_chunks_rejected() {
        let embedder = HashEmbedder::new(32);
        let err = VectorIndex::build(Vec::new(), &embedder).await.unwrap_err();
        assert!(err.to_string().contains("zero chunks"));
    }

    struct CountMismatchEmbedder;

    #[async_trait]
    impl Embedder for CountMismatchEmbedder {
        fn model_name(&self) -> &str {
            "broken"
        }
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            Ok(vec![vec![1.0, 0.0]])
        }
    }

    #[tokio::test]
    async fn test_count_mismatch_aborts_build() {
        let err = VectorIndex::build(corpus_chunks(), &CountMismatchEmbedder)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("mismatch"));
    }
}
