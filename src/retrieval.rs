use tracing::{debug, info};

use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::index::FlatIndex;

#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    pub text: String,
    pub score: f32,
}

/// Chunks paired with a flat index over their embeddings.
pub struct SemanticIndex<E> {
    embedder: E,
    index: FlatIndex,
    chunks: Vec<String>,
}

impl<E: Embedder> SemanticIndex<E> {
    pub async fn build(embedder: E, chunks: Vec<String>) -> Result<Self> {
        let vectors = embedder.embed(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let dim = vectors.first().map_or(0, Vec::len);
        let mut index = FlatIndex::new(dim);
        index.add(&vectors)?;
        info!("Built index of {} vectors (dim {})", index.len(), index.dim());

        Ok(Self { embedder, index, chunks })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Top `k` chunks for `question`, most similar first.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<Retrieved>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }
        let query = self
            .embedder
            .embed(&[question.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::MalformedResponse("no embedding for question".to_string()))?;

        let hits = self.index.search(&query, k)?;
        debug!("Retrieved {} of {} chunks", hits.len(), self.chunks.len());
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                self.chunks.get(hit.id).map(|text| Retrieved { text: text.clone(), score: hit.score })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Scores texts by which of a few fixed keywords they mention.
    struct KeywordEmbedder;

    const KEYWORDS: [&str; 3] = ["paris", "rome", "berlin"];

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    let mut v: Vec<f32> =
                        KEYWORDS.iter().map(|k| if lower.contains(k) { 1.0 } else { 0.0 }).collect();
                    crate::index::normalize_l2(&mut v);
                    v
                })
                .collect())
        }
    }

    fn chunks() -> Vec<String> {
        vec![
            "Rome is in Italy".to_string(),
            "Paris and Rome".to_string(),
            "Paris is in France".to_string(),
            "Berlin is in Germany".to_string(),
        ]
    }

    #[tokio::test]
    async fn retrieves_best_matches_first() {
        let index = SemanticIndex::build(KeywordEmbedder, chunks()).await.unwrap();
        let hits = index.retrieve("Tell me about Paris", 2).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "Paris is in France");
        assert_eq!(hits[1].text, "Paris and Rome");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn never_returns_more_than_available() {
        let index = SemanticIndex::build(KeywordEmbedder, chunks()).await.unwrap();
        let hits = index.retrieve("rome", 10).await.unwrap();

        assert_eq!(hits.len(), 4);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn empty_corpus_retrieves_nothing() {
        let index = SemanticIndex::build(KeywordEmbedder, Vec::new()).await.unwrap();
        assert!(index.is_empty());
        assert!(index.retrieve("anything", 3).await.unwrap().is_empty());
    }
}
