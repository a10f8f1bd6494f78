use async_trait::async_trait;
use tracing::debug;

use crate::client::OpenAIClient;
use crate::error::Result;
use crate::index::normalize_l2;

/// Maps texts to unit-length vectors, one per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

pub struct OpenAIEmbedder {
    client: OpenAIClient,
    model: String,
}

impl OpenAIEmbedder {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self { client, model: model.into() }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Embedding {} texts with {}", texts.len(), self.model);
        let mut vectors = self.client.create_embeddings(&self.model, texts).await?;
        vectors.iter_mut().for_each(|v| normalize_l2(v));
        Ok(vectors)
    }
}
