use crate::config::AppConfig;
use crate::llm::openai::{ensure_success, OpenAiConfig};
use crate::llm::{LlmError, Provider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Turns text into vectors, one per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Embeddings client for any OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    config: OpenAiConfig,
    model: String,
    client: Client,
}

impl OpenAiEmbedder {
    pub fn new(config: OpenAiConfig, model: impl Into<String>) -> Self {
        Self {
            config,
            model: model.into(),
            client: Client::new(),
        }
    }

    /// Build the embedder that pairs with the configured chat provider.
    pub fn from_config(config: &AppConfig, api_key: Option<&str>) -> Result<Self, LlmError> {
        let provider = Provider::from_config(config, api_key)?;
        Ok(Self::new(provider.config().clone(), &config.embedding_model))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let resp = self
            .config
            .post_json(&self.client, "embeddings", &body)
            .send()
            .await?;
        let resp = ensure_success(resp).await?;

        let data: EmbeddingResponse = resp.json().await?;
        into_ordered_vectors(data, texts.len())
    }
}

fn into_ordered_vectors(mut data: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>, LlmError> {
    if data.data.len() != expected {
        return Err(LlmError::Parse(format!(
            "expected {} embeddings, got {}",
            expected,
            data.data.len()
        )));
    }
    data.data.sort_by_key(|d| d.index);
    Ok(data.data.into_iter().map(|d| d.embedding).collect())
}

/// Embed `texts` in sequential batches of at most `batch_size`.
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, LlmError> {
    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let embedded = embedder.embed(batch).await?;
        if embedded.len() != batch.len() {
            return Err(LlmError::Parse(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                embedded.len()
            )));
        }
        vectors.extend(embedded);
    }
    Ok(vectors)
}

/// Cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
