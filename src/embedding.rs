//! Embedding collaborator abstraction and implementations.
//!
//! Defines the [`Embedder`] trait and two backends:
//! - **[`GoogleEmbedder`]** — calls the Gemini `batchEmbedContents` API with
//!   retry and exponential backoff.
//! - **[`HashEmbedder`]** — deterministic offline bag-of-words hashing, used
//!   for tests and keyless deployments.
//!
//! Also provides [`cosine_similarity`] for the in-memory vector index.
//!
//! # Retry Strategy
//!
//! The Google backend retries transient failures:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::RagError;

/// An embedding engine: text in, similarity vector out.
///
/// Used once per chunk at index build time and once per query at retrieval
/// time. Implementations must be deterministic per input within one index
/// lifetime so query vectors are comparable to chunk vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// The model identifier (e.g. `"models/embedding-001"` or `"hash"`).
    fn model_name(&self) -> &str;

    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embed a single text (e.g. a search query).
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::retrieval("empty embedding response"))
    }
}

/// Construct the embedder named by the configuration.
///
/// The `google` provider requires an API key; its absence is a
/// configuration error, reported before any network traffic.
pub fn create_embedder(
    config: &EmbeddingConfig,
    api_key: Option<&str>,
) -> Result<Box<dyn Embedder>, RagError> {
    match config.provider.as_str() {
        "google" => {
            let key = api_key.ok_or_else(|| {
                RagError::configuration("GOOGLE_API_KEY is not set")
            })?;
            Ok(Box::new(GoogleEmbedder::new(config, key.to_string())?))
        }
        "hash" => Ok(Box::new(HashEmbedder::new(config.dims))),
        other => Err(RagError::configuration(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ Google provider ============

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Embedding backend using the Gemini `batchEmbedContents` endpoint.
pub struct GoogleEmbedder {
    model: String,
    api_key: String,
    batch_size: usize,
    max_retries: u32,
    client: reqwest::Client,
}

impl GoogleEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::configuration(format!("http client: {}", e)))?;

        Ok(Self {
            model: qualified_model(&config.model),
            api_key,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
            client,
        })
    }

    async fn embed_one_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let url = format!("{}/{}:batchEmbedContents", GEMINI_API_BASE, self.model);
        let requests: Vec<serde_json::Value> = texts
            .iter()
            .map(|t| {
                serde_json::json!({
                    "model": self.model,
                    "content": { "parts": [{ "text": t }] },
                })
            })
            .collect();
        let body = serde_json::json!({ "requests": requests });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| RagError::retrieval(e.to_string()))?;
                        return parse_embed_response(&json, texts.len());
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(RagError::retrieval(format!(
                            "Gemini embeddings error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    return Err(RagError::retrieval(format!(
                        "Gemini embeddings error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(RagError::retrieval(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| RagError::retrieval("embedding failed after retries")))
    }
}

#[async_trait]
impl Embedder for GoogleEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_one_batch(batch).await?);
        }
        Ok(vectors)
    }
}

/// Prefix bare model names with `models/` as the REST API path expects.
fn qualified_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

fn parse_embed_response(
    json: &serde_json::Value,
    expected: usize,
) -> Result<Vec<Vec<f32>>, RagError> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| RagError::retrieval("invalid embed response: missing embeddings"))?;

    if embeddings.len() != expected {
        return Err(RagError::retrieval(format!(
            "embed response count mismatch: expected {}, got {}",
            expected,
            embeddings.len()
        )));
    }

    let mut vectors = Vec::with_capacity(embeddings.len());
    for item in embeddings {
        let values = item
            .get("values")
            .and_then(|v| v.as_array())
            .ok_or_else(|| RagError::retrieval("invalid embed response: missing values"))?;
        vectors.push(
            values
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect(),
        );
    }

    Ok(vectors)
}

// ============ Hash provider ============

/// Deterministic offline embedder: hashed bag-of-words, L2-normalized.
///
/// Overlapping vocabulary produces higher cosine similarity, which is enough
/// for retrieval over a small corpus and for exercising the pipeline in
/// tests without network access.
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|t| hash_embed(t, self.dims)).collect())
    }
}

fn hash_embed(text: &str, dims: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dims];
    let lower = text.to_lowercase();

    for token in lower.split(|c: char| !c.is_alphanumeric()) {
        if token.is_empty() {
            continue;
        }
        vector[(fnv1a(token) as usize) % dims] += 1.0;
    }

    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

fn fnv1a(token: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in token.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

// ============ Vector math ============

/// Cosine similarity in `[-1.0, 1.0]`. Returns `0.0` for empty vectors or
/// mismatched lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
