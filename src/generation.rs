//! Generation collaborator abstraction and implementations.
//!
//! Defines the [`Generator`] trait and two backends:
//! - **[`GoogleGenerator`]** — calls the Gemini `generateContent` API with
//!   the configured model and temperature.
//! - **[`ExtractiveGenerator`]** — offline deterministic backend that
//!   answers with the most relevant retrieved excerpt; used for tests and
//!   keyless deployments.
//!
//! Per-call timeouts are applied by the orchestrator, not here, so every
//! backend gets the same treatment.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::RagError;
use crate::prompt::{CONTEXT_HEADER, QUESTION_HEADER};

/// A generative language engine: composed prompt in, answer text out.
#[async_trait]
pub trait Generator: Send + Sync {
    /// The model identifier (e.g. `"gemini-2.5-flash"` or `"extractive"`).
    fn model_name(&self) -> &str;

    /// Produce an answer for the composed context+question prompt.
    async fn generate(&self, prompt: &str) -> Result<String, RagError>;
}

/// Construct the generator named by the configuration.
pub fn create_generator(
    config: &GenerationConfig,
    api_key: Option<&str>,
) -> Result<Box<dyn Generator>, RagError> {
    match config.provider.as_str() {
        "google" => {
            let key = api_key.ok_or_else(|| {
                RagError::configuration("GOOGLE_API_KEY is not set")
            })?;
            Ok(Box::new(GoogleGenerator::new(config, key.to_string())?))
        }
        "extractive" => Ok(Box::new(ExtractiveGenerator)),
        other => Err(RagError::configuration(format!(
            "unknown generation provider: {}",
            other
        ))),
    }
}

// ============ Google provider ============

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Generation backend using the Gemini `generateContent` endpoint.
pub struct GoogleGenerator {
    model: String,
    api_key: String,
    temperature: f64,
    client: reqwest::Client,
}

impl GoogleGenerator {
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::configuration(format!("http client: {}", e)))?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            client,
        })
    }
}

#[async_trait]
impl Generator for GoogleGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let url = format!(
            "{}/models/{}:generateContent",
            GEMINI_API_BASE, self.model
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature },
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::retrieval(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RagError::retrieval(format!(
                "Gemini generation error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RagError::retrieval(e.to_string()))?;
        parse_generate_response(&json)
    }
}

fn parse_generate_response(json: &serde_json::Value) -> Result<String, RagError> {
    let text = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| RagError::retrieval("invalid generate response: no candidate text"))?;

    if text.trim().is_empty() {
        return Err(RagError::retrieval("empty candidate text"));
    }
    Ok(text.to_string())
}

// ============ Extractive provider ============

/// Offline generator that answers with the first retrieved context block.
///
/// Retrieval orders blocks by similarity, so the first block is the most
/// relevant excerpt. Deterministic, no collaborators.
pub struct ExtractiveGenerator;

#[async_trait]
impl Generator for ExtractiveGenerator {
    fn model_name(&self) -> &str {
        "extractive"
    }

    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let context = prompt
            .split_once(CONTEXT_HEADER)
            .map(|(_, rest)| rest)
            .and_then(|rest| rest.split_once(QUESTION_HEADER).map(|(ctx, _)| ctx))
            .unwrap_or(prompt);

        let excerpt = context
            .split("\n\n")
            .map(str::trim)
            .find(|block| !block.is_empty())
            .unwrap_or("");

        if excerpt.is_empty() {
            return Err(RagError::retrieval("no context available to extract from"));
        }

        Ok(format!("Based on the gym guide: {}", excerpt))
    }
}
