//! Retrieval/generation lifecycle orchestration.
//!
//! [`RetrievalOrchestrator`] owns the corpus index and generation binding as
//! one atomic unit. Its state machine has two states: `Uninitialized`
//! (no binding published) and `Ready` (a binding published).
//!
//! The binding lives behind `RwLock<Option<Arc<Binding>>>`. Queries clone
//! the `Arc` under a read lock and run collaborator calls against that
//! snapshot, so a concurrent `reset()` can never produce a torn pairing of
//! a new index with a stale prompt or generator. Lifecycle operations do
//! the slow construction work (corpus I/O, embedding the full chunk set)
//! off-lock and take the write lock only for the pointer swap, so in-flight
//! queries are never blocked by a rebuild.
//!
//! Query-scoped collaborator failures are absorbed here: they are logged,
//! captured in the returned [`RetrievalResult`], and leave the orchestrator
//! `Ready`. Only lifecycle failures (missing credentials or corpus, build
//! errors) keep or return it to `Uninitialized`.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::chunk::split_corpus;
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::error::RagError;
use crate::generation::{create_generator, Generator};
use crate::index::VectorIndex;
use crate::prompt::PromptTemplate;

/// Leading-excerpt length for source previews, in characters.
pub const SOURCE_PREVIEW_CHARS: usize = 100;

/// Outcome of one `query()` call. A `success: false` result means a
/// collaborator failed; the orchestrator itself is still `Ready`.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub response: String,
    pub sources: Vec<String>,
    pub success: bool,
    pub error: Option<String>,
}

/// Snapshot of the four readiness flags.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub index_loaded: bool,
    pub chain_initialized: bool,
    pub embeddings_ready: bool,
    pub credentials_configured: bool,
}

impl SystemStatus {
    /// Logical AND of all four flags.
    pub fn overall_healthy(&self) -> bool {
        self.index_loaded
            && self.chain_initialized
            && self.embeddings_ready
            && self.credentials_configured
    }

    /// Boundary classification: `"healthy"` when every flag is set,
    /// `"degraded"` otherwise. (`"unhealthy"` is reserved for the HTTP
    /// layer when status computation itself fails.)
    pub fn health_label(&self) -> &'static str {
        if self.overall_healthy() {
            "healthy"
        } else {
            "degraded"
        }
    }
}

/// The index, retriever parameters, prompt template, and collaborators
/// used to answer one query. Immutable once published.
struct Binding {
    embedder: Box<dyn Embedder>,
    generator: Box<dyn Generator>,
    index: VectorIndex,
    prompt: PromptTemplate,
    top_k: usize,
    generation_timeout: Duration,
}

pub struct RetrievalOrchestrator {
    config: Arc<Config>,
    binding: RwLock<Option<Arc<Binding>>>,
    /// Serializes initialize/reset against each other. Never held across
    /// query handling.
    lifecycle: Mutex<()>,
}

impl RetrievalOrchestrator {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            binding: RwLock::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    /// Build the full binding and publish it atomically.
    ///
    /// Any step's failure aborts the whole sequence; nothing from a failed
    /// attempt is retained and an existing binding (if any) stays in place.
    pub async fn initialize(&self) -> Result<(), RagError> {
        let _guard = self.lifecycle.lock().await;
        self.build_and_publish().await
    }

    /// Tear down the current binding, then re-run initialization.
    ///
    /// Callers observe either the fully-replaced `Ready` state or
    /// `Uninitialized`; in-flight queries keep their pre-reset snapshot.
    pub async fn reset(&self) -> Result<(), RagError> {
        let _guard = self.lifecycle.lock().await;
        {
            *self.binding.write().await = None;
        }
        info!("tore down index and generation binding");
        self.build_and_publish().await
    }

    /// Answer a question against the current binding snapshot.
    ///
    /// Fails with [`RagError::NotReady`] while `Uninitialized`. Collaborator
    /// failures (including the per-query generation timeout) come back as
    /// `success: false` with the error captured; state is unchanged.
    pub async fn query(&self, message: &str) -> Result<RetrievalResult, RagError> {
        let binding = self
            .binding
            .read()
            .await
            .clone()
            .ok_or(RagError::NotReady)?;

        match answer(&binding, message).await {
            Ok((response, sources)) => Ok(RetrievalResult {
                response,
                sources,
                success: true,
                error: None,
            }),
            Err(e) => {
                warn!(error = %e, "query failed, falling back; orchestrator stays ready");
                Ok(RetrievalResult {
                    response: String::new(),
                    sources: Vec::new(),
                    success: false,
                    error: Some(e.to_string()),
                })
            }
        }
    }

    /// True iff a generation binding is published.
    pub async fn is_ready(&self) -> bool {
        self.binding.read().await.is_some()
    }

    /// Snapshot the readiness flags without mutating any state.
    pub async fn status(&self) -> SystemStatus {
        let ready = self.is_ready().await;
        SystemStatus {
            index_loaded: ready,
            chain_initialized: ready,
            embeddings_ready: ready,
            credentials_configured: self.config.credentials_configured(),
        }
    }

    async fn build_and_publish(&self) -> Result<(), RagError> {
        match self.build_binding().await {
            Ok(binding) => {
                let chunks = binding.index.len();
                *self.binding.write().await = Some(Arc::new(binding));
                info!(chunks, "RAG system initialized");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "RAG initialization failed");
                Err(e)
            }
        }
    }

    /// Steps: validate configuration, load and chunk the corpus, construct
    /// the embedder, build the index atomically, construct the generator,
    /// bind the retriever and prompt template.
    async fn build_binding(&self) -> Result<Binding, RagError> {
        let config = &self.config;

        if config.needs_api_key() && config.api_key().is_none() {
            return Err(RagError::configuration("GOOGLE_API_KEY is not set"));
        }
        let corpus_path = &config.corpus.path;
        if !corpus_path.exists() {
            return Err(RagError::configuration(format!(
                "corpus file not found: {}",
                corpus_path.display()
            )));
        }

        let text = tokio::fs::read_to_string(corpus_path).await.map_err(|e| {
            RagError::configuration(format!(
                "failed to read corpus {}: {}",
                corpus_path.display(),
                e
            ))
        })?;

        let chunks = split_corpus(&text, config.chunking.chunk_size, config.chunking.overlap);
        if chunks.is_empty() {
            return Err(RagError::configuration("corpus produced zero chunks"));
        }
        info!(chunks = chunks.len(), "corpus loaded and chunked");

        let api_key = config.api_key();
        let embedder = create_embedder(&config.embedding, api_key.as_deref())?;
        let index = VectorIndex::build(chunks, embedder.as_ref()).await?;
        let generator = create_generator(&config.generation, api_key.as_deref())?;

        Ok(Binding {
            embedder,
            generator,
            index,
            prompt: PromptTemplate::gympro(),
            top_k: config.retrieval.top_k,
            generation_timeout: Duration::from_secs(config.generation.timeout_secs),
        })
    }
}

/// Run the retrieval and generation steps against one binding snapshot.
async fn answer(binding: &Binding, message: &str) -> Result<(String, Vec<String>), RagError> {
    let query_vec = binding.embedder.embed(message).await?;
    let hits = binding.index.top_k(&query_vec, binding.top_k);

    let blocks: Vec<String> = hits.iter().map(|h| h.chunk.text.clone()).collect();
    let sources: Vec<String> = hits.iter().map(|h| preview(&h.chunk.text)).collect();

    let prompt = binding.prompt.render(&blocks, message);
    let response = tokio::time::timeout(
        binding.generation_timeout,
        binding.generator.generate(&prompt),
    )
    .await
    .map_err(|_| {
        RagError::retrieval(format!(
            "generation timed out after {}s",
            binding.generation_timeout.as_secs()
        ))
    })??;

    Ok((response, sources))
}

/// Leading excerpt of a chunk, truncated with an ellipsis.
fn preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= SOURCE_PREVIEW_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(SOURCE_PREVIEW_CHARS).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CORPUS: &str = "Squat with a neutral spine and drive through the heels. \
Keep the bar over the midfoot and brace the core before descending.\n\n\
Protein intake of 1.6 to 2.2 grams per kilogram supports muscle recovery after resistance training.\n\n\
Warm up for five to ten minutes on the treadmill before lifting to raise the heart rate.\n\n\
Allow 48 to 72 hours of rest for each muscle group between training sessions.";

    fn offline_config(corpus_path: &std::path::Path) -> Arc<Config> {
        let toml_str = format!(
            r#"
[server]
bind = "127.0.0.1:0"

[corpus]
path = "{}"

[chunking]
chunk_size = 200
overlap = 40

[embedding]
provider = "hash"

[generation]
provider = "extractive"
"#,
            corpus_path.display()
        );
        Arc::new(toml::from_str(&toml_str).unwrap())
    }

    fn write_corpus(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_query_before_initialize_is_not_ready() {
        let corpus = write_corpus(CORPUS);
        let orch = RetrievalOrchestrator::new(offline_config(corpus.path()));
        assert!(!orch.is_ready().await);
        let err = orch.query("How deep should I squat?").await.unwrap_err();
        assert!(matches!(err, RagError::NotReady));
    }

    #[tokio::test]
    async fn test_initialize_then_query() {
        let corpus = write_corpus(CORPUS);
        let orch = RetrievalOrchestrator::new(offline_config(corpus.path()));
        orch.initialize().await.unwrap();
        assert!(orch.is_ready().await);

        let result = orch.query("What's the proper form for squats?").await.unwrap();
        assert!(result.success);
        assert!(!result.response.is_empty());
        assert!(result.sources.len() <= 3);
        assert!(!result.sources.is_empty());
        for source in &result.sources {
            assert!(source.chars().count() <= SOURCE_PREVIEW_CHARS + 3);
        }
    }

    #[tokio::test]
    async fn test_status_flags_track_lifecycle() {
        let corpus = write_corpus(CORPUS);
        let orch = RetrievalOrchestrator::new(offline_config(corpus.path()));

        let before = orch.status().await;
        assert!(!before.index_loaded);
        assert!(!before.chain_initialized);
        assert!(!before.embeddings_ready);
        assert!(before.credentials_configured); // offline providers
        assert_eq!(before.health_label(), "degraded");

        orch.initialize().await.unwrap();
        let after = orch.status().await;
        assert!(after.overall_healthy());
        assert_eq!(after.health_label(), "healthy");
    }

    #[tokio::test]
    async fn test_missing_corpus_is_configuration_error() {
        let config = offline_config(std::path::Path::new("/nonexistent/gym_data.txt"));
        let orch = RetrievalOrchestrator::new(config);
        let err = orch.initialize().await.unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
        assert!(!orch.is_ready().await);
    }

    #[tokio::test]
    async fn test_empty_corpus_fails_with_zero_chunks() {
        let corpus = write_corpus("   \n\n  ");
        let orch = RetrievalOrchestrator::new(offline_config(corpus.path()));
        let err = orch.initialize().await.unwrap_err();
        assert!(err.to_string().contains("zero chunks"));
        assert!(!orch.is_ready().await);
    }

    #[tokio::test]
    async fn test_reset_with_missing_corpus_leaves_uninitialized() {
        let corpus = write_corpus(CORPUS);
        let orch = RetrievalOrchestrator::new(offline_config(corpus.path()));
        orch.initialize().await.unwrap();
        assert!(orch.is_ready().await);

        drop(corpus); // deletes the temp file
        assert!(orch.reset().await.is_err());
        assert!(!orch.is_ready().await);
        let status = orch.status().await;
        assert!(!status.index_loaded);
    }

    #[tokio::test]
    async fn test_reset_rebuilds_successfully() {
        let corpus = write_corpus(CORPUS);
        let orch = RetrievalOrchestrator::new(offline_config(corpus.path()));
        orch.initialize().await.unwrap();
        orch.reset().await.unwrap();
        assert!(orch.is_ready().await);
        assert!(orch.query("protein for recovery").await.unwrap().success);
    }

    struct FailingGenerator;

    #[async_trait]
    impl Generator for FailingGenerator {
        fn model_name(&self) -> &str {
            "failing"
        }
        async fn generate(&self, _prompt: &str) -> Result<String, RagError> {
            Err(RagError::retrieval("generation backend unreachable"))
        }
    }

    struct TaggedSlowGenerator {
        tag: &'static str,
        delay: Duration,
    }

    #[async_trait]
    impl Generator for TaggedSlowGenerator {
        fn model_name(&self) -> &str {
            self.tag
        }
        async fn generate(&self, _prompt: &str) -> Result<String, RagError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.tag.to_string())
        }
    }

    async fn binding_with_generator(
        config: &Config,
        generator: Box<dyn Generator>,
        timeout: Duration,
    ) -> Binding {
        let embedder = create_embedder(&config.embedding, None).unwrap();
        let chunks = split_corpus(CORPUS, 200, 40);
        let index = VectorIndex::build(chunks, embedder.as_ref()).await.unwrap();
        Binding {
            embedder,
            generator,
            index,
            prompt: PromptTemplate::gympro(),
            top_k: 3,
            generation_timeout: timeout,
        }
    }

    #[tokio::test]
    async fn test_generator_failure_is_query_scoped() {
        let corpus = write_corpus(CORPUS);
        let config = offline_config(corpus.path());
        let orch = RetrievalOrchestrator::new(config.clone());
        let binding =
            binding_with_generator(&config, Box::new(FailingGenerator), Duration::from_secs(5))
                .await;
        *orch.binding.write().await = Some(Arc::new(binding));

        let result = orch.query("squat form").await.unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("unreachable"));
        assert!(result.sources.is_empty());
        assert!(orch.is_ready().await, "failure must not drop the binding");
    }

    #[tokio::test]
    async fn test_generation_timeout_is_query_scoped() {
        let corpus = write_corpus(CORPUS);
        let config = offline_config(corpus.path());
        let orch = RetrievalOrchestrator::new(config.clone());
        let slow = Box::new(TaggedSlowGenerator {
            tag: "slow",
            delay: Duration::from_secs(60),
        });
        let binding = binding_with_generator(&config, slow, Duration::from_millis(50)).await;
        *orch.binding.write().await = Some(Arc::new(binding));

        let result = orch.query("squat form").await.unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("timed out"));
        assert!(orch.is_ready().await);
    }

    #[tokio::test]
    async fn test_in_flight_query_keeps_pre_reset_snapshot() {
        let corpus = write_corpus(CORPUS);
        let config = offline_config(corpus.path());
        let orch = Arc::new(RetrievalOrchestrator::new(config.clone()));

        let first = Box::new(TaggedSlowGenerator {
            tag: "pre-reset",
            delay: Duration::from_millis(200),
        });
        let binding = binding_with_generator(&config, first, Duration::from_secs(5)).await;
        *orch.binding.write().await = Some(Arc::new(binding));

        let querier = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.query("squat form").await.unwrap() })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Swap the binding while the query's generation call is in flight.
        let second = Box::new(TaggedSlowGenerator {
            tag: "post-reset",
            delay: Duration::from_millis(1),
        });
        let replacement = binding_with_generator(&config, second, Duration::from_secs(5)).await;
        *orch.binding.write().await = Some(Arc::new(replacement));

        let result = querier.await.unwrap();
        assert!(result.success);
        assert_eq!(result.response, "pre-reset");

        // New queries see the replacement.
        let result = orch.query("squat form").await.unwrap();
        assert_eq!(result.response, "post-reset");
    }

    #[test]
    fn test_preview_truncates_with_ellipsis() {
        let long = "x".repeat(250);
        let p = preview(&long);
        assert_eq!(p.chars().count(), SOURCE_PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));
        assert_eq!(preview("short chunk"), "short chunk");
    }
}
