use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Placeholder value shipped in example configs; treated as "no key".
pub const API_KEY_PLACEHOLDER: &str = "your_google_api_key_here";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Directory with the browser chat UI, served under `/static` when present.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct GateConfig {
    /// When true, off-topic messages bypass retrieval entirely and get the
    /// fixed redirect. When false, they still reach the RAG pipeline if it
    /// is ready (the relevance flag is reported either way).
    #[serde(default = "default_true")]
    pub strict: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { strict: true }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Vector dimensionality for the offline `hash` provider.
    #[serde(default = "default_hash_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: default_hash_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "google".to_string()
}
fn default_embedding_model() -> String {
    "models/embedding-001".to_string()
}
fn default_hash_dims() -> usize {
    64
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_generation_provider() -> String {
    "google".to_string()
}
fn default_generation_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_temperature() -> f64 {
    0.3
}

impl Config {
    /// Whether any configured provider needs the Google API key.
    pub fn needs_api_key(&self) -> bool {
        self.embedding.provider == "google" || self.generation.provider == "google"
    }

    /// Read the Google API key from the environment, rejecting the
    /// example-config placeholder.
    pub fn api_key(&self) -> Option<String> {
        match std::env::var("GOOGLE_API_KEY") {
            Ok(key) if !key.trim().is_empty() && key != API_KEY_PLACEHOLDER => Some(key),
            _ => None,
        }
    }

    /// True when credentials are present, or no configured provider requires them.
    pub fn credentials_configured(&self) -> bool {
        !self.needs_api_key() || self.api_key().is_some()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.overlap must be < chunking.chunk_size");
    }
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if !(0.0..=2.0).contains(&config.generation.temperature) {
        anyhow::bail!("generation.temperature must be in [0.0, 2.0]");
    }

    match config.embedding.provider.as_str() {
        "google" | "hash" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be google or hash.",
            other
        ),
    }
    if config.embedding.provider == "hash" && config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0 for the hash provider");
    }

    match config.generation.provider.as_str() {
        "google" | "extractive" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be google or extractive.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(toml_str: &str) -> Result<Config> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml_str.as_bytes()).unwrap();
        load_config(file.path())
    }

    const MINIMAL: &str = r#"
[server]
bind = "127.0.0.1:8000"

[corpus]
path = "data/gym_data.txt"
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse(MINIMAL).unwrap();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.retrieval.top_k, 3);
        assert!(config.gate.strict);
        assert_eq!(config.generation.temperature, 0.3);
        assert_eq!(config.embedding.provider, "google");
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let err = parse(
            r#"
[server]
bind = "127.0.0.1:8000"

[corpus]
path = "data/gym_data.txt"

[chunking]
chunk_size = 100
overlap = 100
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = parse(
            r#"
[server]
bind = "127.0.0.1:8000"

[corpus]
path = "data/gym_data.txt"

[embedding]
provider = "faiss"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_offline_providers_need_no_credentials() {
        let config = parse(
            r#"
[server]
bind = "127.0.0.1:8000"

[corpus]
path = "data/gym_data.txt"

[embedding]
provider = "hash"

[generation]
provider = "extractive"
"#,
        )
        .unwrap();
        assert!(!config.needs_api_key());
        assert!(config.credentials_configured());
    }
}
