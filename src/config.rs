//! TOML configuration.
//!
//! Every field has a default equal to the built-in pipeline constants, so an
//! empty file (or no file at all, via [`Config::default`]) is a valid
//! configuration.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_pdf_dir")]
    pub pdf_dir: PathBuf,
    /// Combined text artifact written by `extract` and read by `index`.
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pdf_dir: default_pdf_dir(),
            output_file: default_output_file(),
        }
    }
}

fn default_pdf_dir() -> PathBuf {
    PathBuf::from("pdf_files")
}
fn default_output_file() -> PathBuf {
    PathBuf::from("extracted_text/combined_text.txt")
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExtractConfig {
    /// Skip PDFs larger than this many bytes. Unlimited when unset.
    #[serde(default)]
    pub max_file_bytes: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Split points, tried in order. `""` means "between any two characters".
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            separators: default_separators(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    100
}
fn default_separators() -> Vec<String> {
    vec![
        "\n\n".to_string(),
        "\n".to_string(),
        " ".to_string(),
        String::new(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Base URL of the embedding service (Ollama only).
    #[serde(default = "default_ollama_url")]
    pub url: String,
    /// Expected vector size. Indexing rejects vectors of any other length.
    /// `0` takes the length of the first vector returned.
    #[serde(default)]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub max_retries: u32,
    /// Per-request timeout. No timeout when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            url: default_ollama_url(),
            dims: 0,
            batch_size: default_batch_size(),
            max_retries: 0,
            timeout_secs: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_batch_size() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            url: default_ollama_url(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_retries: 0,
            timeout_secs: None,
        }
    }
}

fn default_llm_model() -> String {
    "gemma:2b-instruct-q5_0".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_top_k() -> u32 {
    5
}
fn default_top_p() -> f32 {
    0.1
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// SQLite database holding all collections.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// What `index` does with chunks already in the collection: `append` or `skip`.
    #[serde(default = "default_on_duplicate")]
    pub on_duplicate: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            collection: default_collection(),
            on_duplicate: default_on_duplicate(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/rag.sqlite")
}
fn default_collection() -> String {
    "myRag".to_string()
}
fn default_on_duplicate() -> String {
    "append".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
    /// `cosine`, `euclidean`, or `inner_product`.
    #[serde(default = "default_metric")]
    pub metric: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            metric: default_metric(),
        }
    }
}

fn default_k() -> usize {
    5
}
fn default_metric() -> String {
    "cosine".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

/// Load `path` if given, otherwise use the built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config(p),
        None => Ok(Config::default()),
    }
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate chunking
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        bail!(
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.chunk_overlap,
            config.chunking.chunk_size
        );
    }
    if config.chunking.separators.is_empty() {
        bail!("chunking.separators must not be empty");
    }

    // Validate embedding
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }
    match config.embedding.provider.as_str() {
        "disabled" | "ollama" | "openai" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be ollama, openai, local, or disabled.",
            other
        ),
    }

    // Validate llm
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        bail!("llm.temperature must be in [0.0, 2.0]");
    }
    if !(0.0..=1.0).contains(&config.llm.top_p) {
        bail!("llm.top_p must be in [0.0, 1.0]");
    }

    // Validate store and retrieval
    if config.store.collection.trim().is_empty() {
        bail!("store.collection must not be empty");
    }
    match config.store.on_duplicate.as_str() {
        "append" | "skip" => {}
        other => bail!(
            "Unknown store.on_duplicate: '{}'. Must be append or skip.",
            other
        ),
    }
    if config.retrieval.k == 0 {
        bail!("retrieval.k must be >= 1");
    }
    match config.retrieval.metric.as_str() {
        "cosine" | "euclidean" | "inner_product" => {}
        other => bail!(
            "Unknown retrieval.metric: '{}'. Must be cosine, euclidean, or inner_product.",
            other
        ),
    }

    Ok(())
}
