use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::ollama::DEFAULT_OLLAMA_URL;
use crate::pipeline::storage::chunker::ChunkingStrategy;

/// Application-level constants
pub const APP_NAME: &str = "PharmaGuard";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_LLM_MODEL: &str = "mixtral";
pub const DEFAULT_EMBED_MODEL: &str = "all-minilm";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
/// Embedding calls cover whole-corpus ingestion.
pub const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CORPUS_PATH: &str = "resources/cpic_guidelines.txt";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,pharmaguard_lib=debug"
}

/// Get the application data directory
/// ~/PharmaGuard/ on all platforms, or ./PharmaGuard without a home directory
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Get the reference index directory
pub fn index_dir() -> PathBuf {
    app_data_dir().join("index")
}

/// Get the models directory (for ONNX embeddings)
pub fn models_dir() -> PathBuf {
    app_data_dir().join("models")
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {var}={value}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which embedding backend indexes and queries the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbedderKind {
    #[default]
    Ollama,
    /// Offline token hashing, no model required.
    Hash,
    /// In-process ONNX model, requires the `onnx-embeddings` feature.
    Onnx,
}

impl fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ollama => "ollama",
            Self::Hash => "hash",
            Self::Onnx => "onnx",
        })
    }
}

impl FromStr for EmbedderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hash" => Ok(Self::Hash),
            "onnx" => Ok(Self::Onnx),
            other => Err(format!("unknown embedder: {other}")),
        }
    }
}

/// Runtime settings, read once at startup from `PHARMAGUARD_*` variables.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: SocketAddr,
    pub ollama_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub embedder: EmbedderKind,
    pub embed_model: String,
    pub embed_timeout_secs: u64,
    pub onnx_model_dir: PathBuf,
    pub corpus_path: PathBuf,
    /// `None` keeps the index in memory only.
    pub index_path: Option<PathBuf>,
    pub chunking: ChunkingStrategy,
    /// Directory holding `phenotypes.json` and `drug_rules.json`.
    pub reference_dir: Option<PathBuf>,
    pub explain_deadline: Option<Duration>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let embedder: EmbedderKind = parse_or(&get, "PHARMAGUARD_EMBEDDER", EmbedderKind::default())?;
        let embed_model = get("PHARMAGUARD_EMBED_MODEL").unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string());
        let onnx_model_dir = get("PHARMAGUARD_ONNX_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| models_dir().join(&embed_model));

        let index_path = match get("PHARMAGUARD_INDEX_PATH") {
            Some(v) if v.eq_ignore_ascii_case("none") => None,
            Some(v) => Some(PathBuf::from(v)),
            None => Some(default_index_path(embedder, &embed_model)),
        };

        let explain_deadline = match get("PHARMAGUARD_EXPLAIN_DEADLINE_SECS") {
            Some(v) => Some(Duration::from_secs(parse_secs("PHARMAGUARD_EXPLAIN_DEADLINE_SECS", &v)?)),
            None => None,
        };

        Ok(Self {
            bind: parse_or(&get, "PHARMAGUARD_BIND", parse_value("PHARMAGUARD_BIND", DEFAULT_BIND)?)?,
            ollama_url: get("PHARMAGUARD_OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            llm_model: get("PHARMAGUARD_LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_timeout_secs: secs_or(&get, "PHARMAGUARD_LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS)?,
            embedder,
            embed_model,
            embed_timeout_secs: secs_or(&get, "PHARMAGUARD_EMBED_TIMEOUT_SECS", DEFAULT_EMBED_TIMEOUT_SECS)?,
            onnx_model_dir,
            corpus_path: get("PHARMAGUARD_CORPUS")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CORPUS_PATH)),
            index_path,
            chunking: parse_or(&get, "PHARMAGUARD_CHUNKING", ChunkingStrategy::default())?,
            reference_dir: get("PHARMAGUARD_REFERENCE_DIR").map(PathBuf::from),
            explain_deadline,
        })
    }
}

/// One index file per embedding backend and model.
fn default_index_path(embedder: EmbedderKind, embed_model: &str) -> PathBuf {
    let model: String = embed_model
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    index_dir().join(format!("cpic_guidelines-{embedder}-{model}.json"))
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(value) => parse_value(var, &value),
        None => Ok(default),
    }
}

fn secs_or<G>(get: &G, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(value) => parse_secs(var, &value),
        None => Ok(default),
    }
}

/// Whole seconds; zero would fail every call immediately.
fn parse_secs(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    match parse_value(var, value)? {
        0 => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must be at least 1 second".to_string(),
        }),
        secs => Ok(secs),
    }
}

fn parse_value<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
