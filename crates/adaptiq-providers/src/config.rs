//! adaptiq configuration and similarity provider factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use adaptiq_core::engine::{EngineConfig, ExhaustionPolicy};
use adaptiq_core::scoring::ScoringWeights;
use adaptiq_core::traits::SimilarityProvider;

use crate::lexical::TokenSortRatio;
use crate::ollama::{self, OllamaEmbeddings};
use crate::openai::OpenAiEmbeddings;

/// Which similarity provider to use.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SimilarityConfig {
    #[default]
    Lexical,
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default = "default_ollama_model")]
        model: String,
    },
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
}

impl std::fmt::Debug for SimilarityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimilarityConfig::Lexical => f.write_str("Lexical"),
            SimilarityConfig::Ollama { base_url, model } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            SimilarityConfig::OpenAI {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
        }
    }
}

fn default_ollama_url() -> String {
    ollama::DEFAULT_BASE_URL.to_string()
}
fn default_ollama_model() -> String {
    ollama::DEFAULT_MODEL.to_string()
}

/// The `[engine]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_timeout_ms")]
    pub similarity_timeout_ms: u64,
    #[serde(default = "default_concurrency")]
    pub similarity_concurrency: usize,
    #[serde(default)]
    pub exhaustion: ExhaustionPolicy,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_timeout_ms() -> u64 {
    2000
}
fn default_concurrency() -> usize {
    8
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            similarity_timeout_ms: default_timeout_ms(),
            similarity_concurrency: default_concurrency(),
            exhaustion: ExhaustionPolicy::default(),
            seed: None,
        }
    }
}

/// Top-level adaptiq configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiqConfig {
    /// Directory for user records and the difficulty journal.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Default corpus file or directory.
    #[serde(default)]
    pub corpus: Option<PathBuf>,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub engine: EngineSettings,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./adaptiq-data")
}

impl Default for AdaptiqConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            corpus: None,
            similarity: SimilarityConfig::default(),
            scoring: ScoringWeights::default(),
            engine: EngineSettings::default(),
        }
    }
}

impl AdaptiqConfig {
    /// Engine configuration derived from `[scoring]` and `[engine]`.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            weights: self.scoring,
            similarity_timeout: Duration::from_millis(self.engine.similarity_timeout_ms),
            similarity_concurrency: self.engine.similarity_concurrency.max(1),
            exhaustion: self.engine.exhaustion,
            seed: self.engine.seed,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Substituted values are not scanned again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_similarity_config(config: &SimilarityConfig) -> SimilarityConfig {
    match config {
        SimilarityConfig::Lexical => SimilarityConfig::Lexical,
        SimilarityConfig::Ollama { base_url, model } => SimilarityConfig::Ollama {
            base_url: resolve_env_vars(base_url),
            model: resolve_env_vars(model),
        },
        SimilarityConfig::OpenAI {
            api_key,
            base_url,
            model,
        } => SimilarityConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            model: model.as_ref().map(|m| resolve_env_vars(m)),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `adaptiq.toml` in the current directory
/// 2. `~/.config/adaptiq/config.toml`
///
/// Environment variable overrides: `ADAPTIQ_OPENAI_KEY`, `ADAPTIQ_OLLAMA_URL`.
pub fn load_config() -> Result<AdaptiqConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AdaptiqConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("adaptiq.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            parse_config(&path)?
        }
        None => AdaptiqConfig::default(),
    };

    apply_env_overrides(&mut config);
    config.similarity = resolve_similarity_config(&config.similarity);

    Ok(config)
}

fn parse_config(path: &Path) -> Result<AdaptiqConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<AdaptiqConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn apply_env_overrides(config: &mut AdaptiqConfig) {
    match &mut config.similarity {
        SimilarityConfig::OpenAI { api_key, .. } => {
            if let Ok(key) = std::env::var("ADAPTIQ_OPENAI_KEY") {
                *api_key = key;
            }
        }
        SimilarityConfig::Ollama { base_url, .. } => {
            if let Ok(url) = std::env::var("ADAPTIQ_OLLAMA_URL") {
                *base_url = url;
            }
        }
        SimilarityConfig::Lexical => {}
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("adaptiq"))
}

/// Create a similarity provider from its configuration.
pub fn create_similarity_provider(config: &SimilarityConfig) -> Result<Arc<dyn SimilarityProvider>> {
    let provider: Arc<dyn SimilarityProvider> = match config {
        SimilarityConfig::Lexical => Arc::new(TokenSortRatio::new()),
        SimilarityConfig::Ollama { base_url, model } => {
            Arc::new(OllamaEmbeddings::new(base_url, model)?)
        }
        SimilarityConfig::OpenAI {
            api_key,
            base_url,
            model,
        } => Arc::new(OpenAiEmbeddings::new(
            api_key,
            base_url.clone(),
            model.clone(),
        )?),
    };
    tracing::debug!(provider = provider.name(), "similarity provider ready");
    Ok(provider)
}
