//! adaptiq-providers: Similarity providers and configuration.
//!
//! Implements the `SimilarityProvider` trait with a lexical token-sort ratio
//! and with embeddings from Ollama or OpenAI, and loads `adaptiq.toml`.

pub mod config;
pub mod embedding;
pub mod error;
pub mod lexical;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use config::{
    create_similarity_provider, load_config, load_config_from, AdaptiqConfig, SimilarityConfig,
};
pub use error::{ConfigError, SimilarityError};
pub use lexical::TokenSortRatio;
