//! Ollama (local embeddings) similarity provider.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use adaptiq_core::traits::SimilarityProvider;

use crate::embedding::{cosine_similarity, EmbeddingCache};
use crate::error::{check_status, send_error, ConfigError, SimilarityError};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "nomic-embed-text";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Cosine similarity over embeddings from a local Ollama instance.
pub struct OllamaEmbeddings {
    base_url: String,
    model: String,
    client: reqwest::Client,
    cache: EmbeddingCache,
}

impl OllamaEmbeddings {
    pub fn new(base_url: &str, model: &str) -> Result<Self, ConfigError> {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };
        let model = if model.is_empty() { DEFAULT_MODEL } else { model };

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            base_url: base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            cache: EmbeddingCache::default(),
        })
    }

    async fn embedding(&self, text: &str) -> Result<Arc<Vec<f32>>, SimilarityError> {
        self.cache.get_or_fetch(text, || self.fetch(text)).await
    }

    #[instrument(skip(self, text), fields(model = %self.model))]
    async fn fetch(&self, text: &str) -> Result<Vec<f32>, SimilarityError> {
        let body = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, &self.base_url, DEFAULT_TIMEOUT_SECS))?;

        if response.status().as_u16() == 404 {
            return Err(SimilarityError::Api {
                status: 404,
                message: format!(
                    "model '{}' not found locally, pull it with: ollama pull {}",
                    self.model, self.model
                ),
            });
        }
        let response = check_status(response).await?;

        let parsed: OllamaEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| SimilarityError::InvalidResponse(e.to_string()))?;
        if parsed.embedding.is_empty() {
            return Err(SimilarityError::InvalidResponse("empty embedding".into()));
        }
        Ok(parsed.embedding)
    }
}

#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[async_trait]
impl SimilarityProvider for OllamaEmbeddings {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn similarity(&self, text_a: &str, text_b: &str) -> anyhow::Result<f64> {
        let a = self.embedding(text_a).await?;
        let b = self.embedding(text_b).await?;
        Ok(cosine_similarity(&a, &b))
    }
}
