//! OpenAI embeddings similarity provider.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use adaptiq_core::traits::SimilarityProvider;

use crate::embedding::{cosine_similarity, EmbeddingCache};
use crate::error::{check_status, send_error, ConfigError, SimilarityError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Cosine similarity over embeddings from an OpenAI-compatible API.
pub struct OpenAiEmbeddings {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
    cache: EmbeddingCache,
}

impl OpenAiEmbeddings {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Result<Self, ConfigError> {
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey {
                provider: "openai",
                env_var: "ADAPTIQ_OPENAI_KEY",
            });
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client,
            cache: EmbeddingCache::default(),
        })
    }

    async fn embedding(&self, text: &str) -> Result<Arc<Vec<f32>>, SimilarityError> {
        self.cache.get_or_fetch(text, || self.fetch(text)).await
    }

    #[instrument(skip(self, text), fields(model = %self.model))]
    async fn fetch(&self, text: &str) -> Result<Vec<f32>, SimilarityError> {
        let body = OpenAiEmbeddingRequest {
            model: &self.model,
            input: [text],
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, &self.base_url, DEFAULT_TIMEOUT_SECS))?;
        let response = check_status(response).await?;

        let parsed: OpenAiEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| SimilarityError::InvalidResponse(e.to_string()))?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| SimilarityError::InvalidResponse("no embedding in response".into()))
    }
}

#[derive(Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    #[serde(default)]
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl SimilarityProvider for OpenAiEmbeddings {
    fn name(&self) -> &str {
        "openai"
    }

    async fn similarity(&self, text_a: &str, text_b: &str) -> anyhow::Result<f64> {
        let a = self.embedding(text_a).await?;
        let b = self.embedding(text_b).await?;
        Ok(cosine_similarity(&a, &b))
    }
}
