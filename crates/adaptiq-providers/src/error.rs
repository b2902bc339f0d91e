//! Provider error types.

use thiserror::Error;

pub use adaptiq_core::error::SimilarityError;

/// Errors raised while building a provider from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A hosted provider was configured without credentials.
    #[error("{provider} similarity requires an API key (set {env_var} or api_key)")]
    MissingApiKey {
        provider: &'static str,
        env_var: &'static str,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Classify a transport failure.
pub(crate) fn send_error(e: reqwest::Error, base_url: &str, timeout_secs: u64) -> SimilarityError {
    if e.is_timeout() {
        SimilarityError::Timeout(timeout_secs * 1000)
    } else if e.is_connect() {
        SimilarityError::Unavailable(format!("not reachable at {base_url}"))
    } else {
        SimilarityError::Unavailable(e.to_string())
    }
}

/// Turn an error status into a [`SimilarityError::Api`]; pass successes through.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, SimilarityError> {
    let status = response.status().as_u16();
    if status >= 400 {
        let message = response.text().await.unwrap_or_default();
        return Err(SimilarityError::Api { status, message });
    }
    Ok(response)
}
