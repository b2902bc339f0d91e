//! Mock similarity provider for testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use adaptiq_core::traits::SimilarityProvider;

use crate::error::SimilarityError;

/// A similarity provider with scripted answers.
///
/// Looks up the unordered pair first, then falls back to a fixed value.
/// Texts registered with [`MockSimilarity::failing_on`] make the call fail.
pub struct MockSimilarity {
    /// Similarity per unordered text pair.
    pairs: HashMap<(String, String), f64>,
    /// Value for pairs with no entry.
    default_value: f64,
    /// Texts that make the call fail.
    failing: HashSet<String>,
    /// Number of calls made.
    call_count: AtomicU32,
}

fn key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl MockSimilarity {
    /// Create a mock that always returns the same value.
    pub fn with_fixed_value(value: f64) -> Self {
        Self {
            pairs: HashMap::new(),
            default_value: value,
            failing: HashSet::new(),
            call_count: AtomicU32::new(0),
        }
    }

    /// Script the similarity of one pair, in either order.
    pub fn with_pair(mut self, a: &str, b: &str, value: f64) -> Self {
        self.pairs.insert(key(a, b), value);
        self
    }

    /// Fail every call that involves `text`.
    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    /// Get the number of calls made to this provider.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SimilarityProvider for MockSimilarity {
    fn name(&self) -> &str {
        "mock"
    }

    async fn similarity(&self, text_a: &str, text_b: &str) -> anyhow::Result<f64> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        if self.failing.contains(text_a) || self.failing.contains(text_b) {
            return Err(SimilarityError::Unavailable("scripted failure".into()).into());
        }

        Ok(self
            .pairs
            .get(&key(text_a, text_b))
            .copied()
            .unwrap_or(self.default_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_value() {
        let provider = MockSimilarity::with_fixed_value(0.25);
        assert_eq!(provider.similarity("a", "b").await.unwrap(), 0.25);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn pairs_are_unordered() {
        let provider = MockSimilarity::with_fixed_value(0.0).with_pair("x", "y", 0.8);
        assert_eq!(provider.similarity("y", "x").await.unwrap(), 0.8);
        assert_eq!(provider.similarity("x", "z").await.unwrap(), 0.0);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn scripted_failures() {
        let provider = MockSimilarity::with_fixed_value(1.0).failing_on("broken");
        assert!(provider.similarity("broken", "ok").await.is_err());
        assert!(provider.similarity("ok", "ok").await.is_ok());
    }
}
