//! Shared pieces of the embedding-backed providers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::SimilarityError;

const DEFAULT_CAPACITY: usize = 4096;

/// Text → embedding cache. Question texts repeat on every scan, so each one is
/// embedded once per process.
pub struct EmbeddingCache {
    entries: Mutex<HashMap<String, Arc<Vec<f32>>>>,
    capacity: usize,
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl EmbeddingCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Return the cached embedding for `text`, fetching it on a miss.
    ///
    /// Two concurrent misses for the same text may both fetch; the later
    /// insert wins.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        text: &str,
        fetch: F,
    ) -> Result<Arc<Vec<f32>>, SimilarityError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<f32>, SimilarityError>>,
    {
        if let Some(hit) = self.entries.lock().get(text) {
            return Ok(Arc::clone(hit));
        }

        let embedding = Arc::new(fetch().await?);
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            tracing::debug!(capacity = self.capacity, "embedding cache full, clearing");
            entries.clear();
        }
        entries.insert(text.to_string(), Arc::clone(&embedding));
        Ok(embedding)
    }
}

/// Cosine similarity clamped to `[0, 1]`.
///
/// Mismatched lengths, empty vectors and zero vectors give 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        (dot / denom).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn cosine_edge_cases() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        // Opposite vectors clamp to zero.
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn cache_fetches_once_per_text() {
        let cache = EmbeddingCache::default();
        let fetches = AtomicU32::new(0);
        for _ in 0..3 {
            let v = cache
                .get_or_fetch("hello", || async {
                    fetches.fetch_add(1, Ordering::Relaxed);
                    Ok(vec![1.0, 2.0])
                })
                .await
                .unwrap();
            assert_eq!(*v, vec![1.0, 2.0]);
        }
        assert_eq!(fetches.load(Ordering::Relaxed), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let cache = EmbeddingCache::default();
        let err = cache
            .get_or_fetch("x", || async {
                Err(SimilarityError::Unavailable("down".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SimilarityError::Unavailable(_)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn cache_clears_at_capacity() {
        let cache = EmbeddingCache::with_capacity(2);
        for text in ["a", "b", "c"] {
            cache
                .get_or_fetch(text, || async { Ok(vec![0.5]) })
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 1);
    }
}
