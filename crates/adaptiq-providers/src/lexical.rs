//! Lexical similarity: a fuzzy token-sort ratio.
//!
//! Both texts are lowercased, stripped of punctuation, split into words, and
//! the words sorted and re-joined, so word order does not matter. The two
//! normalized strings are then compared with an indel ratio:
//! `2 * lcs / (len_a + len_b)`, where `lcs` is the length of their longest
//! common subsequence.

use async_trait::async_trait;

use adaptiq_core::traits::SimilarityProvider;

/// Token-sort ratio similarity. Needs no network and is deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSortRatio;

impl TokenSortRatio {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous form of [`SimilarityProvider::similarity`].
    pub fn ratio(&self, a: &str, b: &str) -> f64 {
        let a = sorted_tokens(a);
        let b = sorted_tokens(b);
        indel_ratio(&a, &b)
    }
}

#[async_trait]
impl SimilarityProvider for TokenSortRatio {
    fn name(&self) -> &str {
        "lexical"
    }

    async fn similarity(&self, text_a: &str, text_b: &str) -> anyhow::Result<f64> {
        Ok(self.ratio(text_a, text_b))
    }
}

fn sorted_tokens(text: &str) -> Vec<char> {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    words.sort_unstable();
    words.join(" ").chars().collect()
}

fn indel_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 || a.is_empty() || b.is_empty() {
        return 0.0;
    }
    2.0 * lcs_len(a, b) as f64 / total as f64
}

/// Longest common subsequence length, two rolling rows.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_score_one() {
        let r = TokenSortRatio::new();
        assert_eq!(r.ratio("What is a cell?", "What is a cell?"), 1.0);
    }

    #[test]
    fn word_order_and_case_are_ignored() {
        let r = TokenSortRatio::new();
        assert_eq!(r.ratio("the Quick brown fox", "fox brown quick, THE"), 1.0);
    }

    #[test]
    fn empty_or_punctuation_only_scores_zero() {
        let r = TokenSortRatio::new();
        assert_eq!(r.ratio("", "anything"), 0.0);
        assert_eq!(r.ratio("?!", "..."), 0.0);
    }

    #[test]
    fn partial_overlap_is_between_zero_and_one() {
        let r = TokenSortRatio::new();
        let close = r.ratio("photosynthesis in plants", "photosynthesis in green plants");
        let far = r.ratio("photosynthesis in plants", "long division of fractions");
        assert!(close > far);
        assert!(close > 0.0 && close < 1.0);
        assert!((0.0..1.0).contains(&far));
    }

    #[test]
    fn lcs_known_values() {
        let a: Vec<char> = "abcde".chars().collect();
        let b: Vec<char> = "ace".chars().collect();
        assert_eq!(lcs_len(&a, &b), 3);
        // 2 * 3 / 8
        assert!((indel_ratio(&a, &b) - 0.75).abs() < 1e-12);
    }

    #[tokio::test]
    async fn provider_is_symmetric() {
        let r = TokenSortRatio::new();
        let ab = r.similarity("gravity pulls objects", "objects fall").await.unwrap();
        let ba = r.similarity("objects fall", "gravity pulls objects").await.unwrap();
        assert_eq!(ab, ba);
    }
}
