//! Synthetic per-grade difficulty for questions that arrive without response data.
//!
//! This is a bootstrap prior, not a model of real learners: it only exists so
//! the ranking has a difficulty signal from the first session onward. Swap in
//! another [`DifficultyPrior`] if better data is available.

use rand::{Rng, RngCore};
use rand_distr::{Distribution, Normal};

use crate::model::{DifficultyEntry, DifficultyProfile, Grade};

/// Produces a dense difficulty profile for a question with no recorded answers.
pub trait DifficultyPrior: Send + Sync {
    fn synthesize(&self, grade_level: Grade, rng: &mut dyn RngCore) -> DifficultyProfile;
}

/// Percent-correct values drawn from one normal distribution per question,
/// sorted so that higher grades never do worse than lower ones.
///
/// The monotonic ordering is a simplifying assumption. The authored grade is
/// not used.
#[derive(Debug, Clone)]
pub struct SortedNormalPrior {
    pub mean_range: (f64, f64),
    pub std_dev_range: (f64, f64),
    pub respondent_range: (u32, u32),
    pub clamp: (f64, f64),
}

impl Default for SortedNormalPrior {
    fn default() -> Self {
        Self {
            mean_range: (20.0, 95.0),
            std_dev_range: (5.0, 20.0),
            respondent_range: (1, 500),
            clamp: (1.0, 99.0),
        }
    }
}

impl SortedNormalPrior {
    /// The raw `(percent_correct, respondents)` pairs, ascending by grade.
    pub fn sample_pairs(&self, rng: &mut dyn RngCore) -> [(f64, u32); Grade::COUNT] {
        let mean = rng.gen_range(self.mean_range.0..=self.mean_range.1);
        let std_dev = rng.gen_range(self.std_dev_range.0..=self.std_dev_range.1);

        let mut percents = [0.0f64; Grade::COUNT];
        match Normal::new(mean, std_dev) {
            Ok(normal) => {
                for p in percents.iter_mut() {
                    *p = normal.sample(rng);
                }
            }
            // Only reachable with a misconfigured (negative or NaN) std-dev range.
            Err(_) => percents = [mean; Grade::COUNT],
        }
        percents.sort_by(f64::total_cmp);

        let mut pairs = [(0.0, 0u32); Grade::COUNT];
        for (pair, percent) in pairs.iter_mut().zip(percents) {
            let respondents =
                rng.gen_range(self.respondent_range.0..=self.respondent_range.1.max(1));
            *pair = (percent.clamp(self.clamp.0, self.clamp.1), respondents.max(1));
        }
        pairs
    }
}

impl DifficultyPrior for SortedNormalPrior {
    fn synthesize(&self, grade_level: Grade, rng: &mut dyn RngCore) -> DifficultyProfile {
        let pairs = self.sample_pairs(rng);
        let mut profile = DifficultyProfile::default();
        for (grade, (percent, respondents)) in Grade::ALL.iter().zip(pairs) {
            profile.set(*grade, DifficultyEntry::from_percent(percent, respondents));
        }
        tracing::trace!(grade_level = %grade_level, "synthesized difficulty profile");
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn pairs_are_sorted_clamped_and_sized() {
        let prior = SortedNormalPrior::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let pairs = prior.sample_pairs(&mut rng);
            assert_eq!(pairs.len(), 7);
            for window in pairs.windows(2) {
                assert!(window[0].0 <= window[1].0, "not sorted: {pairs:?}");
            }
            for (percent, respondents) in pairs {
                assert!((1.0..=99.0).contains(&percent));
                assert!((1..=500).contains(&respondents));
            }
        }
    }

    #[test]
    fn profile_is_dense_and_consistent() {
        let prior = SortedNormalPrior::default();
        let mut rng = StdRng::seed_from_u64(99);
        let profile = prior.synthesize(Grade::new(5).unwrap(), &mut rng);
        for (_, entry) in profile.iter() {
            assert!(entry.respondents >= 1);
            assert!(entry.correct <= entry.respondents);
            assert!((0.0..=100.0).contains(&entry.percent_correct()));
        }
    }

    #[test]
    fn same_seed_same_profile() {
        let prior = SortedNormalPrior::default();
        let grade = Grade::new(4).unwrap();
        let a = prior.synthesize(grade, &mut StdRng::seed_from_u64(1));
        let b = prior.synthesize(grade, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }
}
