//! Quality scoring and difficulty classification for searched instances.
//!
//! Scoring is a pure function of the instance, the search outcome and the
//! search time.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::executor::execute;
use crate::instance::{sequence_diversity, Instance};
use crate::solver::SearchOutcome;

/// Score at or above which an instance counts as high quality
pub const HIGH_QUALITY_THRESHOLD: f64 = 0.7;

/// Difficulty class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(label)
    }
}

/// Points awarded by each scoring rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub solution_exists: f64,
    pub domino_count: f64,
    pub string_complexity: f64,
    pub solution_length: f64,
    pub diversity: f64,
    pub result_length: f64,
    pub search_time: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.solution_exists
            + self.domino_count
            + self.string_complexity
            + self.solution_length
            + self.diversity
            + self.result_length
            + self.search_time
    }
}

/// Scored view of one search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Quality in [0, 1]
    pub quality: f64,
    pub difficulty: Difficulty,
    /// Difficulty rating on a 1-10 scale
    pub rating: u8,
    pub total_symbols: usize,
    pub distinct_symbols: usize,
    pub complexity_ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diversity: Option<f64>,
    /// Length of the matched string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_length: Option<usize>,
    pub breakdown: ScoreBreakdown,
}

impl Evaluation {
    pub fn is_high_quality(&self) -> bool {
        self.quality >= HIGH_QUALITY_THRESHOLD
    }
}

/// Score an instance given its search outcome and search time
pub fn score(instance: &Instance, outcome: &SearchOutcome, search_time: Duration) -> Evaluation {
    let sequence = outcome.sequence();
    let total_symbols = instance.total_symbols();
    let complexity_ratio = instance.complexity_ratio();

    let solution_length = sequence.map(<[usize]>::len);
    let diversity = sequence.map(sequence_diversity);
    let result_length = sequence
        .and_then(|s| execute(instance, s).ok())
        .map(|r| r.top.chars().count());

    let mut breakdown = ScoreBreakdown::default();

    if sequence.is_some() {
        breakdown.solution_exists = 0.3;
    }

    // Moderate size
    if (2..=5).contains(&instance.domino_count()) {
        breakdown.domino_count = 0.1;
    }
    if (3..=20).contains(&total_symbols) {
        breakdown.string_complexity += 0.05;
    }
    if complexity_ratio > 0.0 && complexity_ratio <= 0.5 {
        breakdown.string_complexity += 0.05;
    }

    // Solution shape
    if let Some(length) = solution_length {
        if (2..=10).contains(&length) {
            breakdown.solution_length = 0.1;
        }
    }
    if diversity.is_some_and(|d| d > 0.3) {
        breakdown.diversity = 0.1;
    }
    if result_length.is_some_and(|l| l <= 30) {
        breakdown.result_length = 0.1;
    }

    let secs = search_time.as_secs_f64();
    if secs < 1.0 {
        breakdown.search_time = 0.2;
    } else if secs < 5.0 {
        breakdown.search_time = 0.1;
    }

    Evaluation {
        quality: breakdown.total().clamp(0.0, 1.0),
        difficulty: classify(solution_length, search_time),
        rating: rating(instance, solution_length, search_time),
        total_symbols,
        distinct_symbols: instance.distinct_symbols(),
        complexity_ratio,
        solution_length,
        diversity,
        result_length,
        breakdown,
    }
}

/// Classify difficulty from solution length and search time.
///
/// Instances without a known solution are hard.
pub fn classify(solution_length: Option<usize>, search_time: Duration) -> Difficulty {
    let secs = search_time.as_secs_f64();
    match solution_length {
        Some(len) if len <= 2 && secs < 0.1 => Difficulty::Easy,
        Some(len) if len <= 4 && secs < 0.5 => Difficulty::Medium,
        _ => Difficulty::Hard,
    }
}

/// Difficulty rating on a 1-10 scale
pub fn rating(instance: &Instance, solution_length: Option<usize>, search_time: Duration) -> u8 {
    let mut score = 1usize;

    score += instance.domino_count().saturating_sub(2).min(3);

    score += match solution_length {
        Some(len) => (len / 3).min(3),
        None => 5,
    };

    let secs = search_time.as_secs_f64();
    if secs > 1.0 {
        score += 2;
    } else if secs > 0.1 {
        score += 1;
    }

    score += (instance.total_symbols() / 10).min(2);

    score.min(10) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubling() -> Instance {
        Instance::from_pairs(&[("a", "aa"), ("aa", "a")]).unwrap()
    }

    #[test]
    fn test_quick_short_solution_scores_full() {
        let instance = doubling();
        let eval = score(
            &instance,
            &SearchOutcome::Found(vec![0, 1]),
            Duration::from_millis(5),
        );
        // 6 symbols, 1 distinct: ratio 1/6
        assert!((eval.quality - 1.0).abs() < 1e-9);
        assert!(eval.is_high_quality());
        assert_eq!(eval.difficulty, Difficulty::Easy);
        assert_eq!(eval.solution_length, Some(2));
        assert_eq!(eval.result_length, Some(3));
    }

    #[test]
    fn test_no_solution_scores_instance_only() {
        let instance = doubling();
        let eval = score(&instance, &SearchOutcome::Exhausted, Duration::from_secs(2));
        assert_eq!(eval.breakdown.solution_exists, 0.0);
        assert_eq!(eval.breakdown.search_time, 0.1);
        assert!((eval.quality - 0.3).abs() < 1e-9);
        assert_eq!(eval.difficulty, Difficulty::Hard);
        assert!(eval.solution_length.is_none());
    }

    #[test]
    fn test_score_is_deterministic() {
        let instance = doubling();
        let outcome = SearchOutcome::Found(vec![0, 0, 1, 1]);
        let a = score(&instance, &outcome, Duration::from_millis(300));
        let b = score(&instance, &outcome, Duration::from_millis(300));
        assert_eq!(a, b);
        assert_eq!(a.difficulty, Difficulty::Medium);
    }

    #[test]
    fn test_quality_stays_in_unit_interval() {
        let instance = Instance::from_pairs(&[("abcdefghij", "abcdefghij")]).unwrap();
        for outcome in [
            SearchOutcome::Found(vec![0]),
            SearchOutcome::Exhausted,
            SearchOutcome::TimedOut,
        ] {
            let eval = score(&instance, &outcome, Duration::from_secs(10));
            assert!((0.0..=1.0).contains(&eval.quality));
        }
    }

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify(Some(2), Duration::from_millis(50)), Difficulty::Easy);
        assert_eq!(classify(Some(2), Duration::from_millis(200)), Difficulty::Medium);
        assert_eq!(classify(Some(4), Duration::from_millis(100)), Difficulty::Medium);
        assert_eq!(classify(Some(5), Duration::from_millis(10)), Difficulty::Hard);
        assert_eq!(classify(None, Duration::ZERO), Difficulty::Hard);
    }

    #[test]
    fn test_rating_scale() {
        let instance = doubling();
        assert_eq!(rating(&instance, Some(2), Duration::from_millis(1)), 1);
        assert_eq!(rating(&instance, None, Duration::from_secs(3)), 8);

        let big = Instance::from_pairs(&[
            ("abcde", "abcde"),
            ("abcde", "abcde"),
            ("abcde", "abcde"),
            ("abcde", "abcde"),
            ("abcde", "abcde"),
            ("abcde", "abcde"),
        ])
        .unwrap();
        assert_eq!(rating(&big, None, Duration::from_secs(3)), 10);
    }
}
