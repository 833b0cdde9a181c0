//! Systematic enumeration of small candidate instances.
//!
//! Candidates are built from every string over an alphabet up to a length
//! bound: dominoes are (top, bottom) pairs of those strings, domino sets are
//! combinations with replacement, and each set may be seeded with short
//! initial strings. Candidates are solved as a batch and the solvable ones
//! can be picked into a difficulty-balanced selection.

use std::cmp::Ordering;
use std::ops::RangeInclusive;

use crate::batch::{run_batch, BatchConfig, InstanceReport};
use crate::error::BatchError;
use crate::evaluator::Difficulty;
use crate::instance::{Domino, InstanceSpec};

/// Bounds of the candidate space
#[derive(Debug, Clone)]
pub struct EnumerationConfig {
    pub alphabet: Vec<char>,
    /// Number of dominoes per instance
    pub domino_counts: RangeInclusive<usize>,
    /// Maximum length of each domino half
    pub max_string_len: usize,
    /// Maximum combined length of the initial top and bottom strings
    pub max_initial_len: usize,
    /// Stop after this many candidates
    pub sample_limit: usize,
    /// Skip sets containing a domino whose halves are already equal
    pub skip_trivial: bool,
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        Self {
            alphabet: vec!['S', 'T'],
            domino_counts: 2..=3,
            max_string_len: 2,
            max_initial_len: 0,
            sample_limit: 100,
            skip_trivial: true,
        }
    }
}

/// All strings over `alphabet` of length 0 through `max_len`, shortest first
pub fn strings_up_to(alphabet: &[char], max_len: usize) -> Vec<String> {
    let mut all = vec![String::new()];
    let mut layer = vec![String::new()];
    for _ in 0..max_len {
        layer = layer
            .iter()
            .flat_map(|prefix| {
                alphabet.iter().map(move |&c| {
                    let mut s = prefix.clone();
                    s.push(c);
                    s
                })
            })
            .collect();
        all.extend(layer.iter().cloned());
    }
    all
}

/// Every usable domino: (top, bottom) pairs of strings, not both empty
pub fn domino_pool(alphabet: &[char], max_len: usize) -> Vec<Domino> {
    let strings = strings_up_to(alphabet, max_len);
    strings
        .iter()
        .flat_map(|top| strings.iter().map(move |bottom| Domino::new(top.clone(), bottom.clone())))
        .filter(|d| !(d.top.is_empty() && d.bottom.is_empty()))
        .collect()
}

/// Initial (top, bottom) pairs with combined length at most `max_total`
pub fn initial_pairs(alphabet: &[char], max_total: usize) -> Vec<(String, String)> {
    let strings = strings_up_to(alphabet, max_total);
    let mut pairs = Vec::new();
    for top in &strings {
        for bottom in &strings {
            if top.chars().count() + bottom.chars().count() <= max_total {
                pairs.push((top.clone(), bottom.clone()));
            }
        }
    }
    pairs
}

/// Non-decreasing index tuples of length `k` drawn from `0..n`
#[derive(Debug, Clone)]
pub struct CombinationsWithReplacement {
    n: usize,
    current: Option<Vec<usize>>,
}

impl CombinationsWithReplacement {
    pub fn new(n: usize, k: usize) -> Self {
        let current = if n == 0 && k > 0 { None } else { Some(vec![0; k]) };
        Self { n, current }
    }
}

impl Iterator for CombinationsWithReplacement {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take()?;

        // Advance: bump the rightmost position that can grow, reset the tail to it
        let mut next = current.clone();
        if let Some(pos) = next.iter().rposition(|&i| i + 1 < self.n) {
            let value = next[pos] + 1;
            for slot in &mut next[pos..] {
                *slot = value;
            }
            self.current = Some(next);
        }

        Some(current)
    }
}

/// A domino set is trivially solvable by one of its own dominoes
pub fn has_trivial_solution(dominoes: &[&Domino]) -> bool {
    dominoes.iter().any(|d| d.top == d.bottom)
}

/// Enumerate candidate instances in a fixed order, up to the sample limit
pub fn candidates(config: &EnumerationConfig) -> Vec<InstanceSpec> {
    let pool = domino_pool(&config.alphabet, config.max_string_len);
    let initials = initial_pairs(&config.alphabet, config.max_initial_len);
    let mut out = Vec::new();

    for count in config.domino_counts.clone() {
        for combo in CombinationsWithReplacement::new(pool.len(), count) {
            let set: Vec<&Domino> = combo.iter().map(|&i| &pool[i]).collect();
            if config.skip_trivial && has_trivial_solution(&set) {
                continue;
            }
            for (initial_top, initial_bottom) in &initials {
                if out.len() >= config.sample_limit {
                    return out;
                }
                out.push(InstanceSpec {
                    dominoes: set
                        .iter()
                        .map(|d| vec![d.top.clone(), d.bottom.clone()])
                        .collect(),
                    initial_top: initial_top.clone(),
                    initial_bottom: initial_bottom.clone(),
                });
            }
        }
    }

    out
}

/// Solve every candidate and keep the ones with a solution
pub fn search(
    config: &EnumerationConfig,
    batch: &BatchConfig,
) -> Result<Vec<InstanceReport>, BatchError> {
    let specs = candidates(config);
    let report = run_batch(&specs, batch)?;
    Ok(report
        .results
        .into_iter()
        .filter(InstanceReport::has_solution)
        .collect())
}

/// Pick up to `target` results: a third easy, a third medium, the rest hard,
/// each group by descending quality.
pub fn select_balanced(mut found: Vec<InstanceReport>, target: usize) -> Vec<InstanceReport> {
    found.sort_by(|a, b| {
        b.quality()
            .partial_cmp(&a.quality())
            .unwrap_or(Ordering::Equal)
    });

    let difficulty = |r: &InstanceReport| r.evaluation.as_ref().map(|e| e.difficulty);
    let mut easy = Vec::new();
    let mut medium = Vec::new();
    let mut hard = Vec::new();
    for report in found {
        match difficulty(&report) {
            Some(Difficulty::Easy) => easy.push(report),
            Some(Difficulty::Medium) => medium.push(report),
            _ => hard.push(report),
        }
    }

    let easy_count = easy.len().min(target / 3);
    let medium_count = medium.len().min(target / 3);
    let hard_count = hard.len().min(target - easy_count - medium_count);

    easy.into_iter()
        .take(easy_count)
        .chain(medium.into_iter().take(medium_count))
        .chain(hard.into_iter().take(hard_count))
        .collect()
}
