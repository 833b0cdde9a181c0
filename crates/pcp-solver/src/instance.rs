//! Instance and solution types.
//!
//! An [`Instance`] is validated once at construction and immutable afterwards.
//! A [`Solution`] can only be created from a sequence that replays to equal,
//! nonempty top and bottom strings.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{InstanceError, VerificationError};
use crate::executor::verify_solution;

/// A single domino: a top string and a bottom string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Domino {
    pub top: String,
    pub bottom: String,
}

impl Domino {
    pub fn new(top: impl Into<String>, bottom: impl Into<String>) -> Self {
        Self {
            top: top.into(),
            bottom: bottom.into(),
        }
    }

    /// Total number of symbols on both halves
    pub fn symbol_count(&self) -> usize {
        self.top.chars().count() + self.bottom.chars().count()
    }

    /// Signed length change in symbols (top minus bottom) applied by this domino
    pub fn length_delta(&self) -> isize {
        symbol_gap(&self.top, &self.bottom)
    }
}

/// Unvalidated instance record, as read from JSON.
///
/// Each domino is a list of strings that must contain exactly two entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub dominoes: Vec<Vec<String>>,
    #[serde(default)]
    pub initial_top: String,
    #[serde(default)]
    pub initial_bottom: String,
}

impl InstanceSpec {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            dominoes: pairs
                .iter()
                .map(|(top, bottom)| vec![top.to_string(), bottom.to_string()])
                .collect(),
            ..Default::default()
        }
    }

    /// Decode one entry of a JSON instance list.
    ///
    /// Entries that are not instance records (missing `dominoes`, non-string
    /// halves, wrong field types) are reported as `InvalidEntry`.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, InstanceError> {
        Self::deserialize(value).map_err(|e| InstanceError::InvalidEntry {
            reason: e.to_string(),
        })
    }

    pub fn with_initial(mut self, top: impl Into<String>, bottom: impl Into<String>) -> Self {
        self.initial_top = top.into();
        self.initial_bottom = bottom.into();
        self
    }
}

/// A validated PCP instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "InstanceSpec", into = "InstanceSpec")]
pub struct Instance {
    dominoes: Vec<Domino>,
    initial_top: String,
    initial_bottom: String,
    /// `length_delta` of each domino, in declaration order
    deltas: Vec<isize>,
}

impl Instance {
    /// Build an instance, rejecting empty domino sets and dominoes that
    /// cannot make progress (both strings empty).
    pub fn new(
        dominoes: Vec<Domino>,
        initial_top: impl Into<String>,
        initial_bottom: impl Into<String>,
    ) -> Result<Self, InstanceError> {
        if dominoes.is_empty() {
            return Err(InstanceError::NoDominoes);
        }
        if let Some(index) = dominoes
            .iter()
            .position(|d| d.top.is_empty() && d.bottom.is_empty())
        {
            return Err(InstanceError::EmptyDomino { index });
        }

        let deltas = dominoes.iter().map(Domino::length_delta).collect();
        Ok(Self {
            dominoes,
            deltas,
            initial_top: initial_top.into(),
            initial_bottom: initial_bottom.into(),
        })
    }

    /// Build an instance with no initial strings from (top, bottom) pairs
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self, InstanceError> {
        let dominoes = pairs.iter().map(|&(t, b)| Domino::new(t, b)).collect();
        Self::new(dominoes, "", "")
    }

    pub fn dominoes(&self) -> &[Domino] {
        &self.dominoes
    }

    pub fn initial_top(&self) -> &str {
        &self.initial_top
    }

    pub fn initial_bottom(&self) -> &str {
        &self.initial_bottom
    }

    pub fn domino_count(&self) -> usize {
        self.dominoes.len()
    }

    /// Get a domino by index (bounds-checked)
    pub fn get_domino(&self, index: usize) -> Option<&Domino> {
        self.dominoes.get(index)
    }

    /// Whether the search is seeded with a nonempty top or bottom string
    pub fn has_initial_strings(&self) -> bool {
        !self.initial_top.is_empty() || !self.initial_bottom.is_empty()
    }

    /// Symbol length change applied by each domino, indexed like `dominoes`
    pub fn length_deltas(&self) -> &[isize] {
        &self.deltas
    }

    /// Symbols by which the initial top string leads the initial bottom string
    pub fn initial_gap(&self) -> isize {
        symbol_gap(&self.initial_top, &self.initial_bottom)
    }

    /// Every symbol used by the dominoes and the initial strings
    pub fn alphabet(&self) -> BTreeSet<char> {
        self.dominoes
            .iter()
            .flat_map(|d| d.top.chars().chain(d.bottom.chars()))
            .chain(self.initial_top.chars())
            .chain(self.initial_bottom.chars())
            .collect()
    }

    /// Length of the longest half of any domino
    pub fn max_domino_length(&self) -> usize {
        self.dominoes
            .iter()
            .map(|d| d.top.chars().count().max(d.bottom.chars().count()))
            .max()
            .unwrap_or(0)
    }

    /// Total symbols across all dominoes (initial strings excluded)
    pub fn total_symbols(&self) -> usize {
        self.dominoes.iter().map(Domino::symbol_count).sum()
    }

    /// Distinct symbols across all dominoes (initial strings excluded)
    pub fn distinct_symbols(&self) -> usize {
        self.dominoes
            .iter()
            .flat_map(|d| d.top.chars().chain(d.bottom.chars()))
            .collect::<HashSet<_>>()
            .len()
    }

    /// Distinct symbols divided by total symbols, 0 when there are no symbols
    pub fn complexity_ratio(&self) -> f64 {
        let total = self.total_symbols();
        if total == 0 {
            0.0
        } else {
            self.distinct_symbols() as f64 / total as f64
        }
    }
}

impl TryFrom<InstanceSpec> for Instance {
    type Error = InstanceError;

    fn try_from(spec: InstanceSpec) -> Result<Self, Self::Error> {
        let mut dominoes = Vec::with_capacity(spec.dominoes.len());
        for (index, parts) in spec.dominoes.into_iter().enumerate() {
            let [top, bottom]: [String; 2] = parts
                .try_into()
                .map_err(|p: Vec<String>| InstanceError::MalformedDomino {
                    index,
                    parts: p.len(),
                })?;
            dominoes.push(Domino { top, bottom });
        }
        Instance::new(dominoes, spec.initial_top, spec.initial_bottom)
    }
}

impl From<Instance> for InstanceSpec {
    fn from(instance: Instance) -> Self {
        Self {
            dominoes: instance
                .dominoes
                .into_iter()
                .map(|d| vec![d.top, d.bottom])
                .collect(),
            initial_top: instance.initial_top,
            initial_bottom: instance.initial_bottom,
        }
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PCP instance ({} dominoes)", self.domino_count())?;
        if self.has_initial_strings() {
            writeln!(
                f,
                "initial: '{}' / '{}'",
                self.initial_top, self.initial_bottom
            )?;
        }
        writeln!(f, "dominoes:")?;
        for (i, d) in self.dominoes.iter().enumerate() {
            writeln!(f, "  {}: '{}' / '{}'", i, d.top, d.bottom)?;
        }
        Ok(())
    }
}

/// A verified solution of an instance.
///
/// Construction replays the sequence, so an invalid solution cannot exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution<'a> {
    instance: &'a Instance,
    sequence: Vec<usize>,
    top: String,
    bottom: String,
}

impl<'a> Solution<'a> {
    pub fn new(instance: &'a Instance, sequence: Vec<usize>) -> Result<Self, VerificationError> {
        let replay = verify_solution(instance, &sequence)?;
        Ok(Self {
            instance,
            sequence,
            top: replay.top,
            bottom: replay.bottom,
        })
    }

    pub fn instance(&self) -> &'a Instance {
        self.instance
    }

    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }

    pub fn top(&self) -> &str {
        &self.top
    }

    pub fn bottom(&self) -> &str {
        &self.bottom
    }

    /// The matched string (top and bottom are equal)
    pub fn final_string(&self) -> &str {
        &self.top
    }

    /// Always true: mismatching sequences are rejected at construction
    pub fn is_match(&self) -> bool {
        self.top == self.bottom
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// How many times each domino index is used
    pub fn domino_usage(&self) -> HashMap<usize, usize> {
        let mut usage = HashMap::new();
        for &index in &self.sequence {
            *usage.entry(index).or_insert(0) += 1;
        }
        usage
    }

    /// Distinct indices used divided by total uses (0 for an empty sequence)
    pub fn diversity(&self) -> f64 {
        sequence_diversity(&self.sequence)
    }

    /// Diversity weighted by domino size: symbols contributed by distinct
    /// dominoes divided by symbols contributed by all uses.
    pub fn weighted_diversity(&self) -> f64 {
        if self.sequence.is_empty() {
            return 0.0;
        }
        let weight = |i: &usize| {
            self.instance
                .get_domino(*i)
                .map_or(0, Domino::symbol_count)
        };
        let total: usize = self.sequence.iter().map(weight).sum();
        let distinct: usize = self
            .sequence
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .map(weight)
            .sum();
        if total == 0 {
            0.0
        } else {
            distinct as f64 / total as f64
        }
    }

    /// Owned record suitable for serialization
    pub fn to_record(&self) -> SolutionRecord {
        SolutionRecord {
            instance: self.instance.clone(),
            sequence: self.sequence.clone(),
        }
    }
}

impl fmt::Display for Solution<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PCP solution (length {})", self.len())?;
        writeln!(f, "sequence: {:?}", self.sequence)?;
        writeln!(f, "string: '{}'", self.final_string())?;
        write!(f, "diversity: {:.2}", self.diversity())
    }
}

/// Symbol count of `top` minus symbol count of `bottom`
pub fn symbol_gap(top: &str, bottom: &str) -> isize {
    top.chars().count() as isize - bottom.chars().count() as isize
}

/// Distinct indices divided by sequence length
pub fn sequence_diversity(sequence: &[usize]) -> f64 {
    if sequence.is_empty() {
        return 0.0;
    }
    let distinct = sequence.iter().collect::<HashSet<_>>().len();
    distinct as f64 / sequence.len() as f64
}

/// Serializable form of a solution; decoding goes back through verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionRecord {
    pub instance: Instance,
    pub sequence: Vec<usize>,
}

impl SolutionRecord {
    pub fn to_solution(&self) -> Result<Solution<'_>, VerificationError> {
        Solution::new(&self.instance, self.sequence.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubling() -> Instance {
        Instance::from_pairs(&[("a", "aa"), ("aa", "a")]).unwrap()
    }

    #[test]
    fn test_empty_domino_set_rejected() {
        assert_eq!(
            Instance::new(vec![], "", "").unwrap_err(),
            InstanceError::NoDominoes
        );
    }

    #[test]
    fn test_domino_without_symbols_rejected() {
        let err = Instance::from_pairs(&[("a", "a"), ("", "")]).unwrap_err();
        assert_eq!(err, InstanceError::EmptyDomino { index: 1 });
    }

    #[test]
    fn test_half_empty_domino_accepted() {
        let instance = Instance::from_pairs(&[("", "a"), ("a", "")]).unwrap();
        assert_eq!(instance.domino_count(), 2);
    }

    #[test]
    fn test_malformed_spec_rejected() {
        let spec = InstanceSpec {
            dominoes: vec![vec!["a".into(), "b".into()], vec!["c".into()]],
            ..Default::default()
        };
        assert_eq!(
            Instance::try_from(spec).unwrap_err(),
            InstanceError::MalformedDomino { index: 1, parts: 1 }
        );
    }

    #[test]
    fn test_spec_from_json_value() {
        let value = serde_json::json!({"dominoes": [["a", "aa"]], "initial_top": "a"});
        let spec = InstanceSpec::from_value(&value).unwrap();
        assert_eq!(spec, InstanceSpec::from_pairs(&[("a", "aa")]).with_initial("a", ""));

        for bad in [
            serde_json::json!({"dominoes": [["a", 1]]}),
            serde_json::json!({"initial_top": "a"}),
            serde_json::json!({"dominoes": "ab"}),
            serde_json::json!(7),
        ] {
            assert!(matches!(
                InstanceSpec::from_value(&bad),
                Err(InstanceError::InvalidEntry { .. })
            ));
        }
    }

    #[test]
    fn test_length_deltas_count_symbols() {
        let instance = Instance::new(
            vec![Domino::new("éé", "a"), Domino::new("abc", "a"), Domino::new("ü", "üü")],
            "ß",
            "",
        )
        .unwrap();
        assert_eq!(instance.length_deltas(), &[1, 2, -1]);
        assert_eq!(instance.initial_gap(), 1);
    }

    #[test]
    fn test_instance_json_round_trip() {
        let instance = Instance::new(vec![Domino::new("ab", "a")], "", "b").unwrap();
        let json = serde_json::to_string(&instance).unwrap();
        let back: Instance = serde_json::from_str(&json).unwrap();
        assert_eq!(back, instance);
    }

    #[test]
    fn test_instance_json_decoding_validates() {
        let result: Result<Instance, _> = serde_json::from_str(r#"{"dominoes": []}"#);
        assert!(result.is_err());

        let parsed: Instance = serde_json::from_str(r#"{"dominoes": [["a", "aa"]]}"#).unwrap();
        assert!(!parsed.has_initial_strings());
    }

    #[test]
    fn test_symbol_statistics() {
        let instance = Instance::from_pairs(&[("ab", "a"), ("b", "bab")]).unwrap();
        assert_eq!(instance.total_symbols(), 7);
        assert_eq!(instance.distinct_symbols(), 2);
        assert_eq!(instance.max_domino_length(), 3);
        assert!((instance.complexity_ratio() - 2.0 / 7.0).abs() < 1e-9);
        assert_eq!(instance.alphabet().into_iter().collect::<String>(), "ab");
    }

    #[test]
    fn test_solution_derived_views() {
        let instance = doubling();
        let solution = Solution::new(&instance, vec![0, 1]).unwrap();
        assert_eq!(solution.top(), "aaa");
        assert_eq!(solution.bottom(), "aaa");
        assert!(solution.is_match());
        assert_eq!(solution.len(), 2);
        assert_eq!(solution.diversity(), 1.0);
        assert_eq!(solution.domino_usage().get(&0), Some(&1));
    }

    #[test]
    fn test_repeated_use_lowers_diversity() {
        let instance = doubling();
        let solution = Solution::new(&instance, vec![0, 0, 1, 1]).unwrap();
        assert_eq!(solution.diversity(), 0.5);
        assert_eq!(solution.weighted_diversity(), 0.5);
    }

    #[test]
    fn test_invalid_solution_not_constructible() {
        let instance = doubling();
        assert!(matches!(
            Solution::new(&instance, vec![0, 0]),
            Err(VerificationError::Mismatch { .. })
        ));
        assert!(matches!(
            Solution::new(&instance, vec![0, 5]),
            Err(VerificationError::IndexOutOfRange { index: 5, .. })
        ));
    }

    #[test]
    fn test_solution_record_round_trip() {
        let instance = doubling();
        let solution = Solution::new(&instance, vec![0, 1]).unwrap();
        let json = serde_json::to_string(&solution.to_record()).unwrap();
        let record: SolutionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record.to_solution().unwrap(), solution);
    }
}
