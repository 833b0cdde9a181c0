//! Named problem sets persisted as JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::batch::{BatchReport, InstanceReport};
use crate::error::Result;
use crate::evaluator::Difficulty;
use crate::instance::Instance;

/// A named, labelled collection of evaluated instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemSet {
    pub name: String,
    pub difficulty: Difficulty,
    pub theme: String,
    pub total_problems: usize,
    pub solvable_problems: usize,
    pub problems: Vec<InstanceReport>,
    pub created_at: DateTime<Utc>,
}

impl ProblemSet {
    pub fn new(
        name: impl Into<String>,
        difficulty: Difficulty,
        theme: impl Into<String>,
        problems: Vec<InstanceReport>,
    ) -> Self {
        let solvable_problems = problems.iter().filter(|p| p.has_solution()).count();
        Self {
            name: name.into(),
            difficulty,
            theme: theme.into(),
            total_problems: problems.len(),
            solvable_problems,
            problems,
            created_at: Utc::now(),
        }
    }

    /// Build a set from every result of a batch run
    pub fn from_report(
        name: impl Into<String>,
        difficulty: Difficulty,
        theme: impl Into<String>,
        report: &BatchReport,
    ) -> Self {
        Self::new(name, difficulty, theme, report.results.clone())
    }

    /// Instances in the set that pass construction, in order
    pub fn instances(&self) -> Vec<Instance> {
        self.problems
            .iter()
            .filter_map(|p| p.instance.clone())
            .filter_map(|spec| Instance::try_from(spec).ok())
            .collect()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        info!(name = %self.name, path = %path.display(), "problem set saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{run_batch, BatchConfig};
    use crate::instance::InstanceSpec;

    fn sample_report() -> BatchReport {
        let specs = vec![
            InstanceSpec::from_pairs(&[("a", "aa"), ("aa", "a")]),
            InstanceSpec::from_pairs(&[("abc", "ab"), ("ca", "a"), ("acc", "ba")]),
            InstanceSpec::from_pairs(&[]),
        ];
        run_batch(&specs, &BatchConfig::default()).unwrap()
    }

    #[test]
    fn test_from_report_counts() {
        let set = ProblemSet::from_report("demo", Difficulty::Easy, "alphabet", &sample_report());
        assert_eq!(set.total_problems, 3);
        assert_eq!(set.solvable_problems, 1);
        assert_eq!(set.instances().len(), 2);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.json");

        let set = ProblemSet::from_report("demo", Difficulty::Medium, "sushi", &sample_report());
        set.save(&path).unwrap();
        let loaded = ProblemSet::load(&path).unwrap();

        assert_eq!(loaded.name, "demo");
        assert_eq!(loaded.difficulty, Difficulty::Medium);
        assert_eq!(loaded.theme, "sushi");
        assert_eq!(loaded.created_at, set.created_at);
        assert_eq!(loaded.problems.len(), 3);
        assert_eq!(loaded.problems[0].outcome, set.problems[0].outcome);
        assert_eq!(loaded.instances(), set.instances());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProblemSet::load(dir.path().join("missing.json")).is_err());
    }
}
