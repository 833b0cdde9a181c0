//! Batch evaluation of many instances on a bounded worker pool.
//!
//! Each instance is built, solved and scored independently. Workers send a
//! completion event over a channel; the collector files each report under
//! the instance's input position, so results may finish in any order.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BatchError, InstanceError};
use crate::evaluator::{score, Evaluation};
use crate::instance::{Instance, InstanceSpec};
use crate::solver::{solve, SearchOutcome, SolverConfig};

/// Configuration for a batch run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Number of worker threads
    pub concurrency: usize,
    /// Log start, progress and finish lines
    pub show_progress: bool,
    /// Completions between progress lines
    pub progress_interval: usize,
    pub solver: SolverConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            show_progress: false,
            progress_interval: 10,
            solver: SolverConfig::default(),
        }
    }
}

/// Per-instance classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    /// Search finished within its bound: found or exhausted
    Completed,
    /// Time limit reached
    Timeout,
    /// Instance failed construction
    Error,
}

/// Result for one input instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceReport {
    /// Position in the input list
    pub index: usize,
    pub status: InstanceStatus,
    /// Decoded input; absent when the entry was not an instance record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<InstanceSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<SearchOutcome>,
    /// Seconds spent in the solver
    pub search_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states_explored: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InstanceReport {
    pub fn has_solution(&self) -> bool {
        self.outcome.as_ref().is_some_and(SearchOutcome::is_found)
    }

    pub fn solution_length(&self) -> Option<usize> {
        self.outcome.as_ref()?.sequence().map(<[usize]>::len)
    }

    pub fn quality(&self) -> Option<f64> {
        self.evaluation.as_ref().map(|e| e.quality)
    }
}

/// Aggregates over the instances that have a solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionStatistics {
    pub avg_solution_length: f64,
    pub min_solution_length: usize,
    pub max_solution_length: usize,
    pub avg_search_time: f64,
    pub avg_quality_score: f64,
    pub high_quality_problems: usize,
}

/// Counts and rates over a whole batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub total_problems: usize,
    pub completed_problems: usize,
    pub problems_with_solution: usize,
    pub timeout_problems: usize,
    pub error_problems: usize,
    /// Found divided by instances that were constructed successfully
    pub success_rate: f64,
    /// Completed divided by all instances
    pub completion_rate: f64,
    pub processing_time: f64,
    pub problems_per_second: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution_statistics: Option<SolutionStatistics>,
}

/// Full output of a batch run, results in input order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub total_problems: usize,
    pub results: Vec<InstanceReport>,
    pub statistics: BatchStatistics,
    pub processing_time: f64,
}

impl BatchReport {
    /// Completed instances with a solution and quality at least `min_quality`
    pub fn quality_at_least(&self, min_quality: f64) -> Vec<&InstanceReport> {
        self.results
            .iter()
            .filter(|r| r.status == InstanceStatus::Completed && r.has_solution())
            .filter(|r| r.quality().is_some_and(|q| q >= min_quality))
            .collect()
    }
}

/// One entry of a batch input list
pub trait BatchInput: Sync {
    fn to_spec(&self) -> Result<InstanceSpec, InstanceError>;
}

impl BatchInput for InstanceSpec {
    fn to_spec(&self) -> Result<InstanceSpec, InstanceError> {
        Ok(self.clone())
    }
}

/// Raw JSON entries are decoded per instance, so one bad entry only fails itself
impl BatchInput for serde_json::Value {
    fn to_spec(&self) -> Result<InstanceSpec, InstanceError> {
        InstanceSpec::from_value(self)
    }
}

/// Completion event sent from a worker to the collector
#[derive(Debug)]
enum BatchEvent {
    Finished(InstanceReport),
}

/// Decode, build, solve and score one instance
pub fn evaluate_instance<T: BatchInput>(
    index: usize,
    input: &T,
    config: &SolverConfig,
) -> InstanceReport {
    let mut report = InstanceReport {
        index,
        status: InstanceStatus::Error,
        instance: None,
        outcome: None,
        search_time: 0.0,
        states_explored: None,
        evaluation: None,
        error: None,
    };

    let built = input.to_spec().and_then(|spec| {
        report.instance = Some(spec.clone());
        Instance::try_from(spec)
    });
    let instance = match built {
        Ok(instance) => instance,
        Err(e) => {
            warn!(index, error = %e, "instance rejected");
            report.error = Some(e.to_string());
            return report;
        }
    };

    let result = solve(&instance, config);
    report.search_time = result.time_elapsed.as_secs_f64();
    report.states_explored = Some(result.states_explored);

    match result.outcome {
        SearchOutcome::TimedOut => {
            report.status = InstanceStatus::Timeout;
        }
        _ => {
            report.status = InstanceStatus::Completed;
            report.evaluation = Some(score(&instance, &result.outcome, result.time_elapsed));
        }
    }
    report.outcome = Some(result.outcome);
    report
}

/// Solve and score every instance on a pool of `config.concurrency` workers.
///
/// Decoding and construction failures are recorded as `error` results; they
/// never abort the batch. No instance is retried.
pub fn run_batch<T: BatchInput>(
    specs: &[T],
    config: &BatchConfig,
) -> Result<BatchReport, BatchError> {
    let started = Instant::now();
    let total = specs.len();
    let workers = config.concurrency.max(1);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("pcp-worker-{}", i))
        .build()?;

    if config.show_progress {
        info!(total, workers, "batch started");
    }

    let (tx, rx) = mpsc::channel::<BatchEvent>();
    let mut slots: Vec<Option<InstanceReport>> = vec![None; total];

    thread::scope(|s| {
        let solver = &config.solver;
        let pool = &pool;
        s.spawn(move || {
            pool.scope(move |scope| {
                for (index, spec) in specs.iter().enumerate() {
                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        let report = evaluate_instance(index, spec, solver);
                        // The collector outlives every worker
                        let _ = tx.send(BatchEvent::Finished(report));
                    });
                }
                // tx is dropped when this closure returns, closing the channel
            });
        });

        let mut completed = 0;
        for event in rx {
            let BatchEvent::Finished(report) = event;
            completed += 1;
            if config.show_progress
                && (completed % config.progress_interval.max(1) == 0 || completed == total)
            {
                let percent = completed as f64 / total as f64 * 100.0;
                info!(completed, total, percent, "batch progress");
            }
            let index = report.index;
            slots[index] = Some(report);
        }
    });

    let results: Vec<InstanceReport> = slots.into_iter().flatten().collect();
    let processing_time = started.elapsed();
    let statistics = calculate_statistics(&results, processing_time);

    if config.show_progress {
        info!(
            found = statistics.problems_with_solution,
            timeouts = statistics.timeout_problems,
            errors = statistics.error_problems,
            secs = processing_time.as_secs_f64(),
            "batch finished"
        );
    }

    Ok(BatchReport {
        total_problems: total,
        results,
        statistics,
        processing_time: processing_time.as_secs_f64(),
    })
}

/// Aggregate counts, rates and solution statistics
pub fn calculate_statistics(results: &[InstanceReport], processing_time: Duration) -> BatchStatistics {
    let total = results.len();
    let count = |status: InstanceStatus| results.iter().filter(|r| r.status == status).count();
    let completed = count(InstanceStatus::Completed);
    let timeouts = count(InstanceStatus::Timeout);
    let errors = count(InstanceStatus::Error);

    let with_solution: Vec<&InstanceReport> = results
        .iter()
        .filter(|r| r.status == InstanceStatus::Completed && r.has_solution())
        .collect();

    let ratio = |n: usize, d: usize| if d == 0 { 0.0 } else { n as f64 / d as f64 };
    let secs = processing_time.as_secs_f64();

    BatchStatistics {
        total_problems: total,
        completed_problems: completed,
        problems_with_solution: with_solution.len(),
        timeout_problems: timeouts,
        error_problems: errors,
        success_rate: ratio(with_solution.len(), total - errors),
        completion_rate: ratio(completed, total),
        processing_time: secs,
        problems_per_second: if secs > 0.0 { total as f64 / secs } else { 0.0 },
        solution_statistics: solution_statistics(&with_solution),
    }
}

fn solution_statistics(with_solution: &[&InstanceReport]) -> Option<SolutionStatistics> {
    if with_solution.is_empty() {
        return None;
    }
    let n = with_solution.len() as f64;

    let lengths: Vec<usize> = with_solution
        .iter()
        .filter_map(|r| r.solution_length())
        .collect();
    let qualities: Vec<f64> = with_solution.iter().filter_map(|r| r.quality()).collect();

    Some(SolutionStatistics {
        avg_solution_length: lengths.iter().sum::<usize>() as f64 / n,
        min_solution_length: lengths.iter().copied().min().unwrap_or(0),
        max_solution_length: lengths.iter().copied().max().unwrap_or(0),
        avg_search_time: with_solution.iter().map(|r| r.search_time).sum::<f64>() / n,
        avg_quality_score: qualities.iter().sum::<f64>() / n,
        high_quality_problems: with_solution
            .iter()
            .filter(|r| r.evaluation.as_ref().is_some_and(Evaluation::is_high_quality))
            .count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_config(concurrency: usize) -> BatchConfig {
        BatchConfig {
            concurrency,
            solver: SolverConfig {
                max_depth: 15,
                time_limit: Duration::from_secs(30),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn sample_specs() -> Vec<InstanceSpec> {
        vec![
            InstanceSpec::from_pairs(&[("a", "aa"), ("aa", "a")]),
            InstanceSpec::from_pairs(&[("abc", "ab"), ("ca", "a"), ("acc", "ba")]),
            InstanceSpec::from_pairs(&[]),
            InstanceSpec::from_pairs(&[("x", "xx"), ("xx", "x")]),
            InstanceSpec::from_pairs(&[("ab", "a"), ("c", "bc")]),
        ]
    }

    #[test]
    fn test_batch_with_one_invalid_instance() {
        let report = run_batch(&sample_specs(), &batch_config(3)).unwrap();
        let stats = &report.statistics;

        assert_eq!(report.total_problems, 5);
        assert_eq!(stats.error_problems, 1);
        assert_eq!(stats.completed_problems + stats.timeout_problems, 4);
        assert_eq!(stats.problems_with_solution, 3);
        assert!((stats.success_rate - 3.0 / 4.0).abs() < 1e-9);
        assert!((stats.completion_rate - 4.0 / 5.0).abs() < 1e-9);

        assert_eq!(report.results[2].status, InstanceStatus::Error);
        assert!(report.results[2].error.as_deref().unwrap().contains("empty"));
        assert_eq!(
            report.results[1].outcome,
            Some(SearchOutcome::Exhausted)
        );
    }

    #[test]
    fn test_undecodable_entry_fails_alone() {
        let inputs: Vec<serde_json::Value> = serde_json::from_str(
            r#"[
                {"dominoes": [["a", "aa"], ["aa", "a"]]},
                {"dominoes": [["a", 1]]},
                {"initial_top": "a"},
                {"dominoes": [["ab", "a"], ["c", "bc"]]}
            ]"#,
        )
        .unwrap();
        let report = run_batch(&inputs, &batch_config(2)).unwrap();

        assert_eq!(report.total_problems, 4);
        assert_eq!(report.statistics.error_problems, 2);
        assert_eq!(report.statistics.problems_with_solution, 2);
        for bad in &report.results[1..3] {
            assert_eq!(bad.status, InstanceStatus::Error);
            assert!(bad.instance.is_none());
            assert!(bad.error.as_deref().unwrap().starts_with("not an instance record"));
        }
        assert!(report.results[0].has_solution());
        assert!(report.results[3].has_solution());
    }

    #[test]
    fn test_results_keep_input_order() {
        let specs = sample_specs();
        let report = run_batch(&specs, &batch_config(4)).unwrap();
        for (i, result) in report.results.iter().enumerate() {
            assert_eq!(result.index, i);
            assert_eq!(result.instance.as_ref(), Some(&specs[i]));
        }
    }

    #[test]
    fn test_found_results_replay() {
        let report = run_batch(&sample_specs(), &batch_config(2)).unwrap();
        for result in report.results.iter().filter(|r| r.has_solution()) {
            let instance = Instance::try_from(result.instance.clone().unwrap()).unwrap();
            let sequence = result.outcome.as_ref().and_then(SearchOutcome::sequence).unwrap();
            assert!(crate::executor::verify_solution(&instance, sequence).is_ok());
        }
    }

    #[test]
    fn test_timeouts_are_reported_separately() {
        let config = BatchConfig {
            concurrency: 2,
            solver: SolverConfig {
                time_limit: Duration::ZERO,
                ..Default::default()
            },
            ..Default::default()
        };
        let specs = vec![
            InstanceSpec::from_pairs(&[("a", "aa"), ("aa", "a")]),
            InstanceSpec::from_pairs(&[]),
        ];
        let report = run_batch(&specs, &config).unwrap();
        assert_eq!(report.results[0].status, InstanceStatus::Timeout);
        assert!(report.results[0].evaluation.is_none());
        assert_eq!(report.statistics.timeout_problems, 1);
        assert_eq!(report.statistics.error_problems, 1);
        assert_eq!(report.statistics.success_rate, 0.0);
    }

    #[test]
    fn test_solution_statistics() {
        let report = run_batch(&sample_specs(), &batch_config(1)).unwrap();
        let sol = report.statistics.solution_statistics.as_ref().unwrap();
        assert!(sol.min_solution_length >= 1);
        assert!(sol.min_solution_length <= sol.max_solution_length);
        assert!(sol.avg_quality_score > 0.0 && sol.avg_quality_score <= 1.0);
        assert!(sol.high_quality_problems <= report.statistics.problems_with_solution);
    }

    #[test]
    fn test_empty_batch() {
        let report = run_batch::<InstanceSpec>(&[], &BatchConfig::default()).unwrap();
        assert_eq!(report.total_problems, 0);
        assert_eq!(report.statistics.success_rate, 0.0);
        assert!(report.statistics.solution_statistics.is_none());
    }

    #[test]
    fn test_quality_filter() {
        let report = run_batch(&sample_specs(), &batch_config(2)).unwrap();
        let all_found = report.quality_at_least(0.0);
        assert_eq!(all_found.len(), report.statistics.problems_with_solution);
        assert!(report.quality_at_least(1.1).is_empty());
    }

    #[test]
    fn test_report_serializes() {
        let report = run_batch(&sample_specs(), &batch_config(2)).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["results"][2]["status"], "error");
        assert_eq!(json["statistics"]["error_problems"], 1);
    }
}
