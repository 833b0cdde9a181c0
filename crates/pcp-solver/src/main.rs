//! CLI entry point for the PCP solver.
//!
//! Usage:
//!   pcp-solver solve <instance.json> [options]
//!   pcp-solver verify <instance.json> --sequence 0,1
//!   pcp-solver batch <instances.json> [options]
//!   pcp-solver enumerate [options]
//!
//! Instances are JSON objects:
//!   {"dominoes": [["a", "aa"], ["aa", "a"]], "initial_top": "", "initial_bottom": ""}
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, ensure, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::error;

use pcp_solver::enumerate::{self, EnumerationConfig};
use pcp_solver::logger::init_cli_logger;
use pcp_solver::{
    run_batch, score, solve, verify_solution, BatchConfig, BatchStatistics, Difficulty,
    Evaluation, Instance, InstanceReport, MoveOrdering, ProblemSet, SolverConfig,
};

#[derive(Parser)]
#[command(name = "pcp-solver")]
#[command(about = "Bounded solver and batch evaluator for Post Correspondence Problem instances")]
#[command(version)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Search bounds shared by every subcommand that solves
#[derive(clap::Args, Debug, Clone)]
struct SearchArgs {
    /// Maximum number of dominoes in a solution
    #[arg(long, default_value = "20")]
    max_depth: usize,

    /// Time limit per instance in seconds
    #[arg(long, default_value = "5.0")]
    timeout: f64,

    /// Order moves by length convergence instead of declaration order
    #[arg(long)]
    heuristic: bool,
}

impl SearchArgs {
    fn solver_config(&self) -> anyhow::Result<SolverConfig> {
        ensure!(self.max_depth > 0, "--max-depth must be positive");
        ensure!(self.timeout > 0.0, "--timeout must be positive");
        let time_limit = Duration::try_from_secs_f64(self.timeout)
            .with_context(|| format!("invalid timeout {}", self.timeout))?;

        Ok(SolverConfig {
            max_depth: self.max_depth,
            time_limit,
            ordering: if self.heuristic {
                MoveOrdering::LengthConvergence
            } else {
                MoveOrdering::Declaration
            },
        })
    }

    /// Batch settings for the subcommands that run a worker pool
    fn batch_config(
        &self,
        concurrency: usize,
        show_progress: bool,
    ) -> anyhow::Result<BatchConfig> {
        ensure!(concurrency > 0, "--concurrency must be positive");
        Ok(BatchConfig {
            concurrency,
            show_progress,
            solver: self.solver_config()?,
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(arg: DifficultyArg) -> Self {
        match arg {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Medium => Difficulty::Medium,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a solution of one instance
    Solve {
        /// Path to instance JSON file (use --stdin to read from stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Read instance from stdin instead of file
        #[arg(long)]
        stdin: bool,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// Check a candidate sequence against an instance
    Verify {
        /// Path to instance JSON file (use --stdin to read from stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Read instance from stdin instead of file
        #[arg(long)]
        stdin: bool,

        /// Comma-separated domino indices
        #[arg(long, value_delimiter = ',')]
        sequence: Vec<usize>,
    },

    /// Solve and score a JSON array of instances in parallel
    Batch {
        /// Path to a JSON array of instances (use --stdin to read from stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Read instances from stdin instead of file
        #[arg(long)]
        stdin: bool,

        #[command(flatten)]
        search: SearchArgs,

        /// Number of worker threads
        #[arg(long, default_value = "4")]
        concurrency: usize,

        /// Log progress while the batch runs
        #[arg(long)]
        progress: bool,

        /// Only print results with at least this quality score
        #[arg(long)]
        min_quality: Option<f64>,

        /// Save the results as a problem set at this path
        #[arg(long, value_name = "PATH")]
        save_set: Option<PathBuf>,

        /// Problem set name
        #[arg(long, default_value = "batch")]
        set_name: String,

        /// Problem set difficulty label
        #[arg(long, value_enum, default_value = "medium")]
        difficulty: DifficultyArg,

        /// Problem set theme label
        #[arg(long, default_value = "alphabet")]
        theme: String,
    },

    /// Enumerate small instances, solve them and pick a balanced selection
    Enumerate {
        /// Symbols to build strings from
        #[arg(long, default_value = "ST")]
        alphabet: String,

        /// Smallest number of dominoes per instance
        #[arg(long, default_value = "2")]
        min_dominoes: usize,

        /// Largest number of dominoes per instance
        #[arg(long, default_value = "3")]
        max_dominoes: usize,

        /// Maximum length of each domino half
        #[arg(long, default_value = "2")]
        max_len: usize,

        /// Maximum combined length of the initial strings
        #[arg(long, default_value = "0")]
        max_initial_len: usize,

        /// Maximum number of candidates to solve
        #[arg(long, default_value = "100")]
        sample_limit: usize,

        /// Keep sets containing a domino with equal halves
        #[arg(long)]
        keep_trivial: bool,

        /// Number of instances to select
        #[arg(long, default_value = "15")]
        target: usize,

        #[command(flatten)]
        search: SearchArgs,

        /// Number of worker threads
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },
}

/// Output format for a single solve
#[derive(Debug, Serialize)]
struct SolveOutput {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bottom: Option<String>,
    states_explored: usize,
    roots_explored: usize,
    time_elapsed_ms: u64,
    evaluation: Evaluation,
}

/// Output format for verification
#[derive(Debug, Serialize)]
struct VerifyOutput {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    string: Option<String>,
}

/// Output format for enumeration
#[derive(Debug, Serialize)]
struct EnumerateOutput {
    candidates_found: usize,
    easy_found: usize,
    medium_found: usize,
    hard_found: usize,
    selected_total: usize,
    avg_quality: f64,
    problems: Vec<InstanceReport>,
}

/// Output format for a batch, possibly quality-filtered
#[derive(Debug, Serialize)]
struct BatchOutput<'a> {
    total_problems: usize,
    statistics: &'a BatchStatistics,
    processing_time: f64,
    results: Vec<&'a InstanceReport>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_cli_logger(cli.verbose);

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run a subcommand; `Ok(false)` means it ran but did not succeed
fn run(command: Commands) -> anyhow::Result<bool> {
    match command {
        Commands::Solve {
            file,
            stdin,
            search,
        } => {
            let config = search.solver_config()?;
            let instance: Instance = parse_json(&read_input(file, stdin)?, "instance")?;

            let result = solve(&instance, &config);
            let evaluation = score(&instance, &result.outcome, result.time_elapsed);
            let solution = result.solution(&instance);

            let output = SolveOutput {
                outcome: result.outcome.label(),
                sequence: result.outcome.sequence().map(<[usize]>::to_vec),
                top: solution.as_ref().map(|s| s.top().to_string()),
                bottom: solution.as_ref().map(|s| s.bottom().to_string()),
                states_explored: result.states_explored,
                roots_explored: result.roots_explored,
                time_elapsed_ms: result.time_elapsed_ms(),
                evaluation,
            };
            print_json(&output)?;
            Ok(result.outcome.is_found())
        }

        Commands::Verify {
            file,
            stdin,
            sequence,
        } => {
            let instance: Instance = parse_json(&read_input(file, stdin)?, "instance")?;

            let output = match verify_solution(&instance, &sequence) {
                Ok(replay) => VerifyOutput {
                    valid: true,
                    reason: None,
                    string: Some(replay.top),
                },
                Err(e) => VerifyOutput {
                    valid: false,
                    reason: Some(e.to_string()),
                    string: None,
                },
            };
            print_json(&output)?;
            Ok(output.valid)
        }

        Commands::Batch {
            file,
            stdin,
            search,
            concurrency,
            progress,
            min_quality,
            save_set,
            set_name,
            difficulty,
            theme,
        } => {
            let config = search.batch_config(concurrency, progress)?;
            // Entries are decoded one by one so a bad entry is reported, not fatal
            let entries: Vec<serde_json::Value> =
                parse_json(&read_input(file, stdin)?, "instance list")?;

            let report = run_batch(&entries, &config)?;

            if let Some(path) = save_set {
                ProblemSet::from_report(set_name, difficulty.into(), theme, &report)
                    .save(&path)
                    .with_context(|| format!("failed to save problem set to {}", path.display()))?;
            }

            let results = match min_quality {
                Some(min) => report.quality_at_least(min),
                None => report.results.iter().collect(),
            };
            print_json(&BatchOutput {
                total_problems: report.total_problems,
                statistics: &report.statistics,
                processing_time: report.processing_time,
                results,
            })?;
            Ok(report.statistics.error_problems == 0)
        }

        Commands::Enumerate {
            alphabet,
            min_dominoes,
            max_dominoes,
            max_len,
            max_initial_len,
            sample_limit,
            keep_trivial,
            target,
            search,
            concurrency,
        } => {
            ensure!(!alphabet.is_empty(), "--alphabet must not be empty");
            let batch = search.batch_config(concurrency, false)?;
            if min_dominoes == 0 || min_dominoes > max_dominoes {
                bail!("invalid domino count range {}..={}", min_dominoes, max_dominoes);
            }

            let config = EnumerationConfig {
                alphabet: alphabet.chars().collect(),
                domino_counts: min_dominoes..=max_dominoes,
                max_string_len: max_len,
                max_initial_len,
                sample_limit,
                skip_trivial: !keep_trivial,
            };

            let found = enumerate::search(&config, &batch)?;
            let count = |d: Difficulty| {
                found
                    .iter()
                    .filter(|r| r.evaluation.as_ref().is_some_and(|e| e.difficulty == d))
                    .count()
            };
            let (easy_found, medium_found, hard_found) = (
                count(Difficulty::Easy),
                count(Difficulty::Medium),
                count(Difficulty::Hard),
            );
            let candidates_found = found.len();

            let problems = enumerate::select_balanced(found, target);
            let avg_quality = if problems.is_empty() {
                0.0
            } else {
                problems.iter().filter_map(InstanceReport::quality).sum::<f64>()
                    / problems.len() as f64
            };

            print_json(&EnumerateOutput {
                candidates_found,
                easy_found,
                medium_found,
                hard_found,
                selected_total: problems.len(),
                avg_quality,
                problems,
            })?;
            Ok(candidates_found > 0)
        }
    }
}

fn read_input(file: Option<PathBuf>, stdin: bool) -> anyhow::Result<String> {
    if stdin {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read from stdin")?;
        Ok(buffer)
    } else if let Some(path) = file {
        fs::read_to_string(&path).with_context(|| format!("failed to read file {}", path.display()))
    } else {
        bail!("must provide either a file path or --stdin")
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(content: &str, what: &str) -> anyhow::Result<T> {
    serde_json::from_str(content).with_context(|| format!("error parsing {} JSON", what))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
