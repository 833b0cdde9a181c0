//! Bounded solver for the Post Correspondence Problem.
//!
//! This crate searches for a sequence of dominoes whose concatenated top
//! and bottom strings match, within a depth bound and a time limit. A
//! negative result only means nothing was found within those bounds.
//! It also scores instances as puzzles and evaluates many instances in
//! parallel.

pub mod batch;
pub mod enumerate;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod instance;
pub mod logger;
pub mod problem_set;
pub mod pruning;
pub mod solver;

// Re-export main types
pub use batch::{
    run_batch, BatchConfig, BatchInput, BatchReport, BatchStatistics, InstanceReport, InstanceStatus,
    SolutionStatistics,
};
pub use error::{BatchError, Error, InstanceError, Result, VerificationError};
pub use evaluator::{score, Difficulty, Evaluation};
pub use executor::{execute, verify_solution, ExecutionResult};
pub use instance::{Domino, Instance, InstanceSpec, Solution, SolutionRecord};
pub use problem_set::ProblemSet;
pub use pruning::MoveOrdering;
pub use solver::{solve, SearchOutcome, SolverConfig, SolverResult};
