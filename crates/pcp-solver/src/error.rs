//! Error types for instance construction, solution verification and batch runs.

use thiserror::Error;

/// Why an instance could not be constructed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstanceError {
    #[error("domino set is empty")]
    NoDominoes,

    #[error("domino {index} has empty top and bottom strings")]
    EmptyDomino { index: usize },

    #[error("domino {index} must be a (top, bottom) pair, got {parts} part(s)")]
    MalformedDomino { index: usize, parts: usize },

    #[error("not an instance record: {reason}")]
    InvalidEntry { reason: String },
}

/// Why a candidate sequence is not a solution of an instance
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("domino index {index} at position {position} is out of range [0, {domino_count})")]
    IndexOutOfRange {
        position: usize,
        index: usize,
        domino_count: usize,
    },

    #[error("strings do not match: '{top}' != '{bottom}'")]
    Mismatch { top: String, bottom: String },

    #[error("empty sequence with no initial strings produces an empty match")]
    EmptyMatch,
}

/// Failure to set up a batch run
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid instance: {0}")]
    Instance(#[from] InstanceError),

    #[error("Invalid solution: {0}")]
    Verification(#[from] VerificationError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
