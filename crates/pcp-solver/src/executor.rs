//! Sequence replay over an instance.
//!
//! Replaying appends each chosen domino's top and bottom parts to the
//! instance's initial strings, in order.

use crate::error::VerificationError;
use crate::instance::Instance;

/// Strings produced by replaying a sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub top: String,
    pub bottom: String,
    /// Number of dominoes applied
    pub steps: usize,
}

impl ExecutionResult {
    /// Top and bottom are equal and nonempty
    pub fn is_match(&self) -> bool {
        self.top == self.bottom && !self.top.is_empty()
    }
}

/// Replay a sequence over the instance's initial strings.
///
/// Fails on the first index outside `[0, domino_count)`.
pub fn execute(instance: &Instance, sequence: &[usize]) -> Result<ExecutionResult, VerificationError> {
    let mut top = instance.initial_top().to_string();
    let mut bottom = instance.initial_bottom().to_string();

    for (position, &index) in sequence.iter().enumerate() {
        let domino = instance
            .get_domino(index)
            .ok_or(VerificationError::IndexOutOfRange {
                position,
                index,
                domino_count: instance.domino_count(),
            })?;
        top.push_str(&domino.top);
        bottom.push_str(&domino.bottom);
    }

    Ok(ExecutionResult {
        top,
        bottom,
        steps: sequence.len(),
    })
}

/// Check that a sequence solves the instance.
///
/// Returns the replayed strings on success, or the reason the sequence
/// is not a solution.
pub fn verify_solution(
    instance: &Instance,
    sequence: &[usize],
) -> Result<ExecutionResult, VerificationError> {
    if sequence.is_empty() && !instance.has_initial_strings() {
        return Err(VerificationError::EmptyMatch);
    }

    let result = execute(instance, sequence)?;
    if result.top != result.bottom {
        return Err(VerificationError::Mismatch {
            top: result.top,
            bottom: result.bottom,
        });
    }
    if result.top.is_empty() {
        return Err(VerificationError::EmptyMatch);
    }

    Ok(result)
}
