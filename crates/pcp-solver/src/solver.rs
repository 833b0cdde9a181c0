//! Bounded backtracking search for PCP solutions.
//!
//! The search is a depth-first walk over (top, bottom) states driven by an
//! explicit frame stack, so `max_depth` is not limited by the native stack.
//! States are pruned as soon as the two strings diverge, and a path-local
//! visited set keeps a single path from revisiting a state. The wall clock
//! is polled at every state expansion.
//!
//! When the instance has no initial strings, each domino is explored as a
//! separate root in turn and the search returns from the first root that
//! finds a match.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::instance::{symbol_gap, Instance, Solution};
use crate::pruning::{can_extend, is_accepting, is_length_infeasible, order_moves, MoveOrdering, Moves};

/// Configuration for the solver
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum number of dominoes in a solution
    pub max_depth: usize,
    /// Wall-clock budget for one `solve` call
    pub time_limit: Duration,
    /// Candidate ordering at each branch
    pub ordering: MoveOrdering,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_depth: 20,
            time_limit: Duration::from_secs(5),
            ordering: MoveOrdering::Declaration,
        }
    }
}

/// Outcome of a bounded search.
///
/// `Exhausted` and `TimedOut` are both inconclusive: neither proves the
/// instance has no solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "sequence", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// A matching sequence of domino indices
    Found(Vec<usize>),
    /// Every path within the depth bound was explored without a match
    Exhausted,
    /// The time limit was reached before the search finished
    TimedOut,
}

impl SearchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }

    pub fn sequence(&self) -> Option<&[usize]> {
        match self {
            SearchOutcome::Found(sequence) => Some(sequence),
            _ => None,
        }
    }

    pub fn into_sequence(self) -> Option<Vec<usize>> {
        match self {
            SearchOutcome::Found(sequence) => Some(sequence),
            _ => None,
        }
    }

    /// Short label used in logs and reports
    pub fn label(&self) -> &'static str {
        match self {
            SearchOutcome::Found(_) => "found",
            SearchOutcome::Exhausted => "exhausted",
            SearchOutcome::TimedOut => "timed_out",
        }
    }
}

/// Result of the solver search
#[derive(Debug, Clone)]
pub struct SolverResult {
    pub outcome: SearchOutcome,
    /// Number of states expanded
    pub states_explored: usize,
    /// Number of root explorations started
    pub roots_explored: usize,
    pub time_elapsed: Duration,
}

impl SolverResult {
    /// Verified solution, if the search found one
    pub fn solution<'a>(&self, instance: &'a Instance) -> Option<Solution<'a>> {
        let sequence = self.outcome.sequence()?;
        Solution::new(instance, sequence.to_vec()).ok()
    }

    pub fn time_elapsed_ms(&self) -> u64 {
        self.time_elapsed.as_millis() as u64
    }
}

/// A state on the current search path and the cursor over its children
#[derive(Debug)]
struct SearchFrame {
    top: String,
    bottom: String,
    /// Symbols by which `top` leads `bottom`
    gap: isize,
    depth: usize,
    /// Domino that led here; `None` for the root of an exploration
    via: Option<usize>,
    moves: Moves,
    cursor: usize,
}

/// What happened when a state was entered
enum Step {
    Found,
    TimedOut,
    Pushed,
    Rejected,
}

/// Mutable bookkeeping shared by all roots of one `solve` call
struct Search<'a> {
    instance: &'a Instance,
    config: &'a SolverConfig,
    started: Instant,
    states_explored: usize,
    roots_explored: usize,
}

impl<'a> Search<'a> {
    fn new(instance: &'a Instance, config: &'a SolverConfig) -> Self {
        Self {
            instance,
            config,
            started: Instant::now(),
            states_explored: 0,
            roots_explored: 0,
        }
    }

    fn timed_out(&self) -> bool {
        self.started.elapsed() >= self.config.time_limit
    }

    /// Explore everything reachable from one root state.
    ///
    /// `path` holds the moves already taken to reach the root; it is
    /// extended and restored in place as frames are pushed and popped.
    fn explore(&mut self, path: &mut Vec<usize>, top: String, bottom: String) -> SearchOutcome {
        self.roots_explored += 1;

        let mut visited: HashSet<(String, String)> = HashSet::new();
        let mut stack: Vec<SearchFrame> = Vec::new();
        let root_depth = path.len();
        let root_gap = symbol_gap(&top, &bottom);

        match self.enter(&mut stack, &mut visited, path, (top, bottom), root_gap, root_depth, None) {
            Step::Found => return SearchOutcome::Found(path.clone()),
            Step::TimedOut => return SearchOutcome::TimedOut,
            Step::Pushed | Step::Rejected => {}
        }

        while let Some(frame) = stack.last_mut() {
            if frame.cursor == frame.moves.len() {
                // All children tried: backtrack
                if let Some(frame) = stack.pop() {
                    if frame.via.is_some() {
                        path.pop();
                    }
                    visited.remove(&(frame.top, frame.bottom));
                }
                continue;
            }

            let index = frame.moves[frame.cursor];
            frame.cursor += 1;

            let domino = &self.instance.dominoes()[index];
            let mut top = String::with_capacity(frame.top.len() + domino.top.len());
            top.push_str(&frame.top);
            top.push_str(&domino.top);
            let mut bottom = String::with_capacity(frame.bottom.len() + domino.bottom.len());
            bottom.push_str(&frame.bottom);
            bottom.push_str(&domino.bottom);
            let gap = frame.gap + self.instance.length_deltas()[index];
            let depth = frame.depth + 1;

            path.push(index);
            match self.enter(&mut stack, &mut visited, path, (top, bottom), gap, depth, Some(index)) {
                Step::Found => return SearchOutcome::Found(path.clone()),
                Step::TimedOut => return SearchOutcome::TimedOut,
                Step::Pushed => {}
                Step::Rejected => {
                    path.pop();
                }
            }
        }

        SearchOutcome::Exhausted
    }

    /// Expand a state: accept it, reject it, or push a frame for its children
    #[allow(clippy::too_many_arguments)]
    fn enter(
        &mut self,
        stack: &mut Vec<SearchFrame>,
        visited: &mut HashSet<(String, String)>,
        path: &[usize],
        state: (String, String),
        gap: isize,
        depth: usize,
        via: Option<usize>,
    ) -> Step {
        if self.timed_out() {
            return Step::TimedOut;
        }
        self.states_explored += 1;

        let (top, bottom) = (&state.0, &state.1);
        if is_accepting(top, bottom) {
            debug!(length = path.len(), "match found");
            return Step::Found;
        }
        if depth >= self.config.max_depth {
            return Step::Rejected;
        }
        if !can_extend(top, bottom) {
            return Step::Rejected;
        }
        if visited.contains(&state) {
            return Step::Rejected;
        }

        let moves = order_moves(self.instance, gap, self.config.ordering);
        visited.insert(state.clone());
        let (top, bottom) = state;
        stack.push(SearchFrame {
            top,
            bottom,
            gap,
            depth,
            via,
            moves,
            cursor: 0,
        });
        Step::Pushed
    }

    fn finish(&self, outcome: SearchOutcome) -> SolverResult {
        let result = SolverResult {
            outcome,
            states_explored: self.states_explored,
            roots_explored: self.roots_explored,
            time_elapsed: self.started.elapsed(),
        };
        debug!(
            outcome = result.outcome.label(),
            states = result.states_explored,
            roots = result.roots_explored,
            elapsed_ms = result.time_elapsed_ms(),
            "search finished"
        );
        result
    }
}

/// Search for a sequence of dominoes whose top and bottom strings match.
///
/// Returns `Found([])` immediately when the initial strings already match.
pub fn solve(instance: &Instance, config: &SolverConfig) -> SolverResult {
    let mut search = Search::new(instance, config);
    let initial_top = instance.initial_top();
    let initial_bottom = instance.initial_bottom();

    if is_accepting(initial_top, initial_bottom) {
        return search.finish(SearchOutcome::Found(Vec::new()));
    }

    if is_length_infeasible(instance) {
        debug!("dominoes can never balance string lengths");
        return search.finish(SearchOutcome::Exhausted);
    }

    let mut path = Vec::new();

    if instance.has_initial_strings() {
        let outcome = search.explore(&mut path, initial_top.to_string(), initial_bottom.to_string());
        return search.finish(outcome);
    }

    // The first move is unconstrained: try each domino as its own root
    if config.max_depth == 0 {
        return search.finish(SearchOutcome::Exhausted);
    }
    for index in order_moves(instance, 0, config.ordering) {
        let domino = &instance.dominoes()[index];
        debug!(root = index, "exploring root");

        path.clear();
        path.push(index);
        let outcome = search.explore(&mut path, domino.top.clone(), domino.bottom.clone());
        match outcome {
            SearchOutcome::Exhausted => continue,
            found_or_timed_out => return search.finish(found_or_timed_out),
        }
    }

    search.finish(SearchOutcome::Exhausted)
}
