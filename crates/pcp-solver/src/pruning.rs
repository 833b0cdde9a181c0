//! Search space pruning rules and move ordering.
//!
//! Dominoes only append, so a state whose top and bottom strings have
//! diverged (neither is a prefix of the other) can never be reconciled.

use smallvec::SmallVec;

use crate::instance::Instance;

/// Candidate moves at one branch point
pub type Moves = SmallVec<[usize; 8]>;

/// How candidate dominoes are ordered at each branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveOrdering {
    /// Domino declaration order
    #[default]
    Declaration,
    /// Ascending symbol length difference after the move; ties keep declaration order
    LengthConvergence,
}

/// Top and bottom are equal and nonempty
pub fn is_accepting(top: &str, bottom: &str) -> bool {
    !top.is_empty() && top == bottom
}

/// One string is a prefix of the other, so appending may still reconcile them
pub fn can_extend(top: &str, bottom: &str) -> bool {
    top.starts_with(bottom) || bottom.starts_with(top)
}

/// Check whether the instance can never produce a match by length alone.
///
/// If every domino strictly lengthens the same side and that side is
/// already at least as long, the strings can never become equal once a
/// domino has been placed.
pub fn is_length_infeasible(instance: &Instance) -> bool {
    let initial_delta = instance.initial_gap();
    let deltas = instance.length_deltas();

    let all_top_longer = deltas.iter().all(|&d| d > 0);
    let all_bottom_longer = deltas.iter().all(|&d| d < 0);

    (all_top_longer && initial_delta >= 0) || (all_bottom_longer && initial_delta <= 0)
}

/// Order the dominoes to try from a state whose top string leads the
/// bottom string by `gap` symbols
pub fn order_moves(instance: &Instance, gap: isize, ordering: MoveOrdering) -> Moves {
    let mut moves: Moves = (0..instance.domino_count()).collect();

    if ordering == MoveOrdering::LengthConvergence {
        let deltas = instance.length_deltas();
        // sort_by_key is stable, so ties stay in declaration order
        moves.sort_by_key(|&i| (gap + deltas[i]).unsigned_abs());
    }

    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Domino;

    #[test]
    fn test_accepting_requires_nonempty() {
        assert!(is_accepting("ab", "ab"));
        assert!(!is_accepting("", ""));
        assert!(!is_accepting("ab", "a"));
    }

    #[test]
    fn test_prefix_states_can_extend() {
        assert!(can_extend("", ""));
        assert!(can_extend("", "abc"));
        assert!(can_extend("abc", "ab"));
        assert!(!can_extend("abc", "abd"));
        assert!(!can_extend("b", "a"));
    }

    #[test]
    fn test_length_infeasible_when_top_always_longer() {
        let instance = Instance::from_pairs(&[("aa", "a"), ("bab", "b")]).unwrap();
        assert!(is_length_infeasible(&instance));
    }

    #[test]
    fn test_length_feasible_with_balanced_dominoes() {
        let instance = Instance::from_pairs(&[("a", "aa"), ("aa", "a")]).unwrap();
        assert!(!is_length_infeasible(&instance));

        let equal = Instance::from_pairs(&[("a", "a")]).unwrap();
        assert!(!is_length_infeasible(&equal));
    }

    #[test]
    fn test_initial_strings_can_restore_feasibility() {
        let instance = Instance::new(vec![Domino::new("aa", "a")], "", "aa").unwrap();
        assert!(!is_length_infeasible(&instance));
    }

    #[test]
    fn test_declaration_order() {
        let instance = Instance::from_pairs(&[("abc", "a"), ("a", "a"), ("b", "bb")]).unwrap();
        let moves = order_moves(&instance, 0, MoveOrdering::Declaration);
        assert_eq!(moves.as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn test_length_convergence_order() {
        let instance = Instance::from_pairs(&[("abc", "a"), ("a", "a"), ("b", "bb")]).unwrap();
        // From an empty state: deltas 2, 0, 1
        let moves = order_moves(&instance, 0, MoveOrdering::LengthConvergence);
        assert_eq!(moves.as_slice(), &[1, 2, 0]);

        // Bottom ahead by two: |-2+2|=0, |-2|=2, |-3|=3
        let moves = order_moves(&instance, -2, MoveOrdering::LengthConvergence);
        assert_eq!(moves.as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn test_length_convergence_counts_symbols_not_bytes() {
        // "éé" is four bytes but two symbols: deltas 1 and 2
        let instance = Instance::from_pairs(&[("éé", "a"), ("abc", "a")]).unwrap();
        let moves = order_moves(&instance, 0, MoveOrdering::LengthConvergence);
        assert_eq!(moves.as_slice(), &[0, 1]);
    }

    #[test]
    fn test_length_infeasible_with_multibyte_symbols() {
        // Bottom gains one symbol per domino despite having fewer bytes
        let instance = Instance::from_pairs(&[("éé", "abc"), ("ü", "ab")]).unwrap();
        assert!(is_length_infeasible(&instance));
    }
}
