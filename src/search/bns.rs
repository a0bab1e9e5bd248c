//! Best-Node-Search.
//!
//! Instead of computing the value of every root action, BNS only tries to separate the best action from the rest. Each iteration picks a test value, checks every root child against it with a zero-window search, and narrows the `[alpha, beta]` bracket based on how many children passed.
//! The returned score is only a lower bound on the best action's value, so it is not a substitute for a full alpha-beta search when the exact value matters.

use num_traits::{NumCast, ToPrimitive};

use crate::search::alpha_beta::Searcher;
use crate::search::game::Game;
use crate::search::hooks::SearchHooks;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BnsOutcome<U> {
    /// Index of the chosen action in the list that was searched.
    pub best: usize,
    /// Lower bound on the chosen action's value.
    pub value: U,
}

/// The next test value for a bracket `[alpha, beta]` with `subtree_count` candidate children.
pub fn next_guess(alpha: i64, beta: i64, subtree_count: usize) -> i64 {
    if subtree_count <= 1 {
        return alpha + (beta - alpha) / 2;
    }
    let n = subtree_count as i64;
    alpha + ((beta - alpha) * (n - 1)).div_euclid(n)
}

/// Runs one Best-Node-Search over the root's children, each searched `depth - 1` plies deep.
///
/// Returns `None` if the deadline passed before the bracket converged.
pub fn best_node_search<G: Game, H: SearchHooks<G>>(
    searcher: &Searcher<G, H>,
    state: &G::State,
    actions: &[G::Action],
    depth: u16,
) -> Option<BnsOutcome<G::Utility>> {
    if actions.is_empty() {
        return None;
    }
    let game = searcher.game;
    let children: Vec<G::State> = actions
        .iter()
        .map(|action| game.result(state, action))
        .collect();

    let mut alpha = game.util_min().to_i64()?;
    let mut beta = game.util_max().to_i64()?;
    let mut best = 0;

    while beta - alpha >= 2 {
        if searcher.timer.is_time_out() {
            return None;
        }
        let test = next_guess(alpha, beta, children.len());
        let test_utility = <G::Utility as NumCast>::from(test)?;
        let window_bottom = <G::Utility as NumCast>::from(test - 1)?;

        let mut successes = 0;
        let mut first_success = None;
        for (i, child) in children.iter().enumerate() {
            let value =
                searcher.alpha_beta(child, window_bottom, test_utility, depth.saturating_sub(1), false);
            if searcher.timer.is_time_out() {
                return None;
            }
            if value >= test_utility {
                successes += 1;
                first_success.get_or_insert(i);
            }
        }

        if successes == 0 {
            beta = test - 1;
        } else {
            alpha = test;
            if let Some(first_success) = first_success {
                best = first_success;
            }
        }
        log::trace!(
            "BNS test {}: {} successes, bracket [{}, {}]",
            test,
            successes,
            alpha,
            beta
        );
    }

    Some(BnsOutcome {
        best,
        value: <G::Utility as NumCast>::from(alpha)?,
    })
}

#[test]
fn next_guess_test() {
    assert_eq!(next_guess(0, 100, 1), 50);
    assert_eq!(next_guess(0, 100, 2), 50);
    assert_eq!(next_guess(0, 100, 4), 75);
    assert_eq!(next_guess(-1000, 1000, 3), 333);
    assert_eq!(next_guess(-1000, -990, 5), -992);
}
