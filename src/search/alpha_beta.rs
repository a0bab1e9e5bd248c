//! The recursive core shared by every search variant.
//!
//! A `Searcher` is bound to one iterative-deepening round. It is cheap to construct, and holds only references, so every parallel worker can share one.
//! All scores are from the root player's point of view: max nodes are the root player's turns.

use std::sync::atomic::{AtomicBool, Ordering};

use num_traits::One;

use crate::search::game::{Game, ZobristHash};
use crate::search::hooks::SearchHooks;
use crate::search::metrics::Metrics;
use crate::search::quiescence::Quiescence;
use crate::search::timer::Timer;
use crate::search::tt::{Bound, TranspositionTable};

pub struct Searcher<'a, G: Game, H> {
    pub(crate) game: &'a G,
    pub(crate) hooks: &'a H,
    pub(crate) timer: &'a Timer,
    pub(crate) metrics: &'a Metrics,
    pub(crate) table: Option<&'a TranspositionTable<G::Utility>>,
    pub(crate) player: G::Player,
    /// Depth of the current round, counted from the root.
    pub(crate) depth_limit: u16,
    pub(crate) quiescence_depth: u16,
    /// Set whenever a non-terminal state is scored heuristically during the round.
    pub(crate) heuristic_used: &'a AtomicBool,
}

impl<'a, G: Game, H: SearchHooks<G>> Searcher<'a, G, H> {
    fn eval(&self, state: &G::State) -> G::Utility {
        self.heuristic_used.store(true, Ordering::Relaxed);
        self.hooks.eval(self.game, state, self.player)
    }

    fn eval_terminal(&self, state: &G::State, depth: u16) -> G::Utility {
        self.hooks.eval_terminal(
            self.game,
            state,
            self.player,
            self.depth_limit.saturating_sub(depth),
        )
    }

    fn eval_horizon(&self, state: &G::State, alpha: G::Utility, beta: G::Utility, maximizing: bool) -> G::Utility {
        if self.quiescence_depth == 0 {
            return self.eval(state);
        }
        let quiescence = Quiescence::new(
            self.game,
            self.depth_limit,
            |state: &G::State, _player: G::Player| self.eval(state),
            |state: &G::State, player: G::Player, distance: u16| {
                self.hooks.eval_terminal(self.game, state, player, distance)
            },
            || self.timer.is_time_out(),
        );
        if maximizing {
            quiescence.q_max(state, self.player, alpha, beta, self.quiescence_depth)
        } else {
            quiescence.q_min(state, self.player, alpha, beta, self.quiescence_depth)
        }
    }

    /// The score the side to move is guaranteed not to do worse than.
    fn worst_for_mover(&self, maximizing: bool) -> G::Utility {
        if maximizing {
            self.game.util_min()
        } else {
            self.game.util_max()
        }
    }

    /// Full-width minimax without pruning, table or deadline.
    pub fn minimax(&self, state: &G::State, depth: u16, maximizing: bool) -> G::Utility {
        self.metrics.increment_nodes();
        if self.game.is_terminal(state) {
            return self.eval_terminal(state, depth);
        }
        if depth == 0 {
            return self.eval(state);
        }
        let actions = self.game.actions(state);
        if actions.is_empty() {
            return self.eval_terminal(state, depth);
        }
        let values = actions
            .iter()
            .map(|action| self.minimax(&self.game.result(state, action), depth - 1, !maximizing));
        if maximizing {
            values.max().unwrap_or_else(|| self.game.util_min())
        } else {
            values.min().unwrap_or_else(|| self.game.util_max())
        }
    }

    /// Fail-soft alpha-beta search of `state`, `depth` plies deep.
    ///
    /// When the deadline has passed, returns the worst possible score for the side to move, which the caller must treat as meaningless.
    pub fn alpha_beta(
        &self,
        state: &G::State,
        alpha: G::Utility,
        beta: G::Utility,
        depth: u16,
        maximizing: bool,
    ) -> G::Utility {
        self.metrics.increment_nodes();
        self.metrics
            .record_depth(self.depth_limit.saturating_sub(depth));

        if self.game.is_terminal(state) {
            return self.eval_terminal(state, depth);
        }
        if self.timer.is_time_out() {
            return self.worst_for_mover(maximizing);
        }

        let hash = state.zobrist_hash();
        let mut hint = None;
        if let Some(table) = self.table {
            let (value, stored_hint) = table.probe_with_hint(hash, alpha, beta, depth);
            let hit = value != self.game.util_unknown();
            self.metrics.record_probe(hit);
            if hit {
                return value;
            }
            hint = stored_hint;
        }

        if depth == 0 {
            return self.eval_horizon(state, alpha, beta, maximizing);
        }

        let mut actions = self.game.actions(state);
        if actions.is_empty() {
            return self.eval_terminal(state, depth);
        }
        // Hints index into generation order, which the hooks may shuffle
        let generated = self.table.map(|_| actions.clone());
        self.hooks
            .order_actions(self.game, state, &mut actions, self.player, depth);
        if let (Some(hint), Some(generated)) = (hint, &generated) {
            if let Some(hinted) = generated.get(hint as usize) {
                if let Some(position) = actions.iter().position(|action| action == hinted) {
                    actions.swap(0, position);
                }
            }
        }

        let mut best_index = 0;
        let mut value;
        if maximizing {
            value = self.game.util_min();
            let mut alpha = alpha;
            for (i, action) in actions.iter().enumerate() {
                let child = self.game.result(state, action);
                let child_value = self.alpha_beta(&child, alpha, beta, depth - 1, false);
                if child_value > value || i == 0 {
                    value = child_value;
                    best_index = i;
                }
                if value >= beta {
                    break;
                }
                alpha = alpha.max(value);
            }
        } else {
            value = self.game.util_max();
            let mut beta = beta;
            for (i, action) in actions.iter().enumerate() {
                let child = self.game.result(state, action);
                let child_value = self.alpha_beta(&child, alpha, beta, depth - 1, true);
                if child_value < value || i == 0 {
                    value = child_value;
                    best_index = i;
                }
                if value <= alpha {
                    break;
                }
                beta = beta.min(value);
            }
        }

        if let Some(table) = self.table {
            // A search cut short by the deadline has no trustworthy result
            if !self.timer.is_time_out() {
                let kind = if value <= alpha {
                    Bound::UpperBound
                } else if value >= beta {
                    Bound::LowerBound
                } else {
                    Bound::Exact
                };
                let hint = generated.and_then(|generated| {
                    generated
                        .iter()
                        .position(|action| *action == actions[best_index])
                        .and_then(|index| u16::try_from(index).ok())
                });
                table.insert(hash, kind, value, depth, hint);
            }
        }

        value
    }

    /// MTD(f): converges on the minimax value of `state` through a sequence of zero-window searches, starting from `guess`.
    pub fn mtdf(&self, state: &G::State, guess: G::Utility, depth: u16, maximizing: bool) -> G::Utility {
        let mut lower_bound = self.game.util_min();
        let mut upper_bound = self.game.util_max();
        let mut g = guess.max(lower_bound).min(upper_bound);
        let one = <G::Utility as One>::one();

        while lower_bound < upper_bound {
            if self.timer.is_time_out() {
                break;
            }
            // With integer scores, a window at the lower bound must be nudged up to make progress
            let beta = if g <= lower_bound {
                lower_bound + one
            } else {
                g
            };
            g = self.alpha_beta(state, beta - one, beta, depth, maximizing);
            if g < beta {
                upper_bound = g;
            } else {
                lower_bound = g;
            }
        }
        g
    }
}
