//! Pluggable behaviour for the search.
//!
//! The search calls into a `SearchHooks` implementation for leaf evaluation, move ordering and its stopping rules. Every method has a default, so a strategy only needs to override what it changes.

use std::cmp::Reverse;

use num_traits::Saturating;

use crate::search::game::Game;

pub trait SearchHooks<G: Game>: Sync {
    /// Heuristic score of a non-terminal state at the search horizon.
    fn eval(&self, game: &G, state: &G::State, player: G::Player) -> G::Utility {
        game.utility(state, player)
    }

    /// Score of a terminal state, `distance` plies below the root.
    fn eval_terminal(
        &self,
        game: &G,
        state: &G::State,
        player: G::Player,
        _distance: u16,
    ) -> G::Utility {
        game.utility(state, player)
    }

    /// Reorders `actions` in place before they are searched. `depth` is the remaining depth below `state`.
    fn order_actions(
        &self,
        _game: &G,
        _state: &G::State,
        _actions: &mut Vec<G::Action>,
        _player: G::Player,
        _depth: u16,
    ) {
    }

    /// Whether the best root score is a proven outcome, so that searching deeper cannot change the decision.
    /// `depth` is the depth of the round that produced `best`.
    fn has_safe_winner(&self, game: &G, best: G::Utility, _depth: u16) -> bool {
        best <= game.util_min() || best >= game.util_max()
    }

    /// Whether the best root action is far enough ahead of the runner-up to stop searching early.
    fn is_significantly_better(&self, _game: &G, _best: G::Utility, _second: G::Utility) -> bool {
        false
    }
}

/// Plain minimax behaviour: raw game utilities, generation order.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHooks;

impl<G: Game> SearchHooks<G> for DefaultHooks {}

/// Prefers short wins and long losses, and orders moves by a one-ply lookahead.
#[derive(Clone, Copy, Debug, Default)]
pub struct TacticalHooks;

impl<G: Game> SearchHooks<G> for TacticalHooks {
    fn eval_terminal(
        &self,
        game: &G,
        state: &G::State,
        player: G::Player,
        distance: u16,
    ) -> G::Utility {
        let value = game.utility(state, player);
        let Some(distance) = num_traits::cast::<u16, G::Utility>(distance) else {
            return value;
        };
        if value >= game.util_max() {
            value - distance
        } else if value <= game.util_min() {
            value + distance
        } else {
            value
        }
    }

    /// Terminal scores are at most `depth` plies away from the bounds, since no terminal state lies deeper than the round.
    fn has_safe_winner(&self, game: &G, best: G::Utility, depth: u16) -> bool {
        let Some(depth) = num_traits::cast::<u16, G::Utility>(depth) else {
            return best <= game.util_min() || best >= game.util_max();
        };
        best <= game.util_min().saturating_add(depth) || best >= game.util_max().saturating_sub(depth)
    }

    fn order_actions(
        &self,
        game: &G,
        state: &G::State,
        actions: &mut Vec<G::Action>,
        player: G::Player,
        depth: u16,
    ) {
        // Near the horizon, ordering costs more than it saves
        if actions.len() <= 1 || depth < 2 {
            return;
        }
        if game.player(state) == player {
            actions.sort_by_cached_key(|action| Reverse(game.utility(&game.result(state, action), player)));
        } else {
            actions.sort_by_cached_key(|action| game.utility(&game.result(state, action), player));
        }
    }
}
