use crate::search::game::Game;

/// Leaf extension that keeps searching noisy moves past the horizon.
///
/// Every node may "stand pat" on its static evaluation, and only children reached by a non-quiet move, or terminal children, are expanded. The extension has its own small depth budget, independent of the main search depth.
///
/// Like the main search, a node whose deadline has passed returns the worst score for the side to move.
pub struct Quiescence<'a, G, E, T, S> {
    game: &'a G,
    base_distance: u16,
    eval: E,
    eval_terminal: T,
    is_time_out: S,
}

impl<'a, G, E, T, S> Quiescence<'a, G, E, T, S>
where
    G: Game,
    E: Fn(&G::State, G::Player) -> G::Utility,
    T: Fn(&G::State, G::Player, u16) -> G::Utility,
    S: Fn() -> bool,
{
    /// `base_distance` is passed to `eval_terminal` for terminal states found by the extension.
    pub fn new(game: &'a G, base_distance: u16, eval: E, eval_terminal: T, is_time_out: S) -> Self {
        Quiescence {
            game,
            base_distance,
            eval,
            eval_terminal,
            is_time_out,
        }
    }

    pub fn q_max(
        &self,
        state: &G::State,
        player: G::Player,
        mut alpha: G::Utility,
        beta: G::Utility,
        depth: u16,
    ) -> G::Utility {
        if self.game.is_terminal(state) {
            return (self.eval_terminal)(state, player, self.base_distance);
        }
        if (self.is_time_out)() {
            return self.game.util_min();
        }
        let stand_pat = (self.eval)(state, player);
        if depth == 0 || stand_pat >= beta {
            return stand_pat;
        }
        alpha = alpha.max(stand_pat);
        let mut best = stand_pat;

        for action in self.game.actions(state) {
            let child = self.game.result(state, &action);
            if !self.game.is_terminal(&child) && self.game.is_quiet(state, &child) {
                continue;
            }
            let value = self.q_min(&child, player, alpha, beta, depth - 1);
            if value >= beta {
                return value;
            }
            best = best.max(value);
            alpha = alpha.max(value);
        }
        best
    }

    pub fn q_min(
        &self,
        state: &G::State,
        player: G::Player,
        alpha: G::Utility,
        mut beta: G::Utility,
        depth: u16,
    ) -> G::Utility {
        if self.game.is_terminal(state) {
            return (self.eval_terminal)(state, player, self.base_distance);
        }
        if (self.is_time_out)() {
            return self.game.util_max();
        }
        let stand_pat = (self.eval)(state, player);
        if depth == 0 || stand_pat <= alpha {
            return stand_pat;
        }
        beta = beta.min(stand_pat);
        let mut best = stand_pat;

        for action in self.game.actions(state) {
            let child = self.game.result(state, &action);
            if !self.game.is_terminal(&child) && self.game.is_quiet(state, &child) {
                continue;
            }
            let value = self.q_max(&child, player, alpha, beta, depth - 1);
            if value <= alpha {
                return value;
            }
            best = best.min(value);
            beta = beta.min(value);
        }
        best
    }
}
