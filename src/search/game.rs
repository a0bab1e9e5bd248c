//! The interface between the search and a concrete game.
//!
//! The search never looks inside states or actions. Everything it knows about a game goes through the `Game` trait, and the only thing it requires of a state is a cheap, incrementally maintained hash.

use std::fmt;

use num_traits::{PrimInt, Signed};

/// Scores returned by a game's utility function.
///
/// Any signed primitive integer works. Integer scores keep MTD(f) and Best-Node-Search well-defined, since both step through the value range one unit at a time.
pub trait Utility: PrimInt + Signed + fmt::Debug + fmt::Display + Send + Sync + 'static {}

impl<T> Utility for T where T: PrimInt + Signed + fmt::Debug + fmt::Display + Send + Sync + 'static {}

/// A position hash, used as the transposition table key.
///
/// Implementations are expected to update the hash incrementally when applying moves, not to recompute it on every call.
pub trait ZobristHash {
    fn zobrist_hash(&self) -> u64;
}

/// A two-player, zero-sum game with perfect information.
pub trait Game: Sync {
    type State: Clone + Send + Sync + ZobristHash;
    type Action: Clone + PartialEq + fmt::Debug + Send + Sync;
    type Player: Copy + PartialEq + fmt::Debug + Send + Sync;
    type Utility: Utility;

    fn initial_state(&self) -> Self::State;

    /// The player to move in `state`.
    fn player(&self, state: &Self::State) -> Self::Player;

    /// All legal actions in `state`. An empty list means the player to move has no legal move.
    fn actions(&self, state: &Self::State) -> Vec<Self::Action>;

    /// The state after applying `action`. Must not modify `state`.
    fn result(&self, state: &Self::State, action: &Self::Action) -> Self::State;

    fn is_terminal(&self, state: &Self::State) -> bool;

    /// The score of `state` from `player`'s point of view.
    /// Defined for every state: exact for terminal states, heuristic otherwise.
    fn utility(&self, state: &Self::State, player: Self::Player) -> Self::Utility;

    /// Whether the move from `before` to `after` is quiet, i.e. does not need to be extended by quiescence search.
    fn is_quiet(&self, _before: &Self::State, _after: &Self::State) -> bool {
        true
    }

    /// Score of a proven loss. No reachable non-losing state may score this low.
    fn util_min(&self) -> Self::Utility;

    /// Score of a proven win. No reachable non-winning state may score this high.
    fn util_max(&self) -> Self::Utility;

    /// Marker for a missing table entry, distinct from every score the game can produce.
    fn util_unknown(&self) -> Self::Utility;
}
