//! A time-bounded alpha-beta search engine for two-player, zero-sum games.
//!
//! One configurable engine covers the whole family of variants: fixed-depth or iterative deepening, with or without a transposition table, plain alpha-beta, MTD(f) or Best-Node-Search, sequential or split across threads at the root.
//! The game itself is only seen through the `Game` trait.

use std::error;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::search::alpha_beta::Searcher;
pub use crate::search::game::{Game, Utility, ZobristHash};
pub use crate::search::hooks::{DefaultHooks, SearchHooks, TacticalHooks};
pub use crate::search::metrics::Metrics;
pub use crate::search::results::SearchResult;
pub use crate::search::timer::{Timer, TimerStatus};
pub use crate::search::tt::{Bound, TableMode, TranspositionTable};

pub mod alpha_beta;
pub mod bns;
pub mod game;
pub mod hooks;
mod metrics;
pub mod quiescence;
pub mod results;
mod timer;
pub mod tt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The time budget for a decision must be positive.
    InvalidTimeBudget(Duration),
    InvalidTableSize(usize),
    /// Not even a single table slot could be allocated. Holds the requested number of slots.
    TableAllocation(usize),
    ThreadPool(String),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::InvalidTimeBudget(time) => {
                write!(f, "Invalid time budget {:.3}s, must be positive", time.as_secs_f64())
            }
            SearchError::InvalidTableSize(size) => {
                write!(f, "Invalid transposition table size {}", size)
            }
            SearchError::TableAllocation(size) => write!(
                f,
                "Failed to allocate a transposition table, requested {} entries",
                size
            ),
            SearchError::ThreadPool(err) => write!(f, "Failed to build search thread pool: {}", err),
        }
    }
}

impl error::Error for SearchError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Alpha-beta without memory.
    AlphaBeta,
    /// Alpha-beta backed by the transposition table.
    #[default]
    AlphaBetaWithTable,
    /// Zero-window MTD(f) probes over the transposition table.
    Mtdf,
    /// Best-Node-Search. Always runs sequentially.
    BestNodeSearch,
}

impl Algorithm {
    fn uses_table(self) -> bool {
        !matches!(self, Algorithm::AlphaBeta)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Termination {
    /// Search the start depth once.
    FixedDepth,
    /// Search one ply deeper each round, until the deadline or a proven outcome.
    #[default]
    IterativeDeepening,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Parallelism {
    Sequential,
    /// Search the root's children on a thread pool.
    #[default]
    RootParallel,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchSetting {
    algorithm: Algorithm,
    termination: Termination,
    parallelism: Parallelism,
    threads: Option<usize>,
    table_size: usize,
    table_mode: TableMode,
    quiescence_depth: u16,
}

impl Default for SearchSetting {
    fn default() -> Self {
        SearchSetting {
            algorithm: Algorithm::default(),
            termination: Termination::default(),
            parallelism: Parallelism::default(),
            threads: None,
            table_size: 1 << 20,
            table_mode: TableMode::default(),
            quiescence_depth: 0,
        }
    }
}

impl SearchSetting {
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn termination(mut self, termination: Termination) -> Self {
        self.termination = termination;
        self
    }

    pub fn parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Run root-parallel rounds on a dedicated pool of this many threads, instead of rayon's global pool.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Number of transposition table entries. Only used by algorithms that have a table.
    pub fn table_size(mut self, table_size: usize) -> Self {
        self.table_size = table_size;
        self
    }

    pub fn table_mode(mut self, table_mode: TableMode) -> Self {
        self.table_mode = table_mode;
        self
    }

    /// Extend the search past the horizon with up to this many noisy moves. Defaults to 0, in which case no quiescence search is done.
    pub fn quiescence_depth(mut self, quiescence_depth: u16) -> Self {
        self.quiescence_depth = quiescence_depth;
        self
    }

    pub fn get_parallelism(&self) -> Parallelism {
        if self.algorithm == Algorithm::BestNodeSearch {
            Parallelism::Sequential
        } else {
            self.parallelism
        }
    }
}

/// What one round of root searches produced.
struct Round<U> {
    finished: Vec<Option<U>>,
    completed_prefix: usize,
    timed_out: bool,
}

pub struct Search<'a, G: Game, H = DefaultHooks> {
    game: &'a G,
    hooks: H,
    settings: SearchSetting,
    start_depth: u16,
    max_time: Duration,
    table: Option<TranspositionTable<G::Utility>>,
    pool: Option<rayon::ThreadPool>,
    metrics: Metrics,
    depth_reached: u16,
}

impl<'a, G: Game> Search<'a, G> {
    pub fn new(game: &'a G, start_depth: u16, max_time: Duration) -> Result<Self, SearchError> {
        Self::with_settings(game, start_depth, max_time, SearchSetting::default())
    }

    pub fn with_settings(
        game: &'a G,
        start_depth: u16,
        max_time: Duration,
        settings: SearchSetting,
    ) -> Result<Self, SearchError> {
        if max_time.is_zero() {
            return Err(SearchError::InvalidTimeBudget(max_time));
        }
        let table = if settings.algorithm.uses_table() {
            Some(TranspositionTable::new(
                settings.table_size,
                settings.table_mode,
                game.util_unknown(),
            )?)
        } else {
            None
        };
        let pool = match settings.threads {
            Some(threads) if settings.get_parallelism() == Parallelism::RootParallel => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("search-worker-{}", i))
                    .build()
                    .map_err(|err| SearchError::ThreadPool(err.to_string()))?,
            ),
            _ => None,
        };
        Ok(Search {
            game,
            hooks: DefaultHooks,
            settings,
            start_depth,
            max_time,
            table,
            pool,
            metrics: Metrics::default(),
            depth_reached: 0,
        })
    }
}

impl<'a, G: Game, H: SearchHooks<G>> Search<'a, G, H> {
    pub fn with_hooks<H2: SearchHooks<G>>(self, hooks: H2) -> Search<'a, G, H2> {
        Search {
            game: self.game,
            hooks,
            settings: self.settings,
            start_depth: self.start_depth,
            max_time: self.max_time,
            table: self.table,
            pool: self.pool,
            metrics: self.metrics,
            depth_reached: self.depth_reached,
        }
    }

    /// Search statistics for the last decision.
    pub fn metrics(&self) -> String {
        self.metrics.to_string()
    }

    /// Depth of the deepest round whose results were used by the last decision.
    pub fn depth_reached(&self) -> u16 {
        self.depth_reached
    }

    /// Picks the best action in `state` within the time budget, along with its estimated utility for the player to move.
    ///
    /// Returns `None` only if `state` has no legal actions.
    pub fn make_decision(&mut self, state: &G::State) -> Option<(G::Action, G::Utility)> {
        let start_time = Instant::now();
        self.metrics.reset();
        self.depth_reached = 0;
        if let Some(table) = &self.table {
            table.clear();
        }
        let mut timer = Timer::new(self.max_time);
        timer.start();

        let game = self.game;
        let player = game.player(state);
        let first_depth = self.start_depth.max(1);

        let mut actions = game.actions(state);
        if actions.is_empty() {
            return None;
        }
        self.hooks
            .order_actions(game, state, &mut actions, player, first_depth);

        if actions.len() == 1 {
            let action = actions.swap_remove(0);
            let child = game.result(state, &action);
            let utility = if game.is_terminal(&child) {
                self.hooks.eval_terminal(game, &child, player, 1)
            } else {
                self.hooks.eval(game, &child, player)
            };
            log::info!("Only one legal action {:?}, utility {}", action, utility);
            return Some((action, utility));
        }

        let mut results: Vec<SearchResult<G::Action, G::Utility>> = actions
            .into_iter()
            .enumerate()
            .map(|(order, action)| SearchResult {
                action,
                utility: game.util_min(),
                completed: false,
                order,
            })
            .collect();

        let heuristic_used = AtomicBool::new(false);
        let mut depth_limit = first_depth;
        let mut first_round = true;
        let root_guess = self.hooks.eval(game, state, player);

        loop {
            heuristic_used.store(false, Ordering::Relaxed);
            let searcher = Searcher {
                game,
                hooks: &self.hooks,
                timer: &timer,
                metrics: &self.metrics,
                table: self.table.as_ref(),
                player,
                depth_limit,
                quiescence_depth: self.settings.quiescence_depth,
                heuristic_used: &heuristic_used,
            };

            let timed_out = if self.settings.algorithm == Algorithm::BestNodeSearch {
                let finished = self.best_node_round(&searcher, state, &mut results);
                if finished {
                    self.depth_reached = depth_limit;
                }
                !finished
            } else {
                let round = self.run_round(&searcher, state, &results, root_guess, first_round);
                match results::merge_round(
                    &results,
                    &round.finished,
                    round.completed_prefix,
                    round.timed_out,
                ) {
                    Some(merged) => {
                        results = merged;
                        self.depth_reached = depth_limit;
                    }
                    None => log::warn!(
                        "Discarded depth {} round, only {} of {} actions finished",
                        depth_limit,
                        round.finished.iter().flatten().count(),
                        results.len()
                    ),
                }
                round.timed_out
            };

            log::debug!(
                "Depth {}: best {:?} with {}, {} actions, {:.2}s",
                depth_limit,
                results[0].action,
                results[0].utility,
                results.len(),
                start_time.elapsed().as_secs_f32()
            );

            if timed_out || timer.is_time_out() {
                break;
            }
            if self.hooks.has_safe_winner(game, results[0].utility, depth_limit) {
                log::debug!("Proven outcome at depth {}", depth_limit);
                break;
            }
            if results.len() > 1
                && self
                    .hooks
                    .is_significantly_better(game, results[0].utility, results[1].utility)
            {
                break;
            }
            // Without any heuristic leaves, the whole tree was searched to the end
            if !heuristic_used.load(Ordering::Relaxed) {
                log::debug!("Search tree exhausted at depth {}", depth_limit);
                break;
            }
            if self.settings.termination == Termination::FixedDepth {
                break;
            }
            let Some(next_depth) = depth_limit.checked_add(1) else {
                break;
            };
            depth_limit = next_depth;
            first_round = false;
        }

        let best = results.swap_remove(0);
        log::info!(
            "Chose {:?} with utility {} at depth {} in {:.2}s. {}",
            best.action,
            best.utility,
            self.depth_reached,
            start_time.elapsed().as_secs_f32(),
            self.metrics
        );
        Some((best.action, best.utility))
    }

    /// Searches every root action once, in the order of `work`.
    ///
    /// An action's score only counts as finished if its search returned before the deadline.
    fn run_round(
        &self,
        searcher: &Searcher<G, H>,
        state: &G::State,
        work: &[SearchResult<G::Action, G::Utility>],
        root_guess: G::Utility,
        first_round: bool,
    ) -> Round<G::Utility> {
        let completed_prefix = AtomicUsize::new(0);
        let child_depth = searcher.depth_limit - 1;

        let search_item = |(i, item): (usize, &SearchResult<G::Action, G::Utility>)| {
            if searcher.timer.is_time_out() {
                return None;
            }
            let child = self.game.result(state, &item.action);
            let value = match self.settings.algorithm {
                Algorithm::Mtdf => {
                    let guess = if first_round { root_guess } else { item.utility };
                    searcher.mtdf(&child, guess, child_depth, false)
                }
                _ => searcher.alpha_beta(
                    &child,
                    self.game.util_min(),
                    self.game.util_max(),
                    child_depth,
                    false,
                ),
            };
            if searcher.timer.is_time_out() {
                None
            } else {
                completed_prefix.fetch_max(i + 1, Ordering::AcqRel);
                Some(value)
            }
        };

        let finished: Vec<Option<G::Utility>> = match self.settings.get_parallelism() {
            Parallelism::Sequential => work.iter().enumerate().map(search_item).collect(),
            Parallelism::RootParallel => {
                let run = || -> Vec<Option<G::Utility>> {
                    work.par_iter()
                        .enumerate()
                        .with_max_len(1)
                        .map(search_item)
                        .collect()
                };
                match &self.pool {
                    Some(pool) => pool.install(run),
                    None => run(),
                }
            }
        };

        Round {
            finished,
            completed_prefix: completed_prefix.into_inner(),
            timed_out: searcher.timer.is_time_out(),
        }
    }

    /// Runs one Best-Node-Search round, and moves the chosen action to the front of `results`.
    /// Returns false if the round was cut short by the deadline, leaving `results` untouched.
    fn best_node_round(
        &self,
        searcher: &Searcher<G, H>,
        state: &G::State,
        results: &mut [SearchResult<G::Action, G::Utility>],
    ) -> bool {
        let actions: Vec<G::Action> = results.iter().map(|result| result.action.clone()).collect();
        let Some(outcome) = bns::best_node_search(searcher, state, &actions, searcher.depth_limit)
        else {
            log::warn!("Discarded depth {} best-node round", searcher.depth_limit);
            return false;
        };
        for result in results.iter_mut() {
            result.completed = false;
        }
        results[outcome.best].utility = outcome.value;
        results[outcome.best].completed = true;
        results[..=outcome.best].rotate_right(1);
        true
    }
}
