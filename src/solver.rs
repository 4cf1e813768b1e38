//! Bounded depth-first solvability search.
//!
//! Key points:
//! - Safe foundation moves are auto-played before the search and after
//!   every move, so forced sequences collapse into one transition
//! - Explicit frame stack instead of recursion, so deep lines cannot
//!   overflow the thread stack
//! - Transposition table of explored hashes (FxHashSet-backed ring buffer)
//! - Cross-call cache of hashes proven winnable
//! - Stop conditions (cancellation, wall clock, node count) checked at
//!   every node
//!
//! A `false` result is only a proof of unwinnability when `timed_out` is
//! also `false`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hash::{hash_state, TranspositionTable, WinnableStateCache, DEFAULT_TT_CAPACITY};
use crate::moves::{
    generate_all_moves, is_definitely_stuck, is_definitely_winnable, is_reversal,
    try_apply_move, SolverMove,
};
use crate::rules::check_win;
use crate::safety::auto_play_safe_moves;
use crate::state::GameState;

/// Minimum wall-clock gap between two progress reports.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Frames preallocated for the search path.
const PATH_CAPACITY: usize = 512;

/// Search budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Wall-clock ceiling per solve.
    pub max_time_ms: u64,
    /// Node ceiling per solve; `None` means unbounded.
    pub max_states_explored: Option<u64>,
    /// Entries kept in the transposition table before FIFO eviction.
    pub transposition_capacity: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_time_ms: 60_000,
            max_states_explored: None,
            transposition_capacity: DEFAULT_TT_CAPACITY,
        }
    }
}

/// Outcome of one solve.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverResult {
    pub winnable: bool,
    /// The search stopped on a budget or cancellation before finishing.
    pub timed_out: bool,
    pub states_explored: u64,
    pub time_ms: u64,
    pub first_winning_move: Option<SolverMove>,
    /// Moves from the auto-played start, each followed by safe auto-play,
    /// ending in a won, definitely-winnable or cache-proven state.
    pub winning_line: Vec<SolverMove>,
}

/// What a result says about the position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolvabilityStatus {
    Idle,
    Analyzing,
    Winnable,
    NotWinnable,
    Unknown,
}

impl SolverResult {
    /// Result reported when a solve could not run to any conclusion.
    pub fn unresolved() -> Self {
        Self {
            timed_out: true,
            ..Self::default()
        }
    }

    fn quick(winnable: bool, started: Instant) -> Self {
        Self {
            winnable,
            timed_out: false,
            states_explored: 1,
            time_ms: elapsed_ms(started),
            ..Self::default()
        }
    }

    pub fn status(&self) -> SolvabilityStatus {
        if self.winnable {
            SolvabilityStatus::Winnable
        } else if self.timed_out {
            SolvabilityStatus::Unknown
        } else {
            SolvabilityStatus::NotWinnable
        }
    }
}

/// Shared flag a running solve polls at every node.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[inline]
fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

/// Per-solve bookkeeping.
struct SearchContext<'a> {
    started: Instant,
    states_explored: u64,
    config: &'a SolverConfig,
    visited: TranspositionTable,
    cancel: &'a CancelToken,
    on_progress: &'a mut dyn FnMut(u64, u64),
    last_progress: Instant,
}

impl SearchContext<'_> {
    fn should_stop(&self) -> bool {
        self.cancel.is_cancelled()
            || elapsed_ms(self.started) >= self.config.max_time_ms
            || self
                .config
                .max_states_explored
                .is_some_and(|max| self.states_explored >= max)
    }

    fn report_progress(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_progress) >= PROGRESS_INTERVAL {
            self.last_progress = now;
            let elapsed = now.duration_since(self.started).as_millis() as u64;
            (self.on_progress)(self.states_explored, elapsed);
        }
    }
}

/// A node on the current search path.
///
/// Holds the remaining candidate moves so backtracking resumes where the
/// node left off.
struct Frame {
    state: GameState,
    hash: u32,
    /// The move that led here, if any.
    via: Option<SolverMove>,
    moves: Vec<SolverMove>,
    next_move: usize,
}

/// Solves `state` with no cancellation, no progress reporting and a fresh
/// winnable cache.
pub fn solve(state: &GameState, config: &SolverConfig) -> SolverResult {
    let cancel = CancelToken::new();
    let mut cache = WinnableStateCache::new();
    solve_with(state, config, &cancel, &mut |_, _| {}, &mut cache)
}

/// Determines whether `state` can be won.
///
/// `on_progress` receives `(states_explored, elapsed_ms)` at most once per
/// second. `winnable` is read before and during the search and extended
/// with every state on a winning line found here.
pub fn solve_with(
    state: &GameState,
    config: &SolverConfig,
    cancel: &CancelToken,
    on_progress: &mut dyn FnMut(u64, u64),
    winnable: &mut WinnableStateCache,
) -> SolverResult {
    let started = Instant::now();
    let root = auto_play_safe_moves(state);
    let root_hash = hash_state(&root);

    if winnable.contains(root_hash) || check_win(&root.foundations) {
        return SolverResult::quick(true, started);
    }
    if is_definitely_stuck(&root) {
        return SolverResult::quick(false, started);
    }
    if is_definitely_winnable(&root) {
        return SolverResult::quick(true, started);
    }

    let mut context = SearchContext {
        started,
        states_explored: 0,
        config,
        visited: TranspositionTable::new(config.transposition_capacity),
        cancel,
        on_progress,
        last_progress: started,
    };

    debug!(root_hash, "starting search");
    let (line, timed_out) = match search(root, root_hash, &mut context, winnable) {
        Outcome::Won(line) => (Some(line), false),
        Outcome::Exhausted => (None, false),
        Outcome::Stopped => (None, true),
    };

    let result = SolverResult {
        winnable: line.is_some(),
        timed_out,
        states_explored: context.states_explored,
        time_ms: elapsed_ms(started),
        first_winning_move: line.as_ref().and_then(|l| l.first().copied()),
        winning_line: line.unwrap_or_default(),
    };
    debug!(
        winnable = result.winnable,
        timed_out = result.timed_out,
        states = result.states_explored,
        time_ms = result.time_ms,
        "search finished"
    );
    result
}

/// How a search ended.
enum Outcome {
    Won(Vec<SolverMove>),
    /// Every state reachable from the root was explored.
    Exhausted,
    /// Cancelled or out of budget with states left to explore.
    Stopped,
}

/// Enters a node: counts it, reports progress and consults the
/// transposition table.
///
/// Returns the frame to push, or `None` when the node was already explored.
fn enter(
    state: GameState,
    hash: u32,
    via: Option<SolverMove>,
    context: &mut SearchContext<'_>,
) -> Option<Frame> {
    context.states_explored += 1;
    context.report_progress();

    if context.visited.contains(hash) {
        return None;
    }
    context.visited.insert(hash);

    let moves = generate_all_moves(&state)
        .into_iter()
        .filter(|mv| !is_reversal(mv, via.as_ref()))
        .collect();

    Some(Frame {
        state,
        hash,
        via,
        moves,
        next_move: 0,
    })
}

/// Depth-first search from an auto-played root.
///
/// The stop conditions are checked before every node is entered.
fn search(
    root: GameState,
    root_hash: u32,
    context: &mut SearchContext<'_>,
    winnable: &mut WinnableStateCache,
) -> Outcome {
    if context.should_stop() {
        return Outcome::Stopped;
    }
    let mut path: Vec<Frame> = Vec::with_capacity(PATH_CAPACITY);
    path.extend(enter(root, root_hash, None, context));

    while let Some(frame) = path.last_mut() {
        let Some(&mv) = frame.moves.get(frame.next_move) else {
            // exhausted: backtrack
            path.pop();
            continue;
        };
        frame.next_move += 1;

        let Some(next) = try_apply_move(&frame.state, &mv) else {
            continue;
        };
        let next = auto_play_safe_moves(&next);
        let next_hash = hash_state(&next);

        if winnable.contains(next_hash)
            || check_win(&next.foundations)
            || is_definitely_winnable(&next)
        {
            winnable.extend(path.iter().map(|f| f.hash));
            winnable.insert(next_hash);

            let mut line: Vec<SolverMove> = path.iter().filter_map(|f| f.via).collect();
            line.push(mv);
            return Outcome::Won(line);
        }

        if context.should_stop() {
            return Outcome::Stopped;
        }
        if let Some(child) = enter(next, next_hash, Some(mv), context) {
            path.push(child);
        }
    }

    Outcome::Exhausted
}
