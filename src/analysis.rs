//! Caller-side orchestration of background solves.
//!
//! The `Analyzer` sits in the caller's event loop. Every accepted move feeds
//! it the new state; it waits for the state to settle, hands it to the
//! worker thread, and folds the worker's messages into one `Analysis` the
//! caller can display. Messages for anything but the newest request are
//! dropped by request id.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::hash::{canonical_key, CanonicalKey};
use crate::moves::SolverMove;
use crate::rules::check_win;
use crate::solver::{SolvabilityStatus, SolverConfig, SolverResult};
use crate::state::GameState;
use crate::worker::{SolverWorker, WorkerResponse};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);
pub const DEFAULT_RESULT_CACHE_CAPACITY: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Quiet period after the last state change before a solve starts.
    pub debounce: Duration,
    /// Resolved results remembered by canonical key.
    pub result_cache_capacity: usize,
    pub solver: SolverConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            result_cache_capacity: DEFAULT_RESULT_CACHE_CAPACITY,
            solver: SolverConfig::default(),
        }
    }
}

/// What the caller shows for the current position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub status: SolvabilityStatus,
    pub states_explored: u64,
    pub time_ms: u64,
    pub first_winning_move: Option<SolverMove>,
}

impl Default for Analysis {
    fn default() -> Self {
        Self::with_status(SolvabilityStatus::Idle)
    }
}

impl Analysis {
    fn with_status(status: SolvabilityStatus) -> Self {
        Self {
            status,
            states_explored: 0,
            time_ms: 0,
            first_winning_move: None,
        }
    }

    fn from_result(result: &SolverResult) -> Self {
        Self {
            status: result.status(),
            states_explored: result.states_explored,
            time_ms: result.time_ms,
            first_winning_move: result.first_winning_move,
        }
    }

    /// Whether no further update is expected for this position.
    pub fn is_settled(&self) -> bool {
        !matches!(self.status, SolvabilityStatus::Analyzing)
    }
}

/// Resolved results by canonical key, oldest evicted first.
struct ResultCache {
    entries: FxHashMap<CanonicalKey, SolverResult>,
    order: VecDeque<CanonicalKey>,
    capacity: usize,
}

impl ResultCache {
    fn new(capacity: usize) -> Self {
        Self {
            entries: FxHashMap::default(),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn get(&self, key: &CanonicalKey) -> Option<&SolverResult> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: CanonicalKey, result: SolverResult) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(key.clone(), result).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A state waiting out the debounce period.
struct Pending {
    state: GameState,
    key: CanonicalKey,
    due: Instant,
}

/// The request whose messages are currently accepted.
struct InFlight {
    request_id: u64,
    key: CanonicalKey,
}

/// Debounced, cancellable, cached background analysis.
pub struct Analyzer {
    config: AnalyzerConfig,
    worker: SolverWorker,
    pending: Option<Pending>,
    in_flight: Option<InFlight>,
    next_request_id: u64,
    cache: ResultCache,
    analysis: Analysis,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_worker(config, SolverWorker::spawn())
    }

    pub fn with_worker(config: AnalyzerConfig, worker: SolverWorker) -> Self {
        Self {
            cache: ResultCache::new(config.result_cache_capacity),
            config,
            worker,
            pending: None,
            in_flight: None,
            next_request_id: 1,
            analysis: Analysis::default(),
        }
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    /// Solves the worker has started so far.
    pub fn solves_started(&self) -> u64 {
        self.worker.solves_started()
    }

    /// Resolved results currently cached.
    pub fn cached_results(&self) -> usize {
        self.cache.len()
    }

    /// Cached resolved result for `state`, if any.
    pub fn cached(&self, state: &GameState) -> Option<&SolverResult> {
        self.cache.get(&canonical_key(state))
    }

    pub fn state_changed(&mut self, state: &GameState) {
        self.state_changed_at(state, Instant::now());
    }

    /// Records `state` as the newest position, observed at `now`.
    ///
    /// Whatever was pending or running is abandoned. Won states and cached
    /// positions settle immediately; anything else is scheduled once the
    /// debounce period has passed.
    pub fn state_changed_at(&mut self, state: &GameState, now: Instant) {
        self.abandon();

        if check_win(&state.foundations) {
            self.analysis = Analysis::with_status(SolvabilityStatus::Winnable);
            return;
        }

        let key = canonical_key(state);
        if let Some(result) = self.cache.get(&key) {
            debug!("result cache hit");
            self.analysis = Analysis::from_result(result);
            return;
        }

        self.pending = Some(Pending {
            state: state.clone(),
            key,
            due: now + self.config.debounce,
        });
        self.analysis = Analysis::with_status(SolvabilityStatus::Analyzing);
    }

    pub fn poll(&mut self) -> &Analysis {
        self.poll_at(Instant::now())
    }

    /// Dispatches a settled pending state and drains worker messages.
    pub fn poll_at(&mut self, now: Instant) -> &Analysis {
        if self.pending.as_ref().is_some_and(|p| p.due <= now) {
            if let Some(pending) = self.pending.take() {
                self.dispatch(pending);
            }
        }

        loop {
            match self.worker.try_recv() {
                Ok(Some(response)) => self.accept(response),
                Ok(None) => break,
                Err(_) => {
                    self.worker_lost();
                    break;
                }
            }
        }

        &self.analysis
    }

    /// Drops all work for the current position and goes idle.
    pub fn cancel(&mut self) {
        self.abandon();
        self.analysis = Analysis::default();
    }

    fn abandon(&mut self) {
        self.pending = None;
        if self.in_flight.take().is_some() {
            self.worker.cancel();
        }
    }

    fn dispatch(&mut self, pending: Pending) {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        debug!(request_id, "dispatching solve");
        self.in_flight = Some(InFlight {
            request_id,
            key: pending.key,
        });
        if self
            .worker
            .solve(request_id, &pending.state, self.config.solver)
            .is_err()
        {
            self.worker_lost();
        }
    }

    /// Settles the in-flight request as unresolved; no answer is coming.
    fn worker_lost(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            warn!(request_id = in_flight.request_id, "solver worker lost");
            self.analysis = Analysis::from_result(&SolverResult::unresolved());
        }
    }

    fn accept(&mut self, response: WorkerResponse) {
        let current = self.in_flight.as_ref().map(|f| f.request_id);
        if current != Some(response.request_id()) {
            debug!(request_id = response.request_id(), "discarding stale message");
            return;
        }

        match response {
            WorkerResponse::Progress {
                states_explored,
                time_ms,
                ..
            } => {
                self.analysis.states_explored = states_explored;
                self.analysis.time_ms = time_ms;
            }
            WorkerResponse::Result { result, .. } => {
                self.analysis = Analysis::from_result(&result);
                if let Some(in_flight) = self.in_flight.take() {
                    if !result.timed_out {
                        self.cache.insert(in_flight.key, result);
                    }
                }
            }
        }
    }
}
