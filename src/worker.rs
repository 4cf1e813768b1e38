//! Background solver thread.
//!
//! The caller posts `Solve` requests and reads back zero or more `Progress`
//! messages followed by exactly one `Result` per request, in order. Each
//! request carries its own `CancelToken`, so cancelling reaches a solve that
//! is already running. The thread owns the cross-call winnable cache and
//! handles one solve at a time.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use tracing::{debug, error, info, trace};

use crate::error::{Error, Result};
use crate::hash::WinnableStateCache;
use crate::solver::{self, CancelToken, SolverConfig, SolverResult};
use crate::state::GameState;

/// Signature of the solve routine run by the worker.
pub type SolveFn = fn(
    &GameState,
    &SolverConfig,
    &CancelToken,
    &mut dyn FnMut(u64, u64),
    &mut WinnableStateCache,
) -> SolverResult;

#[derive(Debug)]
pub enum WorkerRequest {
    Solve {
        request_id: u64,
        state: Box<GameState>,
        config: SolverConfig,
        cancel: CancelToken,
    },
    Shutdown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerResponse {
    Progress {
        request_id: u64,
        states_explored: u64,
        time_ms: u64,
    },
    Result {
        request_id: u64,
        result: SolverResult,
    },
}

impl WorkerResponse {
    pub fn request_id(&self) -> u64 {
        match *self {
            WorkerResponse::Progress { request_id, .. }
            | WorkerResponse::Result { request_id, .. } => request_id,
        }
    }
}

/// Handle to a running solver thread.
pub struct SolverWorker {
    requests: Sender<WorkerRequest>,
    responses: Receiver<WorkerResponse>,
    /// Token of the most recently posted solve.
    in_flight: Option<CancelToken>,
    solves_started: Arc<AtomicU64>,
    join: Option<JoinHandle<()>>,
}

impl SolverWorker {
    /// Spawns a worker running the real solver.
    pub fn spawn() -> Self {
        Self::spawn_with(solver::solve_with)
    }

    /// Spawns a worker running `solve_fn`.
    pub fn spawn_with(solve_fn: SolveFn) -> Self {
        let (request_tx, request_rx) = unbounded();
        let (response_tx, response_rx) = unbounded();
        let solves_started = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&solves_started);

        // a failed spawn drops the thread's channel ends, so the handle
        // reports a disconnected worker
        let join = thread::Builder::new()
            .name("solver-worker".into())
            .spawn(move || run(solve_fn, request_rx, response_tx, counter))
            .ok();
        if join.is_none() {
            error!("failed to spawn solver worker thread");
        }

        Self {
            requests: request_tx,
            responses: response_rx,
            in_flight: None,
            solves_started,
            join,
        }
    }

    /// Posts a solve request. Any earlier in-flight request is cancelled.
    ///
    /// Fails with `Error::WorkerGone` when the thread is no longer there to
    /// answer.
    pub fn solve(
        &mut self,
        request_id: u64,
        state: &GameState,
        config: SolverConfig,
    ) -> Result<()> {
        self.cancel();

        let cancel = CancelToken::new();
        self.in_flight = Some(cancel.clone());
        let request = WorkerRequest::Solve {
            request_id,
            state: Box::new(state.clone()),
            config,
            cancel,
        };
        if self.requests.send(request).is_err() {
            error!(request_id, "solver worker is gone, request dropped");
            self.in_flight = None;
            return Err(Error::WorkerGone);
        }
        Ok(())
    }

    /// Cancels the in-flight request, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }

    /// Next response, if one is waiting.
    ///
    /// Responses sent before the thread exited are still delivered;
    /// `Error::WorkerGone` comes once they are drained.
    pub fn try_recv(&self) -> Result<Option<WorkerResponse>> {
        match self.responses.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::WorkerGone),
        }
    }

    /// Blocks until the next response or until the worker exits.
    pub fn recv(&self) -> Option<WorkerResponse> {
        self.responses.recv().ok()
    }

    /// Number of solve requests the thread has started running.
    pub fn solves_started(&self) -> u64 {
        self.solves_started.load(Ordering::Relaxed)
    }

    /// Cancels any in-flight solve, stops the thread and waits for it.
    pub fn shutdown(&mut self) {
        self.cancel();
        let _ = self.requests.send(WorkerRequest::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for SolverWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker thread body.
fn run(
    solve_fn: SolveFn,
    requests: Receiver<WorkerRequest>,
    responses: Sender<WorkerResponse>,
    solves_started: Arc<AtomicU64>,
) {
    info!("solver worker started");
    let mut winnable = WinnableStateCache::new();

    for request in requests.iter() {
        let (request_id, state, config, cancel) = match request {
            WorkerRequest::Shutdown => break,
            WorkerRequest::Solve {
                request_id,
                state,
                config,
                cancel,
            } => (request_id, state, config, cancel),
        };

        solves_started.fetch_add(1, Ordering::Relaxed);
        debug!(request_id, "solve started");

        let progress_tx = responses.clone();
        let mut on_progress = move |states_explored: u64, time_ms: u64| {
            trace!(request_id, states_explored, time_ms, "progress");
            let _ = progress_tx.send(WorkerResponse::Progress {
                request_id,
                states_explored,
                time_ms,
            });
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            solve_fn(&state, &config, &cancel, &mut on_progress, &mut winnable)
        }));
        let result = outcome.unwrap_or_else(|_| {
            error!(request_id, "solver panicked, reporting an unresolved result");
            SolverResult::unresolved()
        });

        debug!(request_id, status = ?result.status(), "solve finished");
        if responses
            .send(WorkerResponse::Result { request_id, result })
            .is_err()
        {
            break;
        }
    }

    info!("solver worker stopped");
}
