//! src/pool/worker.rs
//!
//! Shared round state and the per-worker state machine.
//!
//! # Protocol
//!
//! All coordination goes through one mutex-guarded [`RoundState`] and two
//! condition variables:
//! - `orders_ready`: workers wait here for a non-empty range or the stop flag
//! - `job_done`: the dispatcher waits here for `working` to reach zero
//!
//! ```text
//!            range.count != 0                    callback returned
//!  Parked ───────────────────> Executing ─────────────────────────> Reporting
//!    ^  │                                                               │
//!    │  │ stop                     count = 0, working -= 1 (one lock)   │
//!    │  v                                                               │
//!    │ Stopped                                                          │
//!    └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A worker counts down `working` once at start-up, so the pool constructor
//! can wait on `job_done` until every worker is parked.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{error, trace};

use super::common::lock;
use super::common::thread::set_worker_index;
use super::job::Job;
use super::range::WorkRange;

pub(crate) type PanicPayload = Box<dyn Any + Send + 'static>;

/// Mutable state shared by the dispatcher and all workers.
pub(crate) struct RoundState {
    /// Workers that have not yet reported for the current round.
    pub(crate) working: usize,
    pub(crate) stop: bool,
    pub(crate) job: Option<Arc<Job>>,
    /// One range per worker, reused across rounds.
    pub(crate) ranges: Vec<WorkRange>,
    /// First panic raised by a worker callback this round.
    pub(crate) panic: Option<PanicPayload>,
    pub(crate) worker_completions: u64,
}

impl RoundState {
    /// True between rounds: nobody working, no job, every range idle.
    pub(crate) fn is_quiescent(&self) -> bool {
        self.working == 0 && self.job.is_none() && self.ranges.iter().all(WorkRange::is_idle)
    }
}

pub(crate) struct Shared {
    pub(crate) state: Mutex<RoundState>,
    pub(crate) orders_ready: Condvar,
    pub(crate) job_done: Condvar,
}

impl Shared {
    /// State for `num_workers` workers that have not reported ready yet.
    pub(crate) fn new(num_workers: usize) -> Self {
        Self {
            state: Mutex::new(RoundState {
                working: num_workers,
                stop: false,
                job: None,
                ranges: (0..num_workers).map(|index| WorkRange::idle(index + 1)).collect(),
                panic: None,
                worker_completions: 0,
            }),
            orders_ready: Condvar::new(),
            job_done: Condvar::new(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, RoundState> {
        lock(&self.state)
    }

    /// Blocks until every worker has reported.
    pub(crate) fn wait_for_workers(&self) -> MutexGuard<'_, RoundState> {
        let state = self.lock();
        self.job_done
            .wait_while(state, |state| state.working > 0)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits out the current round, retires its job and hands back any
    /// worker panic.
    pub(crate) fn end_round(&self) -> Option<PanicPayload> {
        let mut state = self.wait_for_workers();
        state.job = None;
        state.panic.take()
    }

    /// Sets the stop flag and wakes every parked worker.
    pub(crate) fn request_stop(&self) {
        self.lock().stop = true;
        self.orders_ready.notify_all();
    }
}

/// What a woken worker carries into `Executing`.
pub(crate) struct Order {
    job: Arc<Job>,
    range: WorkRange,
}

pub(crate) enum WorkerPhase {
    Parked,
    Executing(Order),
    Reporting(Option<PanicPayload>),
    Stopped,
}

impl WorkerPhase {
    /// Advances worker `index` by one transition.
    pub(crate) fn step(self, shared: &Shared, index: usize) -> WorkerPhase {
        match self {
            WorkerPhase::Parked => {
                let state = shared
                    .orders_ready
                    .wait_while(shared.lock(), |state| {
                        !state.stop && state.ranges[index].is_idle()
                    })
                    .unwrap_or_else(PoisonError::into_inner);

                if state.stop {
                    return WorkerPhase::Stopped;
                }

                match &state.job {
                    Some(job) => WorkerPhase::Executing(Order {
                        job: Arc::clone(job),
                        range: state.ranges[index],
                    }),
                    None => {
                        error!(worker = index, "woken with a range but no job published");
                        std::process::abort();
                    }
                }
            }
            WorkerPhase::Executing(order) => {
                trace!(worker = index, range = ?order.range, "executing");
                let outcome =
                    panic::catch_unwind(AssertUnwindSafe(|| order.job.execute(order.range)));
                // The job borrows the dispatcher's stack; release it before reporting.
                drop(order);
                WorkerPhase::Reporting(outcome.err())
            }
            WorkerPhase::Reporting(failure) => {
                let mut state = shared.lock();
                state.ranges[index].count = 0;
                state.working -= 1;
                state.worker_completions += 1;
                if let Some(payload) = failure {
                    if state.panic.is_none() {
                        state.panic = Some(payload);
                    }
                }
                if state.working == 0 {
                    shared.job_done.notify_all();
                }
                WorkerPhase::Parked
            }
            WorkerPhase::Stopped => WorkerPhase::Stopped,
        }
    }
}

/// Body of worker thread `index`.
pub(crate) fn worker_main(shared: Arc<Shared>, index: usize) {
    set_worker_index(index);
    trace!(
        worker = index,
        thread = ?thread::current().name(),
        "worker started"
    );

    {
        let mut state = shared.lock();
        state.working -= 1;
        if state.working == 0 {
            shared.job_done.notify_all();
        }
    }

    let mut phase = WorkerPhase::Parked;
    while !matches!(phase, WorkerPhase::Stopped) {
        phase = phase.step(&shared, index);
    }

    trace!(worker = index, "worker exiting");
}
