//! src/pool/thread_pool.rs
//!
//! The default `Threads` implementation: a fixed set of long-lived workers
//! plus the calling thread, synchronised as a fork-join barrier.
//!
//! # Round lifecycle
//! 1. The dispatcher partitions the count, publishes the job and the worker
//!    ranges under the pool lock, and wakes the workers.
//! 2. The dispatcher runs the caller's tail range in-line.
//! 3. The dispatcher waits until every active worker has reported, then
//!    retires the job.
//!
//! `run` and `reduce` take `&mut self`, so a pool serves one round at a time
//! and a callback cannot re-enter the pool it is running on.

use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::panic;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, trace, warn};

use super::config::PoolConfig;
use super::job::{Job, ReduceSlots};
use super::partition::{assign_ranges, FAST_PATH_MAX};
use super::range::{WorkRange, CALLER};
use super::worker::{worker_main, PanicPayload, Shared};
use crate::threads::Threads;

/// Counters describing the work a pool has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Rounds dispatched to the workers.
    pub rounds: u64,
    /// Rounds the caller ran in-line without waking any worker.
    pub fast_path_rounds: u64,
    /// Worker ranges executed to completion, across all rounds.
    pub worker_completions: u64,
}

/// Fixed-size fork-join thread pool.
///
/// ```ignore
/// let mut pool = ThreadPool::new()?;
/// let mut out = vec![0.0; 1024];
/// pool.for_each_chunk_mut(&mut out, |range, chunk| {
///     for (i, x) in range.indices().zip(chunk) {
///         *x = i as f64;
///     }
/// })?;
/// ```
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    rounds: u64,
    fast_path_rounds: u64,
}

impl ThreadPool {
    /// Creates a pool with one worker per hardware thread, minus the caller.
    pub fn new() -> Result<Self> {
        Self::with_config(PoolConfig::default())
    }

    /// Creates a pool and blocks until every worker is parked and ready.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        let num_workers = config.resolved_num_workers();
        if num_workers == 0 {
            return Err(anyhow!(
                "Cannot create ThreadPool with 0 workers. \
                Either set num_workers > 0 or use SerialThreads."
            ));
        }

        let shared = Arc::new(Shared::new(num_workers));
        let mut workers = Vec::with_capacity(num_workers);

        for index in 0..num_workers {
            let mut builder =
                thread::Builder::new().name(format!("{}-{}", config.thread_name, index));
            if let Some(bytes) = config.stack_size {
                builder = builder.stack_size(bytes);
            }

            let worker_shared = Arc::clone(&shared);
            let spawned = builder
                .spawn(move || worker_main(worker_shared, index))
                .with_context(|| format!("Failed to spawn worker thread {}", index));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    shutdown(&shared, &mut workers);
                    return Err(e);
                }
            }
        }

        drop(shared.wait_for_workers());
        debug!(
            num_workers,
            thread_name = %config.thread_name,
            "thread pool ready"
        );

        Ok(Self {
            shared,
            workers,
            rounds: 0,
            fast_path_rounds: 0,
        })
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Join handles of the worker threads, e.g. for adjusting OS scheduling
    /// priority. The pool itself never changes thread priorities.
    pub fn worker_handles(&self) -> impl ExactSizeIterator<Item = &JoinHandle<()>> + '_ {
        self.workers.iter()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            rounds: self.rounds,
            fast_path_rounds: self.fast_path_rounds,
            worker_completions: self.shared.lock().worker_completions,
        }
    }

    /// True when no round is in flight and every worker range is empty.
    pub fn is_idle(&self) -> bool {
        self.shared.lock().is_quiescent()
    }

    /// Publishes `job` for `count` items, runs the caller's share and waits
    /// for the workers. Returns the number of participating threads.
    fn dispatch(&mut self, job: Job, count: usize) -> usize {
        let (caller, threads_used) = {
            let mut state = self.shared.lock();
            debug_assert!(state.is_quiescent(), "round dispatched while another is in flight");

            let caller = assign_ranges(count, &mut state.ranges);
            state.working = state.ranges.iter().filter(|range| !range.is_idle()).count();
            state.job = Some(Arc::new(job));
            (caller, state.working + 1)
        };
        self.rounds += 1;
        trace!(count, threads_used, "dispatching round");

        self.shared.orders_ready.notify_all();

        let round = RoundGuard::new(&self.shared);
        job.execute(caller);
        if let Some(payload) = round.finish() {
            panic::resume_unwind(payload);
        }

        threads_used
    }
}

impl Threads for ThreadPool {
    fn participants(&self) -> usize {
        self.workers.len() + 1
    }

    fn run<F>(&mut self, f: F, count: usize) -> usize
    where
        F: Fn(WorkRange) + Sync,
    {
        if count <= FAST_PATH_MAX {
            self.fast_path_rounds += 1;
            f(WorkRange::new(0, count, CALLER));
            return 1;
        }

        // SAFETY: `dispatch` does not return or unwind before every worker
        // has dropped its handle to the job, and `f` outlives the call.
        let job = unsafe { Job::run(&f) };
        self.dispatch(job, count)
    }

    fn reduce<T, F, C>(&mut self, f: F, combine: C, count: usize) -> T
    where
        T: Send,
        F: Fn(WorkRange) -> T + Sync,
        C: FnOnce(&[T], usize) -> T,
    {
        if count <= FAST_PATH_MAX {
            self.fast_path_rounds += 1;
            return f(WorkRange::new(0, count, CALLER));
        }

        let slots = ReduceSlots::new(&f, self.participants());
        // SAFETY: as in `run`; `slots` outlives the dispatch.
        let job = unsafe { Job::reduce(&slots) };
        let participants = self.dispatch(job, count);

        let partials = slots.into_partials(participants);
        combine(&partials, participants)
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("num_workers", &self.workers.len())
            .field("rounds", &self.rounds)
            .field("fast_path_rounds", &self.fast_path_rounds)
            .finish()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        shutdown(&self.shared, &mut self.workers);
        debug!(rounds = self.rounds, "thread pool shut down");
    }
}

/// Stops and joins `workers`.
fn shutdown(shared: &Shared, workers: &mut Vec<JoinHandle<()>>) {
    shared.request_stop();
    for (index, worker) in workers.drain(..).enumerate() {
        if worker.join().is_err() {
            warn!(worker = index, "worker thread panicked outside a round");
        }
    }
}

/// Waits out the current round when dropped, so the job's borrow of the
/// dispatcher's stack ends before the dispatcher returns or unwinds.
struct RoundGuard<'a> {
    shared: &'a Shared,
    finished: bool,
}

impl<'a> RoundGuard<'a> {
    fn new(shared: &'a Shared) -> Self {
        Self {
            shared,
            finished: false,
        }
    }

    fn finish(mut self) -> Option<PanicPayload> {
        self.finished = true;
        self.shared.end_round()
    }
}

impl Drop for RoundGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            // The caller's own range panicked; its panic wins over any worker's.
            drop(self.shared.end_round());
        }
    }
}
