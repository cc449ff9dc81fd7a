//! src/pool/job.rs
//!
//! The job descriptor published to workers for one round.
//!
//! A `Job` holds a borrowed callback whose lifetime has been erased so it can
//! travel to the long-lived workers. The dispatcher guarantees the borrow stays
//! valid: it does not return (or unwind) before every worker has reported and
//! dropped its handle to the job.

use std::sync::Mutex;

use super::common::lock;
use super::range::WorkRange;

type RunFn = dyn Fn(WorkRange) + Sync;

/// Receives one participant's range during a reduce round and stores the
/// partial result in that participant's slot.
pub(crate) trait ReduceSink: Sync {
    fn evaluate(&self, range: WorkRange);
}

/// The round's work, shared read-only by every participant.
#[derive(Clone, Copy)]
pub(crate) enum Job {
    Run(&'static RunFn),
    Reduce(&'static dyn ReduceSink),
}

impl Job {
    /// # Safety
    /// The returned job must not be used after `f` goes out of scope.
    pub(crate) unsafe fn run<'a>(f: &'a (dyn Fn(WorkRange) + Sync + 'a)) -> Self {
        // SAFETY: only the lifetime changes; the caller bounds the job's use.
        Job::Run(unsafe {
            std::mem::transmute::<&'a (dyn Fn(WorkRange) + Sync + 'a), &'static RunFn>(f)
        })
    }

    /// # Safety
    /// The returned job must not be used after `sink` goes out of scope.
    pub(crate) unsafe fn reduce<'a>(sink: &'a (dyn ReduceSink + 'a)) -> Self {
        // SAFETY: only the lifetime changes; the caller bounds the job's use.
        Job::Reduce(unsafe {
            std::mem::transmute::<&'a (dyn ReduceSink + 'a), &'static dyn ReduceSink>(sink)
        })
    }

    pub(crate) fn execute(&self, range: WorkRange) {
        match self {
            Job::Run(f) => f(range),
            Job::Reduce(sink) => sink.evaluate(range),
        }
    }
}

/// Per-participant partial results of one reduce round.
///
/// Slot 0 belongs to the caller, slot `i + 1` to worker `i`.
pub(crate) struct ReduceSlots<'a, T, F> {
    map: &'a F,
    slots: Vec<Mutex<Option<T>>>,
}

impl<'a, T, F> ReduceSlots<'a, T, F>
where
    T: Send,
    F: Fn(WorkRange) -> T + Sync,
{
    pub(crate) fn new(map: &'a F, participants: usize) -> Self {
        Self {
            map,
            slots: (0..participants).map(|_| Mutex::new(None)).collect(),
        }
    }

    /// The populated slots `0..participants`, in participant order.
    pub(crate) fn into_partials(self, participants: usize) -> Vec<T> {
        let partials: Vec<T> = self
            .slots
            .into_iter()
            .take(participants)
            .filter_map(|slot| slot.into_inner().unwrap_or_else(|e| e.into_inner()))
            .collect();
        debug_assert_eq!(partials.len(), participants, "reduce slot left empty");
        partials
    }
}

impl<T, F> ReduceSink for ReduceSlots<'_, T, F>
where
    T: Send,
    F: Fn(WorkRange) -> T + Sync,
{
    fn evaluate(&self, range: WorkRange) {
        let partial = (self.map)(range);
        *lock(&self.slots[range.participant]) = Some(partial);
    }
}
