//! src/threads.rs
//!
//! The interface compute kernels are written against.
//!
//! Kernels take `&mut impl Threads` and stay agnostic of whether they run on
//! a [`ThreadPool`](crate::ThreadPool) or on [`SerialThreads`](crate::SerialThreads).

use anyhow::Result;

use crate::pool::{Partition, PartitionedView, WorkRange};

/// Synchronous data-parallel execution over an index space `[0, count)`.
pub trait Threads {
    /// Threads that take part in a round: the workers plus the caller.
    fn participants(&self) -> usize;

    /// The partition `run` and `reduce` will use for `count` items.
    fn partition(&self, count: usize) -> Partition {
        Partition::compute(count, self.participants() - 1)
    }

    /// Calls `f` once per participant with that participant's range and
    /// returns once all calls have finished. Returns the number of threads
    /// that executed `f`.
    fn run<F>(&mut self, f: F, count: usize) -> usize
    where
        F: Fn(WorkRange) + Sync;

    /// Like `run`, collecting one partial result per participant and folding
    /// them with `combine(partials, participants)`.
    ///
    /// For `count <= 1` the single partial is returned without calling
    /// `combine`.
    fn reduce<T, F, C>(&mut self, f: F, combine: C, count: usize) -> T
    where
        T: Send,
        F: Fn(WorkRange) -> T + Sync,
        C: FnOnce(&[T], usize) -> T;

    /// Runs `f` over disjoint mutable chunks of `data`, one per participant.
    fn for_each_chunk_mut<T, F>(&mut self, data: &mut [T], f: F) -> Result<usize>
    where
        T: Send,
        F: Fn(WorkRange, &mut [T]) + Sync,
    {
        let partition = self.partition(data.len());
        let view = PartitionedView::split(data, partition.participants())?;
        let threads_used = self.run(
            |range| match view.take(range) {
                Ok(chunk) => f(range, chunk),
                Err(e) => panic!("partitioned view out of step with the pool: {:#}", e),
            },
            partition.total(),
        );
        Ok(threads_used)
    }
}
