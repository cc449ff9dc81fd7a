//! src/pool/partition.rs
//!
//! Deterministic splitting of an item count across the pool's participants.
//!
//! With `N` workers there are `N + 1` participants (the caller takes part too).
//! Every worker below the last active index gets `total / (N + 1)` items, the
//! first `total % (N + 1)` of them one extra, and the caller takes whatever is
//! left at the tail. When there are fewer items than workers, the trailing
//! workers stay idle for the round.
//!
//! Example with `total = 7` and 3 workers:
//! ```text
//! worker 0: [0, 2)   worker 1: [2, 4)   worker 2: [4, 6)   caller: [6, 7)
//! ```

use super::range::{WorkRange, CALLER};

/// Counts at or below this size are run in-line by the caller without waking
/// any worker.
pub const FAST_PATH_MAX: usize = 1;

/// Writes the partition of `[0, total)` into `workers` (worker `i` gets
/// participant id `i + 1`) and returns the caller's range.
///
/// Active workers always form a prefix of `workers`, and every active worker
/// as well as the caller receives at least one item once `total > 1`.
pub fn assign_ranges(total: usize, workers: &mut [WorkRange]) -> WorkRange {
    if total <= FAST_PATH_MAX {
        for (index, range) in workers.iter_mut().enumerate() {
            *range = WorkRange::idle(index + 1);
        }
        return WorkRange::new(0, total, CALLER);
    }

    let participants = workers.len() + 1;
    let last_active = total - 1;
    let each = total / participants;
    let residual = total % participants;

    let mut offset = 0;
    for (index, range) in workers.iter_mut().enumerate() {
        if index >= last_active {
            *range = WorkRange::idle(index + 1);
            continue;
        }
        let count = each + usize::from(index < residual);
        *range = WorkRange::new(offset, count, index + 1);
        offset += count;
    }

    WorkRange::new(offset, total - offset, CALLER)
}

/// A complete assignment of `[0, total)` to the caller and `N` workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    total: usize,
    caller: WorkRange,
    workers: Vec<WorkRange>,
}

impl Partition {
    pub fn compute(total: usize, num_workers: usize) -> Self {
        let mut workers = vec![WorkRange::default(); num_workers];
        let caller = assign_ranges(total, &mut workers);
        Self {
            total,
            caller,
            workers,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn caller(&self) -> WorkRange {
        self.caller
    }

    /// Per-worker ranges, indexed by worker (participant id minus one).
    pub fn workers(&self) -> &[WorkRange] {
        &self.workers
    }

    /// True when the caller runs everything in-line.
    pub fn is_fast_path(&self) -> bool {
        self.total <= FAST_PATH_MAX
    }

    pub fn active_workers(&self) -> usize {
        self.workers.iter().filter(|range| !range.is_idle()).count()
    }

    /// Number of participants that execute the callback this round.
    pub fn participant_count(&self) -> usize {
        self.active_workers() + 1
    }

    /// The caller's range followed by every active worker range.
    pub fn participants(&self) -> impl Iterator<Item = WorkRange> + '_ {
        std::iter::once(self.caller).chain(
            self.workers
                .iter()
                .copied()
                .filter(|range| !range.is_idle()),
        )
    }
}
