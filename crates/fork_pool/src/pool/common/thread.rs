//! Thread-local storage for worker identification.
//!
//! Each pool worker records its index when it starts, so callbacks can tell
//! whether they are running on a worker or on the dispatching thread.

use std::cell::Cell;

thread_local! {
    /// Thread-local worker index.
    ///
    /// Set to `Some(index)` (0 to num_workers-1) on pool worker threads,
    /// `None` everywhere else.
    pub static WORKER_INDEX: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Marks the current thread as pool worker `index`.
pub(crate) fn set_worker_index(index: usize) {
    WORKER_INDEX.with(|id| id.set(Some(index)));
}

/// Index of the pool worker running the current thread, or `None` on a
/// thread the pool did not spawn.
pub fn current_worker() -> Option<usize> {
    WORKER_INDEX.with(Cell::get)
}
