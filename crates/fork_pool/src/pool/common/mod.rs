//! src/pool/common/mod.rs
//!
//! Utilities shared by the pool, its workers and the reduce slots.

pub mod thread;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the guard if a previous holder panicked.
///
/// User callbacks never run while a pool lock is held, so a poisoned lock
/// still guards consistent state.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
