//! src/serial.rs
//!
//! Single-threaded `Threads` implementation.
//!
//! Every round runs on the calling thread as one range. Useful when no
//! worker threads are wanted at all, and for deterministic debugging of
//! kernels written against `Threads`.

use crate::pool::{WorkRange, CALLER, FAST_PATH_MAX};
use crate::threads::Threads;

#[derive(Debug, Default, Clone, Copy)]
pub struct SerialThreads;

impl SerialThreads {
    pub fn new() -> Self {
        Self
    }
}

impl Threads for SerialThreads {
    fn participants(&self) -> usize {
        1
    }

    fn run<F>(&mut self, f: F, count: usize) -> usize
    where
        F: Fn(WorkRange) + Sync,
    {
        f(WorkRange::new(0, count, CALLER));
        1
    }

    fn reduce<T, F, C>(&mut self, f: F, combine: C, count: usize) -> T
    where
        T: Send,
        F: Fn(WorkRange) -> T + Sync,
        C: FnOnce(&[T], usize) -> T,
    {
        let partial = f(WorkRange::new(0, count, CALLER));
        if count <= FAST_PATH_MAX {
            return partial;
        }
        combine(std::slice::from_ref(&partial), 1)
    }
}
