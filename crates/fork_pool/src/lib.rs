//! Fixed-size fork-join thread pool for data-parallel numeric kernels.
//!
//! The calling thread always takes part in a round, next to `N` long-lived
//! workers. A round splits `[0, count)` into near-equal contiguous
//! [`WorkRange`]s, runs the callback once per participant and returns after
//! all of them have finished.
//!
//! ```ignore
//! use fork_pool::{ThreadPool, Threads};
//!
//! let mut pool = ThreadPool::new()?;
//! let xs: Vec<f64> = (0..10_000).map(|i| i as f64).collect();
//! let sum = pool.reduce(
//!     |range| xs[range.indices()].iter().sum::<f64>(),
//!     |partials, n| partials[..n].iter().sum(),
//!     xs.len(),
//! );
//! ```

pub mod pool;
pub mod serial;
pub mod threads;

pub use pool::{current_worker, PartitionedView, PoolConfig, PoolStats, ThreadPool, WorkRange};
pub use serial::SerialThreads;
pub use threads::Threads;
