//! src/pool/mod.rs
//!
//! This module implements the fork-join `ThreadPool`.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller ── run(f, count) ──> ┌─────────────┐
//!                               │ Partitioner │ (count → one WorkRange per participant)
//!                               └──────┬──────┘
//!                                      │ ranges + Arc<Job>, published under the pool lock
//!                                      ↓
//!          ┌────────────┬──────────────┼──────────────┐
//!          ↓            ↓              ↓              ↓
//!      worker 0     worker 1   ...  worker N-1     caller (tail range, in-line)
//!          │            │              │              │
//!          └────────────┴──── report ──┴──────────────┘
//!                                      │ working == 0
//!                                      ↓
//!                               run/reduce returns
//! ```
//!
//! # Module Structure
//!
//! ```text
//! src/pool/
//! ├── mod.rs          # Public API exports + module-level architecture docs
//! ├── config.rs       # PoolConfig, builder, env override
//! ├── range.rs        # WorkRange
//! ├── partition.rs    # Partitioner and fast path
//! ├── view.rs         # PartitionedView (checked disjoint buffer split)
//! ├── job.rs          # Job descriptor and reduce slots
//! ├── worker.rs       # Shared round state and the worker state machine
//! ├── thread_pool.rs  # ThreadPool construction, dispatch and shutdown
//! └── common/
//!     ├── mod.rs      # Lock helper
//!     └── thread.rs   # Thread-local worker index
//! ```
//!
//! # Notes
//! - One round at a time: `run`/`reduce` take `&mut self`.
//! - Counts of 0 or 1 never wake a worker; the callback runs once on the
//!   caller with `[0, count)`.
//! - A panic in any participant's callback is re-raised on the caller after
//!   the round has finished; the pool stays usable.

mod common;
mod config;
mod job;
mod partition;
mod range;
mod thread_pool;
mod view;
mod worker;

pub use common::thread::{current_worker, WORKER_INDEX};
pub use config::{
    default_num_workers, parse_num_workers, PoolConfig, PoolConfigBuilder, NUM_WORKERS_ENV,
};
pub use partition::{assign_ranges, Partition, FAST_PATH_MAX};
pub use range::{WorkRange, CALLER};
pub use thread_pool::{PoolStats, ThreadPool};
pub use view::PartitionedView;
