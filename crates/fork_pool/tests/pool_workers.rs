//! Worker lifecycle and concurrency tests for ThreadPool.
//!
//! Tests cover:
//! - Worker lifecycle (startup, teardown without rounds, teardown after rounds)
//! - Round completion (no worker left in flight after `run`/`reduce`)
//! - Panic handling (worker and caller panics, pool reuse afterwards)
//! - Concurrent behavior (all participants run simultaneously, caller takes part)

mod common;
use common::{pool, Recorder};
use fork_pool::{current_worker, PoolConfig, ThreadPool, Threads, WorkRange};

use anyhow::Result;
use crossbeam_channel::bounded;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;
use std::time::Duration;

const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// 1. Worker Lifecycle Tests
// ============================================================================

#[test]
fn test_teardown_without_rounds_joins_promptly() -> Result<()> {
    let (done_tx, done_rx) = bounded(1);

    thread::spawn(move || {
        let result = pool(4).map(drop);
        let _ = done_tx.send(result.is_ok());
    });

    let constructed = done_rx
        .recv_timeout(TEARDOWN_TIMEOUT)
        .map_err(|_| anyhow::anyhow!("pool did not construct and join within {:?}", TEARDOWN_TIMEOUT))?;
    assert!(constructed);
    Ok(())
}

#[test]
fn test_teardown_after_rounds_joins_promptly() -> Result<()> {
    let (done_tx, done_rx) = bounded(1);

    thread::spawn(move || -> Result<()> {
        let mut pool = pool(3)?;
        for count in [7, 100, 2] {
            pool.run(|_| {}, count);
        }
        drop(pool);
        let _ = done_tx.send(());
        Ok(())
    });

    assert!(done_rx.recv_timeout(TEARDOWN_TIMEOUT).is_ok());
    Ok(())
}

#[test]
fn test_default_pool_uses_at_least_one_worker() -> Result<()> {
    let pool = ThreadPool::new()?;
    assert!(pool.num_workers() >= 1);
    assert_eq!(pool.worker_handles().len(), pool.num_workers());
    assert_eq!(pool.participants(), pool.num_workers() + 1);
    Ok(())
}

#[test]
fn test_many_pools_side_by_side() -> Result<()> {
    let mut pools = (0..4).map(|_| pool(2)).collect::<Result<Vec<_>>>()?;

    for (i, pool) in pools.iter_mut().enumerate() {
        let total = pool.reduce(
            |range| range.count,
            |partials, n| partials[..n].iter().sum(),
            100 + i,
        );
        assert_eq!(total, 100 + i);
    }
    Ok(())
}

// ============================================================================
// 2. Round Completion
// ============================================================================

#[test]
fn test_round_completion_counts_every_active_worker() -> Result<()> {
    let mut pool = pool(3)?;
    let mut expected_completions = 0;

    for count in [2, 3, 4, 7, 1_000] {
        let used = pool.run(|_| thread::sleep(Duration::from_millis(1)), count);
        expected_completions += (used - 1) as u64;

        assert!(pool.is_idle(), "round for {} items left workers in flight", count);
        assert_eq!(pool.stats().worker_completions, expected_completions);
    }

    let used = pool.partition(50).participant_count();
    pool.reduce(|range| range.count, |p, n| p[..n].iter().sum(), 50);
    expected_completions += (used - 1) as u64;
    assert!(pool.is_idle());
    assert_eq!(pool.stats().worker_completions, expected_completions);
    Ok(())
}

// ============================================================================
// 3. Panic Handling
// ============================================================================

#[test]
fn test_worker_panic_reaches_caller_and_pool_survives() -> Result<()> {
    let mut pool = pool(3)?;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pool.run(
            |range| {
                if range.participant == 2 {
                    panic!("worker failure");
                }
            },
            40,
        )
    }));

    let payload = outcome.err().expect("worker panic should reach the caller");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"worker failure"));
    assert!(pool.is_idle());

    let total = pool.reduce(|range| range.count, |p, n| p[..n].iter().sum(), 40);
    assert_eq!(total, 40);
    Ok(())
}

#[test]
fn test_caller_panic_waits_for_workers() -> Result<()> {
    let mut pool = pool(2)?;
    let finished_workers = AtomicUsize::new(0);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pool.run(
            |range| {
                if range.is_caller() {
                    panic!("caller failure");
                }
                thread::sleep(Duration::from_millis(20));
                finished_workers.fetch_add(1, Ordering::SeqCst);
            },
            30,
        )
    }));

    assert!(outcome.is_err());
    // Unwinding out of `run` only happens after both workers have reported.
    assert_eq!(finished_workers.load(Ordering::SeqCst), 2);
    assert!(pool.is_idle());
    assert_eq!(pool.run(|_| {}, 30), 3);
    Ok(())
}

// ============================================================================
// 4. Concurrent Behavior
// ============================================================================

#[test]
fn test_all_participants_run_concurrently() -> Result<()> {
    let mut pool = pool(3)?;
    let rendezvous = Barrier::new(4);

    // Deadlocks unless caller and all three workers are inside the round at once.
    let used = pool.run(
        |_| {
            rendezvous.wait();
        },
        100,
    );

    assert_eq!(used, 4);
    Ok(())
}

#[test]
fn test_caller_runs_tail_and_workers_run_their_own_ranges() -> Result<()> {
    let mut pool = pool(3)?;
    let recorder = Recorder::new();

    pool.run(|range| recorder.record(range), 7);

    let seen = recorder.drain();
    assert_eq!(seen.len(), 4);
    for observation in &seen {
        if observation.range.is_caller() {
            assert_eq!(observation.worker, None);
            assert_eq!(observation.range, WorkRange::new(6, 1, 0));
        } else {
            assert_eq!(observation.worker, Some(observation.range.participant - 1));
        }
    }

    let threads: HashSet<_> = seen.iter().map(|o| o.worker).collect();
    assert_eq!(threads.len(), 4);
    Ok(())
}

#[test]
fn test_current_worker_is_none_on_caller() {
    assert_eq!(current_worker(), None);
}

#[test]
fn test_worker_writes_visible_after_return() -> Result<()> {
    let mut pool = pool(3)?;
    let mut out = vec![0u64; 4_096];

    for round in 1..=20u64 {
        pool.for_each_chunk_mut(&mut out, |range, chunk| {
            for (i, x) in range.indices().zip(chunk.iter_mut()) {
                *x = i as u64 * round;
            }
        })?;
        assert!(out.iter().enumerate().all(|(i, &x)| x == i as u64 * round));
    }
    Ok(())
}

#[test]
fn test_custom_stack_size_pool_runs() -> Result<()> {
    let mut pool = ThreadPool::with_config(
        PoolConfig::builder()
            .num_workers(2)
            .stack_size(256 * 1024)
            .build(),
    )?;
    let total = pool.reduce(|range| range.count, |p, n| p[..n].iter().sum(), 9);
    assert_eq!(total, 9);
    Ok(())
}
