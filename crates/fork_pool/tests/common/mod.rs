use fork_pool::{PoolConfig, ThreadPool, WorkRange};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Installs a test-friendly tracing subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Pool with an explicit worker count, so tests do not depend on the host.
pub fn pool(num_workers: usize) -> Result<ThreadPool> {
    init_tracing();
    ThreadPool::with_config(
        PoolConfig::builder()
            .num_workers(num_workers)
            .thread_name("test-worker")
            .build(),
    )
}

/// One callback invocation as seen from inside the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub range: WorkRange,
    pub worker: Option<usize>,
}

/// Collects observations sent from callbacks running on any thread.
pub struct Recorder {
    tx: Sender<Observation>,
    rx: Receiver<Observation>,
}

impl Recorder {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn record(&self, range: WorkRange) {
        let _ = self.tx.send(Observation {
            range,
            worker: fork_pool::current_worker(),
        });
    }

    /// Everything recorded so far, sorted by offset.
    pub fn drain(&self) -> Vec<Observation> {
        let mut seen: Vec<Observation> = self.rx.try_iter().collect();
        seen.sort_by_key(|observation| (observation.range.offset, observation.range.participant));
        seen
    }
}
