//! Explicitly owned worker pool
//!
//! Parallel work never runs on an ambient global pool. Callers create a
//! [`WorkerPool`] right before a parallel batch, pass it by reference to
//! whatever needs it, and the threads are released when the value is dropped,
//! on every exit path.

use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;

/// Worker pool errors
#[derive(Debug, Error)]
pub enum PoolError {
    /// Thread pool could not be started
    #[error("Failed to start worker pool: {0}")]
    Build(#[from] ThreadPoolBuildError),

    /// Zero threads requested
    #[error("Worker pool needs at least one thread")]
    NoThreads,
}

/// Scoped pool of worker threads
#[derive(Debug)]
pub struct WorkerPool {
    inner: ThreadPool,
}

impl WorkerPool {
    /// Start a pool with `num_threads` workers, or one per CPU when `None`
    pub fn new(num_threads: Option<usize>) -> Result<Self, PoolError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("fmmc-worker-{i}"));
        if let Some(n) = num_threads {
            if n == 0 {
                return Err(PoolError::NoThreads);
            }
            builder = builder.num_threads(n);
        }
        let inner = builder.build()?;
        tracing::debug!("Started worker pool with {} threads", inner.current_num_threads());
        Ok(Self { inner })
    }

    /// Number of worker threads
    pub fn num_threads(&self) -> usize {
        self.inner.current_num_threads()
    }

    /// Run `op` inside the pool; parallel iterators in `op` use its workers
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.inner.install(op)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        tracing::debug!(
            "Shutting down worker pool with {} threads",
            self.inner.current_num_threads()
        );
    }
}
