//! Bounded worker pool for long-running bulk downloads.
//!
//! Bulk album downloads are slow and can saturate the remote service, so
//! they run as separate Tokio tasks gated by a semaphore. The initiating
//! request awaits its task; unrelated requests keep being served meanwhile.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{debug, instrument};

/// Minimum allowed pool size.
const MIN_WORKERS: usize = 1;

/// Maximum allowed pool size.
const MAX_WORKERS: usize = 16;

/// Default pool size if not configured.
pub const DEFAULT_WORKERS: usize = 2;

/// Error type for worker pool operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Invalid pool size provided.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidSize {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("worker pool closed unexpectedly")]
    Closed,

    /// The task panicked before producing a result.
    #[error("worker task panicked")]
    Panicked,

    /// The task was cancelled by the runtime (e.g. during shutdown).
    #[error("worker task was cancelled")]
    Cancelled,
}

impl From<JoinError> for WorkerError {
    fn from(error: JoinError) -> Self {
        if error.is_panic() {
            Self::Panicked
        } else {
            Self::Cancelled
        }
    }
}

/// Semaphore-bounded set of spawned tasks.
///
/// # Concurrency Model
///
/// - A permit is acquired before the task is spawned, so excess work waits
///   in the caller rather than piling up as idle tasks
/// - The permit moves into the task and is released when it finishes (RAII)
/// - Each task runs on the runtime's worker threads, off the caller's task
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Creates a pool running at most `size` tasks at once.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::InvalidSize`] if `size` is outside 1-16.
    #[instrument(level = "debug")]
    pub fn new(size: usize) -> Result<Self, WorkerError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&size) {
            return Err(WorkerError::InvalidSize { value: size });
        }
        debug!(size, "creating worker pool");
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        })
    }

    /// Returns the configured pool size.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns how many more tasks could start right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Runs `task` on a pool worker and waits for its output.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Closed`] if the pool was shut down, and
    /// [`WorkerError::Panicked`] / [`WorkerError::Cancelled`] if the task
    /// did not finish normally.
    pub async fn run<F, T>(&self, task: F) -> Result<T, WorkerError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::Closed)?;

        let handle = tokio::spawn(async move {
            let _permit = permit;
            task.await
        });
        Ok(handle.await?)
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(DEFAULT_WORKERS)),
            size: DEFAULT_WORKERS,
        }
    }
}
