//! Error types for pool operations.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced to callers of the pool API.
///
/// Failures local to a single worker's cleanup path (termination, eviction)
/// are logged and swallowed internally; they never appear here.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The wait queue is at capacity; the request was rejected without queueing.
    #[error("wait queue full: {queued} requests already waiting (max {max})")]
    QueueFull {
        /// Requests waiting when the rejection happened.
        queued: usize,
        /// Configured queue bound.
        max: usize,
    },
    /// A queued request exceeded its wait bound.
    #[error("timed out after {timeout:?} waiting for a worker ({total} workers, {acquired} acquired)")]
    AcquireTimeout {
        /// The timeout the caller asked for.
        timeout: Duration,
        /// Total pooled workers at the moment the timeout fired.
        total: usize,
        /// Workers held by callers at the moment the timeout fired.
        acquired: usize,
    },
    /// The pool is shutting down (or already shut down).
    #[error("pool is shutting down")]
    ShuttingDown,
    /// The worker factory could not produce a worker for this request.
    #[error("worker creation failed: {0}")]
    Creation(String),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
