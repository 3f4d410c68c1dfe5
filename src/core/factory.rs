//! Worker factory abstraction and factory-side error types.
//!
//! The pool never knows how a worker process is started, probed, or killed.
//! The embedding application supplies a [`WorkerFactory`] and the pool drives
//! it through the worker lifecycle: create, probe, reset, terminate.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Failure modes of a termination call.
///
/// The pool treats the benign variants as a *successful* destruction: the goal
/// of destroy is "resource is no longer tracked", not "the termination call
/// returned success". See [`TerminateError::is_benign`].
#[derive(Debug, Error)]
pub enum TerminateError {
    /// The worker process had already exited on its own.
    #[error("worker already exited")]
    AlreadyExited,
    /// The signal could not be delivered for permission reasons.
    #[error("insufficient permission to signal worker")]
    PermissionDenied,
    /// Any other termination failure, with context.
    #[error("termination failed: {0}")]
    Other(String),
}

impl TerminateError {
    /// Whether this failure still counts as a successful destruction.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::AlreadyExited | Self::PermissionDenied)
    }
}

/// Errors produced by worker factory operations other than termination.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// The underlying worker process could not be started.
    #[error("worker creation failed: {0}")]
    Create(String),
    /// The worker could not be returned to a clean reusable state.
    #[error("worker reset failed: {0}")]
    Reset(String),
}

/// Creates and terminates heavyweight worker processes on behalf of the pool.
///
/// Implementations wrap whatever the worker actually is: a browser engine, a
/// language runtime, a sandbox process. The pool only requires that workers
/// can be created, health-probed, reset between uses, and terminated.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use worker_lot::{FactoryError, TerminateError, WorkerFactory};
/// use std::time::Duration;
///
/// struct BrowserFactory;
///
/// #[async_trait]
/// impl WorkerFactory for BrowserFactory {
///     type Worker = Browser;
///
///     async fn create(&self) -> Result<Browser, FactoryError> {
///         Browser::launch().await.map_err(|e| FactoryError::Create(e.to_string()))
///     }
///
///     async fn probe_health(&self, browser: &Browser) -> bool {
///         browser.pages().await.is_ok()
///     }
///
///     async fn reset_for_reuse(&self, browser: &Browser) -> Result<(), FactoryError> {
///         browser.close_extra_pages().await.map_err(|e| FactoryError::Reset(e.to_string()))
///     }
///
///     async fn terminate_gracefully(
///         &self,
///         browser: &Browser,
///         timeout: Duration,
///     ) -> Result<(), TerminateError> {
///         browser.close_within(timeout).await
///     }
///
///     fn force_terminate(&self, browser: &Browser) {
///         browser.kill(); // SIGKILL-style, idempotent
///     }
/// }
/// ```
#[async_trait]
pub trait WorkerFactory: Send + Sync + 'static {
    /// The worker process resource handed out to callers.
    type Worker: Send + Sync + 'static;

    /// Start a new worker process. May suspend while the process boots.
    async fn create(&self) -> Result<Self::Worker, FactoryError>;

    /// Cheap liveness probe run before a released worker is returned to the
    /// idle set. `false` means the worker is destroyed instead of reused.
    async fn probe_health(&self, worker: &Self::Worker) -> bool;

    /// Return a worker to a clean reusable state (close auxiliary resources
    /// it opened during use). A failure here destroys the worker rather than
    /// returning a possibly-corrupted resource to the idle set.
    async fn reset_for_reuse(&self, worker: &Self::Worker) -> Result<(), FactoryError>;

    /// Request graceful termination, bounded by `timeout`. The pool falls
    /// back to [`force_terminate`](Self::force_terminate) on error or timeout.
    async fn terminate_gracefully(
        &self,
        worker: &Self::Worker,
        timeout: Duration,
    ) -> Result<(), TerminateError>;

    /// Forcibly terminate a worker. Must be idempotent and must not panic if
    /// the underlying process is already gone.
    fn force_terminate(&self, worker: &Self::Worker);
}
