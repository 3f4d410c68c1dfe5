//! Terminal lifecycle: per-handle destroy, graceful shutdown, force-kill-all,
//! and OS signal wiring.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::core::error::PoolError;
use crate::core::factory::WorkerFactory;
use crate::core::handle::WorkerHandle;
use crate::core::pool::WorkerPool;

/// Bound applied when an OS termination signal triggers shutdown.
const SIGNAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

impl<F: WorkerFactory> WorkerPool<F> {
    /// Destroy a worker that has already been removed from the pool's
    /// collection: graceful termination bounded by the close timeout, then a
    /// forced kill on error or expiry. Termination failures are logged, never
    /// propagated; "already gone" and "no permission" count as success.
    pub(crate) async fn destroy_worker(&self, handle: WorkerHandle<F::Worker>, reason: &str) {
        debug!(
            worker_id = handle.id,
            use_count = handle.use_count,
            age_ms = handle.created_at.elapsed().as_millis() as u64,
            reason,
            "destroying worker"
        );
        let close_timeout = self.config.close_timeout();
        let graceful = tokio::time::timeout(
            close_timeout,
            self.factory.terminate_gracefully(&handle.worker, close_timeout),
        )
        .await;
        match graceful {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.is_benign() => {
                debug!(worker_id = handle.id, "worker was already gone: {e}");
            }
            Ok(Err(e)) => {
                error!(
                    worker_id = handle.id,
                    "graceful termination failed: {e}; forcing"
                );
                self.factory.force_terminate(&handle.worker);
            }
            Err(_) => {
                warn!(
                    worker_id = handle.id,
                    "graceful termination timed out; forcing"
                );
                self.factory.force_terminate(&handle.worker);
            }
        }
        self.counters.destroyed.fetch_add(1, Ordering::Relaxed);
    }

    /// Gracefully shut the pool down: fail all future `acquire` calls, stop
    /// the guardian, reject every queued waiter, close every worker bounded
    /// by `timeout`, then force-kill whatever is left. Idempotent: a second
    /// call while shutdown is in progress (or done) is a no-op.
    pub async fn shutdown(&self, timeout: Duration) {
        if self.shutdown_started.swap(true, Ordering::SeqCst) {
            debug!("shutdown already in progress; ignoring");
            return;
        }
        info!("pool shutdown requested");

        let (handles, waiters) = {
            let mut inner = self.inner.lock();
            inner.shutting_down = true;
            (
                std::mem::take(&mut inner.handles),
                inner.waiters.drain_all(),
            )
        };

        self.stop_guardian().await;

        for waiter in waiters {
            let _ = waiter.tx.send(Err(PoolError::ShuttingDown));
        }

        let close_timeout = self.config.close_timeout();
        let mut terminations = JoinSet::new();
        let workers: Vec<_> = handles.into_iter().map(|h| (h.id, h.worker)).collect();
        for (id, worker) in &workers {
            let factory = Arc::clone(&self.factory);
            let worker = Arc::clone(worker);
            let id = *id;
            terminations.spawn(async move {
                match factory.terminate_gracefully(&worker, close_timeout).await {
                    Ok(()) => {}
                    Err(e) if e.is_benign() => {}
                    Err(e) => warn!(
                        worker_id = id,
                        "graceful termination failed during shutdown: {e}"
                    ),
                }
            });
        }
        let timed_out = tokio::time::timeout(timeout, async {
            while terminations.join_next().await.is_some() {}
        })
        .await
        .is_err();
        if timed_out {
            warn!("graceful shutdown exceeded {timeout:?}; force-terminating stragglers");
            terminations.abort_all();
        }

        // Unconditional final pass. force_terminate is idempotent, so hitting
        // workers that already closed gracefully is harmless.
        for (_, worker) in &workers {
            self.factory.force_terminate(worker);
        }
        self.counters
            .destroyed
            .fetch_add(workers.len() as u64, Ordering::Relaxed);
        info!(workers = workers.len(), "pool shutdown complete");
    }

    /// Unconditional, synchronous, best-effort termination of every worker
    /// and rejection of every queued waiter, without waiting for graceful
    /// termination. Last-resort reflex for a top-level fault handler; never
    /// panics.
    pub fn force_kill_all(&self) {
        let (handles, waiters) = {
            let mut inner = self.inner.lock();
            inner.shutting_down = true;
            (
                std::mem::take(&mut inner.handles),
                inner.waiters.drain_all(),
            )
        };
        for waiter in waiters {
            let _ = waiter.tx.send(Err(PoolError::ShuttingDown));
        }
        for handle in &handles {
            self.factory.force_terminate(&handle.worker);
        }
        self.counters
            .destroyed
            .fetch_add(handles.len() as u64, Ordering::Relaxed);
        warn!(workers = handles.len(), "force-killed all workers");
    }

    /// Spawn a task that waits for SIGINT/SIGTERM and runs a bounded graceful
    /// shutdown when one arrives. The task holds only a weak reference, so it
    /// does not keep a dropped pool alive.
    pub fn install_signal_handlers(&self) {
        let weak = self.self_ref.clone();
        tokio::spawn(async move {
            wait_for_termination_signal().await;
            if let Some(pool) = weak.upgrade() {
                info!("termination signal received; shutting down worker pool");
                pool.shutdown(SIGNAL_SHUTDOWN_TIMEOUT).await;
            }
        });
    }
}

#[cfg(unix)]
async fn wait_for_termination_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!("failed to register SIGTERM handler: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_termination_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
