//! The pool core: acquire, release, stats, and wait-queue draining.
//!
//! All shared mutable state lives in [`PoolInner`] behind a single
//! `parking_lot::Mutex`. The lock is never held across an `.await`: every
//! suspension point (worker creation, health probe, termination) runs with
//! the lock released, so independent operations never block each other.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::core::error::PoolError;
use crate::core::factory::WorkerFactory;
use crate::core::guardian::GuardianTask;
use crate::core::handle::{Lease, WorkerHandle, WorkerId};
use crate::core::wait_queue::{AcquireResult, WaitQueue, Waiter};

/// Shared mutable pool state. Guarded by the pool mutex; mutated only through
/// the pool's own entry points, never by callers directly.
pub(crate) struct PoolInner<W> {
    pub handles: Vec<WorkerHandle<W>>,
    pub waiters: WaitQueue<W>,
    /// Creation slots reserved but not yet materialized as handles. Counted
    /// against the ceiling so concurrent creations cannot overshoot it.
    pub pending_creates: usize,
    pub shutting_down: bool,
}

/// Lifetime counters, diagnostic only.
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub created: AtomicU64,
    pub reused: AtomicU64,
    pub destroyed: AtomicU64,
    pub wait_timeouts: AtomicU64,
}

/// Point-in-time snapshot of pool occupancy, lifetime counters, and the
/// effective configuration. Safe to take at any time, including mid-shutdown.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    /// Workers currently tracked by the pool.
    pub total: usize,
    /// Workers held by callers.
    pub acquired: usize,
    /// Workers waiting in the idle set.
    pub idle: usize,
    /// Callers waiting in the queue.
    pub queued: usize,
    /// Worker processes currently booting.
    pub creating: usize,
    /// Workers created over the pool's lifetime.
    pub workers_created: u64,
    /// Acquisitions served from the idle set over the pool's lifetime.
    pub workers_reused: u64,
    /// Workers destroyed over the pool's lifetime.
    pub workers_destroyed: u64,
    /// Queued acquisitions that timed out over the pool's lifetime.
    pub wait_timeouts: u64,
    /// The configuration the pool is running with.
    pub config: PoolConfig,
}

/// What `acquire` decided to do after the locked fast path.
enum Next<W> {
    Create,
    Wait(oneshot::Receiver<AcquireResult<W>>, u64),
}

/// A bounded pool of heavyweight worker processes.
///
/// Caps concurrency at `max_workers`, reuses idle workers, queues excess
/// `acquire` calls FIFO up to `max_queue_size`, and (with the guardian
/// running) autonomously reclaims stuck and idle workers. Construct with
/// [`WorkerPool::new`]; the pool is always handled through an [`Arc`].
pub struct WorkerPool<F: WorkerFactory> {
    pub(crate) config: PoolConfig,
    pub(crate) factory: Arc<F>,
    pub(crate) inner: Mutex<PoolInner<F::Worker>>,
    pub(crate) counters: PoolCounters,
    pub(crate) guardian: Mutex<Option<GuardianTask>>,
    pub(crate) shutdown_started: AtomicBool,
    pub(crate) self_ref: Weak<Self>,
    next_worker_id: AtomicU64,
    next_waiter_id: AtomicU64,
}

impl<F: WorkerFactory> std::fmt::Debug for WorkerPool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<F: WorkerFactory> WorkerPool<F> {
    /// Create a pool around a worker factory. Fails only when the
    /// configuration does not validate. No workers are started eagerly;
    /// creation is driven by demand.
    pub fn new(config: PoolConfig, factory: F) -> Result<Arc<Self>, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;
        let max_queue = config.max_queue_size;
        Ok(Arc::new_cyclic(|weak| Self {
            factory: Arc::new(factory),
            inner: Mutex::new(PoolInner {
                handles: Vec::new(),
                waiters: WaitQueue::new(max_queue),
                pending_creates: 0,
                shutting_down: false,
            }),
            counters: PoolCounters::default(),
            guardian: Mutex::new(None),
            shutdown_started: AtomicBool::new(false),
            self_ref: weak.clone(),
            next_worker_id: AtomicU64::new(1),
            next_waiter_id: AtomicU64::new(1),
            config,
        }))
    }

    /// The configuration the pool is running with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Acquire a worker, in priority order: an idle worker immediately, a
    /// freshly created one while under the ceiling, otherwise a FIFO queue
    /// slot bounded by `timeout`.
    ///
    /// `timeout` bounds only the time spent waiting in the queue; direct
    /// creation suspends for as long as the factory needs.
    ///
    /// # Errors
    ///
    /// [`PoolError::ShuttingDown`] once shutdown has begun,
    /// [`PoolError::QueueFull`] when the wait queue is at capacity (the
    /// request is never queued), [`PoolError::AcquireTimeout`] when the queue
    /// wait exceeds `timeout`, and [`PoolError::Creation`] when the factory
    /// cannot start a worker for this request.
    pub async fn acquire(&self, timeout: Duration) -> Result<Lease<F::Worker>, PoolError> {
        let next = {
            let mut inner = self.inner.lock();
            if inner.shutting_down {
                return Err(PoolError::ShuttingDown);
            }
            if let Some(lease) = self.claim_idle(&mut inner) {
                return Ok(lease);
            }
            if inner.handles.len() + inner.pending_creates < self.config.max_workers {
                inner.pending_creates += 1;
                Next::Create
            } else if inner.waiters.is_full() {
                warn!(
                    queued = inner.waiters.len(),
                    "acquire rejected: wait queue full"
                );
                return Err(PoolError::QueueFull {
                    queued: inner.waiters.len(),
                    max: inner.waiters.max(),
                });
            } else {
                let (tx, rx) = oneshot::channel();
                let waiter_id = self.next_waiter_id.fetch_add(1, Ordering::Relaxed);
                inner.waiters.push(Waiter {
                    id: waiter_id,
                    enqueued_at: Instant::now(),
                    tx,
                });
                debug!(waiter_id, queued = inner.waiters.len(), "acquire queued");
                Next::Wait(rx, waiter_id)
            }
        };

        match next {
            Next::Create => self.create_for_caller().await,
            Next::Wait(rx, waiter_id) => self.wait_for_turn(rx, waiter_id, timeout).await,
        }
    }

    /// Return a worker to the pool. Never fails: every failure path inside
    /// resolves to an internal destroy-and-drain.
    ///
    /// A worker the pool does not recognize (foreign, or already evicted by
    /// the guardian) is force-terminated on the spot so callers cannot leak a
    /// process through us.
    pub async fn release(&self, worker: Arc<F::Worker>) {
        let id = {
            let inner = self.inner.lock();
            inner
                .handles
                .iter()
                .find(|h| Arc::ptr_eq(&h.worker, &worker))
                .map(|h| h.id)
        };
        let Some(id) = id else {
            warn!("release of untracked worker; force-terminating");
            self.factory.force_terminate(&worker);
            return;
        };

        let healthy = self.factory.probe_health(&worker).await;
        let reusable = if healthy {
            match self.factory.reset_for_reuse(&worker).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(worker_id = id, error = %e, "reset failed; destroying worker");
                    false
                }
            }
        } else {
            warn!(worker_id = id, "health probe failed; destroying worker");
            false
        };

        if reusable {
            let mut inner = self.inner.lock();
            // The guardian may have evicted the handle while the probe ran;
            // in that case the worker is already on its way out.
            if let Some(handle) = inner.handles.iter_mut().find(|h| h.id == id) {
                handle.mark_idle(Instant::now());
                debug!(worker_id = id, "worker released to idle set");
            }
        } else if let Some(handle) = self.take_handle(id) {
            self.destroy_worker(handle, "unhealthy at release").await;
        }

        // Final step on both paths: hand freed capacity to the oldest waiters.
        self.drain_wait_queue();
    }

    /// Point-in-time occupancy snapshot. Pure read, no side effects.
    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.lock();
        let acquired = inner.handles.iter().filter(|h| h.is_acquired).count();
        PoolStats {
            total: inner.handles.len(),
            acquired,
            idle: inner.handles.len() - acquired,
            queued: inner.waiters.len(),
            creating: inner.pending_creates,
            workers_created: self.counters.created.load(Ordering::Relaxed),
            workers_reused: self.counters.reused.load(Ordering::Relaxed),
            workers_destroyed: self.counters.destroyed.load(Ordering::Relaxed),
            wait_timeouts: self.counters.wait_timeouts.load(Ordering::Relaxed),
            config: self.config.clone(),
        }
    }

    /// Mark the first idle handle acquired and lease it out.
    fn claim_idle(&self, inner: &mut PoolInner<F::Worker>) -> Option<Lease<F::Worker>> {
        let handle = inner.handles.iter_mut().find(|h| !h.is_acquired)?;
        handle.mark_acquired(Instant::now());
        self.counters.reused.fetch_add(1, Ordering::Relaxed);
        debug!(
            worker_id = handle.id,
            use_count = handle.use_count,
            "idle worker acquired"
        );
        Some(Lease::new(handle.id, Arc::clone(&handle.worker)))
    }

    /// Remove a handle from the collection. Destruction always goes through
    /// here first, so no two paths can destroy the same worker.
    pub(crate) fn take_handle(&self, id: WorkerId) -> Option<WorkerHandle<F::Worker>> {
        let mut inner = self.inner.lock();
        let pos = inner.handles.iter().position(|h| h.id == id)?;
        Some(inner.handles.swap_remove(pos))
    }

    /// Finish `acquire` step 2: the ceiling slot is already reserved via
    /// `pending_creates`; boot a worker and lease it to the caller.
    async fn create_for_caller(&self) -> Result<Lease<F::Worker>, PoolError> {
        match self.factory.create().await {
            Ok(worker) => {
                let worker = Arc::new(worker);
                let id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
                let lease = self.adopt_created(id, &worker);
                match lease {
                    Some(lease) => {
                        info!(worker_id = id, "worker created");
                        Ok(lease)
                    }
                    None => {
                        // Shutdown began while the process booted; it is not
                        // tracked by the pool, so kill it here.
                        self.factory.force_terminate(&worker);
                        Err(PoolError::ShuttingDown)
                    }
                }
            }
            Err(e) => {
                {
                    self.inner.lock().pending_creates -= 1;
                }
                warn!(error = %e, "worker creation failed");
                // The reserved slot is free again; a queued waiter may be
                // able to use it.
                self.drain_wait_queue();
                Err(PoolError::Creation(e.to_string()))
            }
        }
    }

    /// Register a freshly created worker as an acquired handle, releasing the
    /// `pending_creates` reservation. Returns `None` when shutdown started
    /// while the worker booted, in which case the caller must terminate it.
    fn adopt_created(&self, id: WorkerId, worker: &Arc<F::Worker>) -> Option<Lease<F::Worker>> {
        let mut inner = self.inner.lock();
        inner.pending_creates -= 1;
        if inner.shutting_down {
            return None;
        }
        let mut handle = WorkerHandle::new(id, Arc::clone(worker));
        handle.mark_acquired(Instant::now());
        inner.handles.push(handle);
        drop(inner);
        self.counters.created.fetch_add(1, Ordering::Relaxed);
        Some(Lease::new(id, Arc::clone(worker)))
    }

    /// Finish `acquire` step 3: suspend until the queue entry is satisfied,
    /// rejected, or times out.
    async fn wait_for_turn(
        &self,
        mut rx: oneshot::Receiver<AcquireResult<F::Worker>>,
        waiter_id: u64,
        timeout: Duration,
    ) -> Result<Lease<F::Worker>, PoolError> {
        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(result)) => result,
            // Sender dropped without fulfilling: the pool was torn down
            // without the usual rejection pass.
            Ok(Err(_)) => Err(PoolError::ShuttingDown),
            Err(_) => {
                // A drain pass may fulfill this entry in the same instant
                // the deadline fires. Close the channel so any send from
                // here on fails (the drain recovers such workers to the
                // idle set), then honor a lease that already landed rather
                // than dropping it unread.
                rx.close();
                if let Ok(result) = rx.try_recv() {
                    return result;
                }
                let (total, acquired) = {
                    let mut inner = self.inner.lock();
                    let _ = inner.waiters.remove(waiter_id);
                    let acquired = inner.handles.iter().filter(|h| h.is_acquired).count();
                    (inner.handles.len(), acquired)
                };
                self.counters.wait_timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(waiter_id, total, acquired, "acquire timed out in queue");
                Err(PoolError::AcquireTimeout {
                    timeout,
                    total,
                    acquired,
                })
            }
        }
    }

    /// Serve queued waiters while capacity allows: idle workers first, then
    /// fresh creations while under the ceiling. Invoked after every release
    /// and after every guardian-driven destroy.
    pub(crate) fn drain_wait_queue(&self) {
        let mut to_create: Vec<Waiter<F::Worker>> = Vec::new();
        {
            let mut inner = self.inner.lock();
            if inner.shutting_down {
                return;
            }
            while !inner.waiters.is_empty() {
                if let Some(lease) = self.claim_idle(&mut inner) {
                    match inner.waiters.pop_front() {
                        Some(waiter) => {
                            debug!(
                                waiter_id = waiter.id,
                                worker_id = lease.id(),
                                waited_ms = waiter.enqueued_at.elapsed().as_millis() as u64,
                                "waiter served with idle worker"
                            );
                            if let Err(Ok(returned)) = waiter.tx.send(Ok(lease)) {
                                // Receiver closed or dropped: the caller gave
                                // up this very instant. Put the worker back
                                // and keep draining.
                                Self::return_to_idle(&mut inner, returned.id());
                            }
                        }
                        None => {
                            Self::return_to_idle(&mut inner, lease.id());
                            break;
                        }
                    }
                } else if inner.handles.len() + inner.pending_creates < self.config.max_workers {
                    if let Some(waiter) = inner.waiters.pop_front() {
                        inner.pending_creates += 1;
                        to_create.push(waiter);
                    }
                } else {
                    // No idle worker and at the ceiling; nothing more this pass.
                    break;
                }
            }
        }
        for waiter in to_create {
            self.spawn_create_for_waiter(waiter);
        }
    }

    fn return_to_idle(inner: &mut PoolInner<F::Worker>, id: WorkerId) {
        if let Some(handle) = inner.handles.iter_mut().find(|h| h.id == id) {
            handle.mark_idle(Instant::now());
        }
    }

    /// Boot a worker off-task for a specific waiter. A creation failure is
    /// delivered to that waiter only; the rest of the queue is unaffected.
    fn spawn_create_for_waiter(&self, waiter: Waiter<F::Worker>) {
        let Some(pool) = self.self_ref.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            match pool.factory.create().await {
                Ok(worker) => {
                    let worker = Arc::new(worker);
                    let id = pool.next_worker_id.fetch_add(1, Ordering::Relaxed);
                    match pool.adopt_created(id, &worker) {
                        Some(lease) => {
                            info!(
                                worker_id = id,
                                waiter_id = waiter.id,
                                "worker created for queued waiter"
                            );
                            if waiter.tx.send(Ok(lease)).is_err() {
                                // The waiter timed out while the process
                                // booted. The worker is healthy and tracked,
                                // so idle it and let the next waiter have it.
                                {
                                    let mut inner = pool.inner.lock();
                                    Self::return_to_idle(&mut inner, id);
                                }
                                pool.drain_wait_queue();
                            }
                        }
                        None => {
                            pool.factory.force_terminate(&worker);
                            let _ = waiter.tx.send(Err(PoolError::ShuttingDown));
                        }
                    }
                }
                Err(e) => {
                    {
                        pool.inner.lock().pending_creates -= 1;
                    }
                    warn!(waiter_id = waiter.id, error = %e, "creation for queued waiter failed");
                    let _ = waiter.tx.send(Err(PoolError::Creation(e.to_string())));
                    // The freed slot may still serve the remaining waiters.
                    pool.drain_wait_queue();
                }
            }
        });
    }
}
