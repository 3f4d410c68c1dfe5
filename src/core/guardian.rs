//! Periodic background sweep that reclaims overdue and idle workers.
//!
//! The guardian runs on its own interval, independent of any `acquire` or
//! `release` call. Each sweep applies two checks to every handle: forced
//! reclamation of workers held past `max_use_time` (the mechanism that
//! recovers workers pinned by runaway callers that never release), and
//! retirement of workers idle past `idle_timeout`, keeping at least
//! `min_warm_workers` alive to avoid cold-start latency.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::core::factory::WorkerFactory;
use crate::core::handle::WorkerHandle;
use crate::core::pool::WorkerPool;

/// Running guardian loop: a stop signal plus the loop's task handle.
pub(crate) struct GuardianTask {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl<F: WorkerFactory> WorkerPool<F> {
    /// Start the guardian sweep loop. Idempotent: a second call while the
    /// guardian is already running is a no-op.
    pub fn start_guardian(&self) {
        let mut slot = self.guardian.lock();
        if slot.is_some() {
            return;
        }
        let (stop, mut stopped) = watch::channel(false);
        let weak = self.self_ref.clone();
        let interval = self.config.guardian_interval();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Consume the immediate first tick so sweeps start one period in.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Holding only a weak reference lets a dropped pool
                        // end the loop instead of ticking forever.
                        let Some(pool) = weak.upgrade() else { break };
                        pool.sweep().await;
                    }
                    _ = stopped.changed() => break,
                }
            }
            debug!("guardian loop exited");
        });
        *slot = Some(GuardianTask { stop, task });
        debug!(
            interval_ms = interval.as_millis() as u64,
            "guardian started"
        );
    }

    /// Stop the guardian and wait for the sweep loop to exit, so no sweep can
    /// race a shutdown that follows. No-op when the guardian is not running.
    pub async fn stop_guardian(&self) {
        let taken = self.guardian.lock().take();
        if let Some(guardian) = taken {
            let _ = guardian.stop.send(true);
            let _ = guardian.task.await;
        }
    }

    /// One sweep over every handle. Evictions are collected under the lock,
    /// then destroyed outside it; each destruction is independent and
    /// best-effort, so one failing handle cannot abort the sweep for the rest.
    pub(crate) async fn sweep(&self) {
        let now = std::time::Instant::now();
        let max_use = self.config.max_use_time();
        let idle_timeout = self.config.idle_timeout();
        let min_warm = self.config.min_warm_workers;

        let mut overdue: Vec<WorkerHandle<F::Worker>> = Vec::new();
        let mut retired: Vec<WorkerHandle<F::Worker>> = Vec::new();
        {
            let mut inner = self.inner.lock();
            if inner.shutting_down {
                return;
            }
            let mut i = 0;
            while i < inner.handles.len() {
                let held_too_long = inner.handles[i]
                    .acquired_at
                    .is_some_and(|t| now.duration_since(t) > max_use);
                if held_too_long {
                    overdue.push(inner.handles.swap_remove(i));
                } else {
                    i += 1;
                }
            }
            // Idle retirement never shrinks the pool below min_warm_workers.
            let mut i = 0;
            while i < inner.handles.len() && inner.handles.len() > min_warm {
                let handle = &inner.handles[i];
                if !handle.is_acquired && now.duration_since(handle.last_used_at) > idle_timeout {
                    retired.push(inner.handles.swap_remove(i));
                } else {
                    i += 1;
                }
            }
        }

        for handle in overdue {
            let held_ms = handle
                .acquired_at
                .map_or(0, |t| now.duration_since(t).as_millis() as u64);
            warn!(
                worker_id = handle.id,
                held_ms, "reclaiming worker held past max use time"
            );
            self.destroy_worker(handle, "max use time exceeded").await;
            // The reclaimed slot can serve the oldest waiter.
            self.drain_wait_queue();
        }
        for handle in retired {
            debug!(worker_id = handle.id, "retiring idle worker");
            self.destroy_worker(handle, "idle timeout").await;
        }
    }
}
