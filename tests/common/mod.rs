//! Shared mock worker factory for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use worker_lot::{FactoryError, PoolConfig, TerminateError, WorkerFactory};

/// How the mock's `terminate_gracefully` behaves.
pub const GRACEFUL_OK: usize = 0;
pub const GRACEFUL_ALREADY_EXITED: usize = 1;
pub const GRACEFUL_FAILS: usize = 2;

/// A fake worker process: just a serial number.
#[derive(Debug)]
pub struct MockWorker {
    pub serial: u64,
}

/// Knobs and counters shared between a [`MockFactory`] and the test body.
#[derive(Debug)]
pub struct FactoryProbes {
    pub created: AtomicUsize,
    pub resets: AtomicUsize,
    pub graceful_terminations: AtomicUsize,
    pub forced_terminations: AtomicUsize,
    /// Next N `create` calls fail with a simulated launch error.
    pub create_failures_remaining: AtomicUsize,
    /// Delay injected into `create`, in milliseconds.
    pub create_delay_ms: AtomicU64,
    /// Result of `probe_health`.
    pub healthy: AtomicBool,
    /// Whether `reset_for_reuse` fails.
    pub reset_fails: AtomicBool,
    /// Whether `terminate_gracefully` sleeps far past its timeout.
    pub hang_on_graceful: AtomicBool,
    /// One of the `GRACEFUL_*` modes.
    pub graceful_mode: AtomicUsize,
}

impl Default for FactoryProbes {
    fn default() -> Self {
        Self {
            created: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
            graceful_terminations: AtomicUsize::new(0),
            forced_terminations: AtomicUsize::new(0),
            create_failures_remaining: AtomicUsize::new(0),
            create_delay_ms: AtomicU64::new(0),
            healthy: AtomicBool::new(true),
            reset_fails: AtomicBool::new(false),
            hang_on_graceful: AtomicBool::new(false),
            graceful_mode: AtomicUsize::new(GRACEFUL_OK),
        }
    }
}

/// A worker factory whose behavior is steered by [`FactoryProbes`].
pub struct MockFactory {
    pub probes: Arc<FactoryProbes>,
    next_serial: AtomicU64,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            probes: Arc::new(FactoryProbes::default()),
            next_serial: AtomicU64::new(1),
        }
    }

    pub fn probes(&self) -> Arc<FactoryProbes> {
        Arc::clone(&self.probes)
    }
}

#[async_trait]
impl WorkerFactory for MockFactory {
    type Worker = MockWorker;

    async fn create(&self) -> Result<MockWorker, FactoryError> {
        let delay = self.probes.create_delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.probes.create_failures_remaining.load(Ordering::Relaxed) > 0 {
            self.probes
                .create_failures_remaining
                .fetch_sub(1, Ordering::Relaxed);
            return Err(FactoryError::Create("simulated launch failure".into()));
        }
        self.probes.created.fetch_add(1, Ordering::Relaxed);
        Ok(MockWorker {
            serial: self.next_serial.fetch_add(1, Ordering::Relaxed),
        })
    }

    async fn probe_health(&self, _worker: &MockWorker) -> bool {
        self.probes.healthy.load(Ordering::Relaxed)
    }

    async fn reset_for_reuse(&self, _worker: &MockWorker) -> Result<(), FactoryError> {
        self.probes.resets.fetch_add(1, Ordering::Relaxed);
        if self.probes.reset_fails.load(Ordering::Relaxed) {
            Err(FactoryError::Reset("simulated reset failure".into()))
        } else {
            Ok(())
        }
    }

    async fn terminate_gracefully(
        &self,
        _worker: &MockWorker,
        timeout: Duration,
    ) -> Result<(), TerminateError> {
        if self.probes.hang_on_graceful.load(Ordering::Relaxed) {
            tokio::time::sleep(timeout + Duration::from_secs(60)).await;
        }
        self.probes
            .graceful_terminations
            .fetch_add(1, Ordering::Relaxed);
        match self.probes.graceful_mode.load(Ordering::Relaxed) {
            GRACEFUL_ALREADY_EXITED => Err(TerminateError::AlreadyExited),
            GRACEFUL_FAILS => Err(TerminateError::Other("simulated close failure".into())),
            _ => Ok(()),
        }
    }

    fn force_terminate(&self, _worker: &MockWorker) {
        self.probes.forced_terminations.fetch_add(1, Ordering::Relaxed);
    }
}

/// Config with test-friendly timings: guardian effectively disabled unless a
/// test tightens it.
pub fn test_config(max_workers: usize, max_queue_size: usize) -> PoolConfig {
    PoolConfig {
        max_workers,
        max_queue_size,
        idle_timeout_ms: 60_000,
        close_timeout_ms: 1_000,
        max_use_time_ms: 600_000,
        guardian_interval_ms: 5_000,
        min_warm_workers: 1,
        verbose: false,
    }
}
