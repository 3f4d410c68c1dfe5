//! # Worker Lot
//!
//! A bounded, self-guarding pool manager for heavyweight external worker
//! processes (browser engines, language sandboxes, rendering backends).
//!
//! `worker-lot` caps the number of simultaneously-running worker processes,
//! reuses idle workers across requests, queues excess requests fairly and
//! boundedly, and autonomously reclaims workers that are stuck, overused, or
//! idle too long, without leaking OS processes even under crash, timeout,
//! or signal-interrupted shutdown.
//!
//! ## Core Problem Solved
//!
//! Heavyweight worker processes have different constraints than ordinary
//! connection pools:
//!
//! - **Expensive startup**: booting a browser engine takes seconds, so reuse
//!   beats re-creation.
//! - **Runaway callers**: a hung caller can pin a worker forever unless the
//!   pool reclaims it autonomously.
//! - **Process leaks**: a worker that escapes tracking is an orphaned OS
//!   process; every failure path must end in termination.
//!
//! ## Key Features
//!
//! - **Bounded concurrency**: at most `max_workers` processes, ever.
//! - **Fair bounded queueing**: strict FIFO wait queue with a hard cap and a
//!   per-request timeout.
//! - **Guardian sweep**: periodic reclamation of overused and idle workers,
//!   keeping a configurable number warm.
//! - **Crash-safe shutdown**: graceful close with a bound, then an
//!   unconditional force-kill pass; SIGINT/SIGTERM wiring included.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use worker_lot::{PoolConfig, WorkerPool};
//!
//! let pool = WorkerPool::new(PoolConfig::from_env()?, BrowserFactory::new())?;
//! pool.start_guardian();
//! pool.install_signal_handlers();
//!
//! let lease = pool.acquire(Duration::from_secs(5)).await?;
//! render(lease.worker()).await?;
//! pool.release(lease.into_worker()).await;
//!
//! pool.shutdown(Duration::from_secs(10)).await;
//! ```
//!
//! How a worker performs its actual task is entirely up to the embedding
//! application: supply a [`WorkerFactory`] that creates, probes, resets, and
//! terminates your worker processes, and the pool drives the lifecycle.
//!
//! For complete usage, see the integration tests under `tests/`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

/// Pool core: data model, acquisition, guardianship, and lifecycle.
pub mod core;
/// Configuration models and loading helpers.
pub mod config;
/// Shared utilities.
pub mod util;

pub use crate::config::PoolConfig;
pub use crate::core::{
    AppResult, FactoryError, Lease, PoolError, PoolStats, TerminateError, WorkerFactory, WorkerId,
    WorkerPool,
};
