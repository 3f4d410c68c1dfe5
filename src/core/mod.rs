//! Pool core: data model, acquisition, guardianship, and lifecycle.

pub mod error;
pub mod factory;
pub mod handle;
pub mod pool;

mod guardian;
mod lifecycle;
mod wait_queue;

pub use error::{AppResult, PoolError};
pub use factory::{FactoryError, TerminateError, WorkerFactory};
pub use handle::{Lease, WorkerId};
pub use pool::{PoolStats, WorkerPool};
