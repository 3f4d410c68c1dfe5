//! Configuration models and loading helpers.

pub mod pool;

pub use pool::PoolConfig;
