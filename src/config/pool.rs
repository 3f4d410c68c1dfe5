//! Pool configuration: defaults, validation, env and JSON loading.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable prefix honored by [`PoolConfig::from_env`].
const ENV_PREFIX: &str = "WORKER_LOT_";

/// Tunables for one worker pool.
///
/// All timing fields are in milliseconds; accessor methods return them as
/// [`Duration`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Concurrency ceiling: maximum simultaneously-running workers.
    pub max_workers: usize,
    /// Idle eviction threshold.
    pub idle_timeout_ms: u64,
    /// Graceful-termination bound per worker.
    pub close_timeout_ms: u64,
    /// Forced reclamation bound for acquired workers.
    pub max_use_time_ms: u64,
    /// Guardian sweep period.
    pub guardian_interval_ms: u64,
    /// Maximum queued acquire requests before immediate rejection. Zero
    /// means acquisitions at the ceiling fail instead of waiting.
    pub max_queue_size: usize,
    /// Idle eviction never shrinks the pool below this many workers.
    pub min_warm_workers: usize,
    /// Diagnostic logging toggle; selects the more detailed default filter
    /// of [`init_verbose_tracing`](crate::util::telemetry::init_verbose_tracing).
    pub verbose: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 3,
            idle_timeout_ms: 30_000,
            close_timeout_ms: 10_000,
            max_use_time_ms: 300_000,
            guardian_interval_ms: 5_000,
            max_queue_size: 50,
            min_warm_workers: 1,
            verbose: false,
        }
    }
}

impl PoolConfig {
    /// Idle eviction threshold.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Graceful-termination bound per worker.
    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    /// Forced reclamation bound for acquired workers.
    pub fn max_use_time(&self) -> Duration {
        Duration::from_millis(self.max_use_time_ms)
    }

    /// Guardian sweep period.
    pub fn guardian_interval(&self) -> Duration {
        Duration::from_millis(self.guardian_interval_ms)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_workers == 0 {
            return Err("max_workers must be greater than 0".into());
        }
        if self.guardian_interval_ms == 0 {
            return Err("guardian_interval_ms must be greater than 0".into());
        }
        if self.close_timeout_ms == 0 {
            return Err("close_timeout_ms must be greater than 0".into());
        }
        if self.min_warm_workers > self.max_workers {
            return Err("min_warm_workers must not exceed max_workers".into());
        }
        Ok(())
    }

    /// Parse pool configuration from a JSON string and validate. Absent
    /// fields take their defaults.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: PoolConfig =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build a configuration from defaults plus `WORKER_LOT_*` environment
    /// overrides, loading a `.env` file first when one is present.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();
        read_env("MAX_WORKERS", &mut cfg.max_workers)?;
        read_env("IDLE_TIMEOUT_MS", &mut cfg.idle_timeout_ms)?;
        read_env("CLOSE_TIMEOUT_MS", &mut cfg.close_timeout_ms)?;
        read_env("MAX_USE_TIME_MS", &mut cfg.max_use_time_ms)?;
        read_env("GUARDIAN_INTERVAL_MS", &mut cfg.guardian_interval_ms)?;
        read_env("MAX_QUEUE_SIZE", &mut cfg.max_queue_size)?;
        read_env("MIN_WARM_WORKERS", &mut cfg.min_warm_workers)?;
        read_env("VERBOSE", &mut cfg.verbose)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Overwrite `slot` with the parsed value of `WORKER_LOT_<name>` when set.
fn read_env<T: std::str::FromStr>(name: &str, slot: &mut T) -> Result<(), String> {
    let key = format!("{ENV_PREFIX}{name}");
    if let Ok(raw) = std::env::var(&key) {
        *slot = raw
            .parse()
            .map_err(|_| format!("{key}: cannot parse `{raw}`"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_table() {
        let cfg = PoolConfig::default();
        assert_eq!(cfg.max_workers, 3);
        assert_eq!(cfg.idle_timeout_ms, 30_000);
        assert_eq!(cfg.close_timeout_ms, 10_000);
        assert_eq!(cfg.max_use_time_ms, 300_000);
        assert_eq!(cfg.guardian_interval_ms, 5_000);
        assert_eq!(cfg.max_queue_size, 50);
        assert_eq!(cfg.min_warm_workers, 1);
        assert!(!cfg.verbose);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = PoolConfig {
            max_workers: 0,
            ..PoolConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = PoolConfig {
            guardian_interval_ms: 0,
            ..PoolConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = PoolConfig {
            min_warm_workers: 5,
            max_workers: 3,
            ..PoolConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_queue_size_is_valid() {
        let cfg = PoolConfig {
            max_queue_size: 0,
            ..PoolConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_from_json_str_partial_override() {
        let cfg = PoolConfig::from_json_str(r#"{"max_workers": 8, "max_queue_size": 0}"#).unwrap();
        assert_eq!(cfg.max_workers, 8);
        assert_eq!(cfg.max_queue_size, 0);
        assert_eq!(cfg.idle_timeout_ms, 30_000);

        assert!(PoolConfig::from_json_str(r#"{"max_workers": 0}"#).is_err());
        assert!(PoolConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_duration_accessors() {
        let cfg = PoolConfig::default();
        assert_eq!(cfg.idle_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.close_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.max_use_time(), Duration::from_secs(300));
        assert_eq!(cfg.guardian_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_from_env_overrides() {
        std::env::set_var("WORKER_LOT_MAX_WORKERS", "7");
        std::env::set_var("WORKER_LOT_VERBOSE", "true");
        let cfg = PoolConfig::from_env().unwrap();
        assert_eq!(cfg.max_workers, 7);
        assert!(cfg.verbose);
        std::env::remove_var("WORKER_LOT_MAX_WORKERS");
        std::env::remove_var("WORKER_LOT_VERBOSE");
    }
}
