//! Service configuration, grounded on `orchestrator::config`'s
//! typed-struct-plus-`from_env` pattern and `orchestrator::db::connection`'s
//! `DATABASE_URL` convention.

use std::env;

use thiserror::Error;

/// Sub-application invocation defaults: 300s timeout, 10s poll interval.
/// Overridable via `ServiceConfig`, never hardcoded into the invoker itself.
pub const DEFAULT_SUBAPP_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_SUBAPP_POLL_INTERVAL_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(String),

    #[error("invalid value for environment variable {name}: {reason}")]
    InvalidVar { name: String, reason: String },
}

/// Typed, validated process configuration. Built once at startup via
/// [`ServiceConfig::from_env`]; never re-read afterward (no hot-reload,
/// matching the registry's own boot-once discipline).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// `DATABASE_URL` — a single SQLite connection string.
    pub database_url: String,
    pub subapp_timeout_secs: u64,
    pub subapp_poll_interval_secs: u64,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL".into()))?;

        let subapp_timeout_secs = parse_env_or("LINGUFLOW_SUBAPP_TIMEOUT_SECS", DEFAULT_SUBAPP_TIMEOUT_SECS)?;
        let subapp_poll_interval_secs =
            parse_env_or("LINGUFLOW_SUBAPP_POLL_INTERVAL_SECS", DEFAULT_SUBAPP_POLL_INTERVAL_SECS)?;

        Ok(Self { database_url, subapp_timeout_secs, subapp_poll_interval_secs })
    }

    /// A configuration usable outside of any real environment (tests), over
    /// an in-memory SQLite database.
    pub fn test_config() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            subapp_timeout_secs: DEFAULT_SUBAPP_TIMEOUT_SECS,
            subapp_poll_interval_secs: DEFAULT_SUBAPP_POLL_INTERVAL_SECS,
        }
    }
}

fn parse_env_or(name: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidVar { name: name.to_string(), reason: e.to_string() }),
        Err(_) => Ok(default),
    }
}

/// Per-application observability keys: when both are present the invoker
/// wraps the run in a [`crate::trace::TraceHook`].
#[derive(Debug, Clone, Default)]
pub struct ObservabilityKeys {
    pub langfuse_public_key: Option<String>,
    pub langfuse_secret_key: Option<String>,
}

impl ObservabilityKeys {
    pub fn is_configured(&self) -> bool {
        self.langfuse_public_key.is_some() && self.langfuse_secret_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both cases live in one test function: `std::env` is process-global, so
    // running them as separate #[test]s risks interleaving under the default
    // parallel test runner.
    #[test]
    fn from_env_validates_and_applies_defaults() {
        env::remove_var("DATABASE_URL");
        let err = ServiceConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(v) if v == "DATABASE_URL"));

        env::set_var("DATABASE_URL", "sqlite::memory:");
        env::remove_var("LINGUFLOW_SUBAPP_TIMEOUT_SECS");
        let cfg = ServiceConfig::from_env().unwrap();
        assert_eq!(cfg.subapp_timeout_secs, DEFAULT_SUBAPP_TIMEOUT_SECS);
        assert_eq!(cfg.subapp_poll_interval_secs, DEFAULT_SUBAPP_POLL_INTERVAL_SECS);
        env::remove_var("DATABASE_URL");
    }
}
