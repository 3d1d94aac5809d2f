//! Run configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

pub const DEFAULT_API_BASE: &str = "https://api.omnisend.com/v3";
pub const DEFAULT_REMOTE_NAME: &str = "Omnisend";
pub const DEFAULT_INPUT: &str = "subscribers.csv";
pub const DEFAULT_CHANGED_LOG: &str = "changed_contacts.csv";
pub const DEFAULT_SKIPPED_LOG: &str = "skipped_contacts.csv";

/// Everything a run needs, fixed once at startup.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Contacts API key, sent as `X-API-KEY`.
    pub api_key: SecretString,
    /// API base URL without trailing slash, e.g. `https://api.omnisend.com/v3`.
    pub api_base: String,
    /// Display name of the remote system, used in skip reasons.
    pub remote_name: String,
    /// Input CSV export.
    pub input_path: PathBuf,
    /// Log of contacts whose interests were replaced.
    pub changed_log_path: PathBuf,
    /// Log of rows that were not applied, with a reason.
    pub skipped_log_path: PathBuf,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Attempt policy for both remote calls.
    pub retry: RetryPolicy,
}

impl MigrationConfig {
    /// Build config from environment variables.
    ///
    /// `OMNISEND_API_KEY` is required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OMNISEND_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("OMNISEND_API_KEY".to_string()))?;

        let api_base = lookup("MIGRATE_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let remote_name =
            lookup("MIGRATE_REMOTE_NAME").unwrap_or_else(|| DEFAULT_REMOTE_NAME.to_string());

        let input_path = lookup("MIGRATE_INPUT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT));
        let changed_log_path = lookup("MIGRATE_CHANGED_LOG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CHANGED_LOG));
        let skipped_log_path = lookup("MIGRATE_SKIPPED_LOG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SKIPPED_LOG));

        let timeout_secs: u64 = parse_var(&lookup, "MIGRATE_TIMEOUT_SECS", 30)?;
        let max_attempts: u32 = parse_var(&lookup, "MIGRATE_MAX_ATTEMPTS", 1)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MIGRATE_MAX_ATTEMPTS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        let retry_delay_ms: u64 = parse_var(&lookup, "MIGRATE_RETRY_DELAY_MS", 500)?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base,
            remote_name,
            input_path,
            changed_log_path,
            skipped_log_path,
            request_timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy::new(max_attempts, Duration::from_millis(retry_delay_ms)),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
    }
}
