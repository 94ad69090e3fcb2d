//! Settings read from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::SyncError;

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Default cursor id in the `meta` table.
const DEFAULT_CURSOR_ID: &str = "relation-sync";

/// Default number of change records per batch.
const DEFAULT_BATCH_SIZE: usize = 100;

/// Default idle poll interval in milliseconds.
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default batch write deadline in seconds.
const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 10;

/// Default number of events reacted to concurrently.
const DEFAULT_CONCURRENCY: usize = 16;

/// Connection mode for the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry connection at a fixed interval until successful.
    Retry,
}

impl ConnectionMode {
    /// Parse a connection mode.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Defaults to "retry" if not set or invalid.
    fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or("retry").to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            other => {
                warn!(value = %other, "Invalid DATABASE_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Runtime settings for the service.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
    pub cursor_id: String,
    pub batch_size: usize,
    pub poll_interval: Duration,
    pub write_timeout: Duration,
    pub concurrency: usize,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: PostgreSQL connection string (required)
    /// - `DATABASE_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `DATABASE_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `FEED_CURSOR_ID`: Cursor id in the `meta` table (default: relation-sync)
    /// - `FEED_BATCH_SIZE`: Change records per batch (default: 100)
    /// - `FEED_POLL_INTERVAL_MS`: Idle poll interval in milliseconds (default: 1000)
    /// - `STORE_WRITE_TIMEOUT_SECS`: Deadline for one batch write (default: 10)
    /// - `REACTION_CONCURRENCY`: Events reacted to concurrently (default: 16)
    pub fn from_env() -> Result<Self, SyncError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SyncError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| SyncError::config("DATABASE_URL must be set"))?;

        let connection_mode = ConnectionMode::parse(lookup("DATABASE_CONNECTION_MODE").as_deref());
        let retry_interval = Duration::from_secs(parse_or(
            &lookup,
            "DATABASE_RETRY_INTERVAL_SECS",
            DEFAULT_RETRY_INTERVAL_SECS,
        ));
        let cursor_id = lookup("FEED_CURSOR_ID")
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CURSOR_ID.to_string());
        let batch_size = parse_or(&lookup, "FEED_BATCH_SIZE", DEFAULT_BATCH_SIZE).max(1);
        let poll_interval = Duration::from_millis(parse_or(
            &lookup,
            "FEED_POLL_INTERVAL_MS",
            DEFAULT_POLL_INTERVAL_MS,
        ));
        let write_timeout = Duration::from_secs(parse_or(
            &lookup,
            "STORE_WRITE_TIMEOUT_SECS",
            DEFAULT_WRITE_TIMEOUT_SECS,
        )
        .max(1));
        let concurrency = parse_or(&lookup, "REACTION_CONCURRENCY", DEFAULT_CONCURRENCY).max(1);

        Ok(Self {
            database_url,
            connection_mode,
            retry_interval,
            cursor_id,
            batch_size,
            poll_interval,
            write_timeout,
            concurrency,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key = %key, value = %raw, "Invalid numeric setting, using default");
            default
        }),
    }
}
