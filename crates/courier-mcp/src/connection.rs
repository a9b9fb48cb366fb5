//! Resilient connection provider for the SQLite store.
//!
//! Every tool call that touches the store acquires a fresh connection and
//! closes it before returning; nothing is pooled or reused across calls.
//! Opening a connection runs a `SELECT 1` liveness probe and is retried
//! with linear backoff (`base_delay × attempt`).

use courier_core::config::{RetryConfig, StoreConfig};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How a connection will be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Metadata and read queries. The store rejects writes on these handles.
    ReadOnly,
    /// Write queries.
    ReadWrite,
}

/// Failure to obtain a usable connection after all attempts.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Failed to connect after {attempts} attempts: {cause}")]
pub struct ConnectionError {
    /// Store location that could not be opened.
    pub path: PathBuf,
    /// Number of attempts made.
    pub attempts: u32,
    /// Message of the last underlying failure.
    pub cause: String,
}

/// Linear backoff retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
        }
    }
}

impl RetryPolicy {
    /// Sleep after failed attempt `attempt` (1-based), or `None` after the last one.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            None
        } else {
            Some(self.base_delay * attempt)
        }
    }
}

/// Run `op` until it succeeds or the policy's attempt ceiling is reached.
///
/// `op` receives the 1-based attempt number. On exhaustion the number of
/// attempts made and the last error are returned.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, (u32, E)>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => match policy.delay_for(attempt) {
                Some(delay) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Connection attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err((attempt, e)),
            },
        }
    }
}

/// Opens probed SQLite connections with bounded retry.
#[derive(Debug, Clone)]
pub struct ConnectionProvider {
    path: PathBuf,
    connect_timeout: Duration,
    retry: RetryPolicy,
}

impl ConnectionProvider {
    /// Create a provider for the store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            connect_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }

    /// Create a provider from store configuration.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            path: config.path.clone(),
            connect_timeout: config.connect_timeout(),
            retry: RetryPolicy::from(&config.retry),
        }
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the per-attempt connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Path of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection, probing it with `SELECT 1`, retrying on failure.
    pub async fn acquire(&self, access: Access) -> Result<SqliteConnection, ConnectionError> {
        retry_with_backoff(&self.retry, |attempt| self.open_once(access, attempt))
            .await
            .map_err(|(attempts, cause)| {
                tracing::error!(
                    path = %self.path.display(),
                    attempts,
                    error = %cause,
                    "Giving up on store connection"
                );
                ConnectionError {
                    path: self.path.clone(),
                    attempts,
                    cause,
                }
            })
    }

    async fn open_once(&self, access: Access, attempt: u32) -> Result<SqliteConnection, String> {
        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(false)
            .read_only(access == Access::ReadOnly)
            .busy_timeout(self.connect_timeout);

        let open = async {
            let mut conn = SqliteConnection::connect_with(&options).await?;
            sqlx::query("SELECT 1").execute(&mut conn).await?;
            Ok::<_, sqlx::Error>(conn)
        };

        match tokio::time::timeout(self.connect_timeout, open).await {
            Ok(Ok(conn)) => {
                tracing::debug!(path = %self.path.display(), attempt, ?access, "Store connection opened");
                Ok(conn)
            }
            Ok(Err(e)) => Err(store_message(&e)),
            Err(_) => Err(format!(
                "timed out after {}s",
                self.connect_timeout.as_secs_f64()
            )),
        }
    }
}

/// Close a connection, logging rather than failing on errors.
pub async fn release(conn: SqliteConnection) {
    if let Err(e) = conn.close().await {
        tracing::debug!(error = %e, "Error closing store connection");
    }
}

/// The store's own message for an error, without sqlx's wrapping text.
pub(crate) fn store_message(error: &sqlx::Error) -> String {
    match error {
        sqlx::Error::Database(db) => db.message().to_string(),
        other => other.to_string(),
    }
}
