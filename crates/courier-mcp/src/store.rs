//! Store tool handlers: `list_tables`, `describe_table`, `read_query`, `write_query`.
//!
//! Each handler acquires its own connection, does one thing, and closes the
//! connection before returning. Statement failures carry the store's own
//! message text unmodified.

use crate::connection::{Access, ConnectionError, ConnectionProvider, release, store_message};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Executor, Row, Statement, TypeInfo, ValueRef};

/// Store-side failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No connection could be opened.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The store rejected a statement (syntax, constraint, read-only, ...).
    #[error("{0}")]
    Statement(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        StoreError::Statement(store_message(&error))
    }
}

/// Columns and rows of a read query, in projection and iteration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Outcome of a committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    pub affected_rows: u64,
}

/// One column of a table, in the store's native column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub notnull: bool,
    pub pk: bool,
}

/// Table names in ascending lexical order, excluding SQLite internals.
pub async fn list_tables(provider: &ConnectionProvider) -> Result<Vec<String>, StoreError> {
    let mut conn = provider.acquire(Access::ReadOnly).await?;
    let result = sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
         ORDER BY name",
    )
    .fetch_all(&mut conn)
    .await
    .map_err(StoreError::from);
    release(conn).await;
    result
}

/// Column metadata for `table_name`. An unknown table yields an empty list.
pub async fn describe_table(
    provider: &ConnectionProvider,
    table_name: &str,
) -> Result<Vec<ColumnInfo>, StoreError> {
    let mut conn = provider.acquire(Access::ReadOnly).await?;
    let result = sqlx::query(
        "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid",
    )
    .bind(table_name)
    .fetch_all(&mut conn)
    .await
    .map_err(StoreError::from)
    .and_then(|rows| rows.iter().map(column_info).collect());
    release(conn).await;
    result
}

/// Execute a read-only statement and capture every row.
///
/// Text holding more than one statement is rejected before any connection
/// is opened.
///
/// The connection is opened read-only, so a mutating statement fails with
/// the store's own error instead of writing.
pub async fn read_query(
    provider: &ConnectionProvider,
    query: &str,
) -> Result<QueryResult, StoreError> {
    ensure_single_statement(query)?;
    let mut conn = provider.acquire(Access::ReadOnly).await?;
    let result = run_read(&mut conn, query).await;
    release(conn).await;
    result
}

/// Execute a statement inside a transaction and commit it.
///
/// On failure the transaction is rolled back before the error is returned,
/// so no partial write is ever committed.
pub async fn write_query(
    provider: &ConnectionProvider,
    query: &str,
) -> Result<WriteResult, StoreError> {
    ensure_single_statement(query)?;
    let mut conn = provider.acquire(Access::ReadWrite).await?;
    let result = run_write(&mut conn, query).await;
    release(conn).await;
    result
}

async fn run_read(conn: &mut SqliteConnection, query: &str) -> Result<QueryResult, StoreError> {
    // Preparing first gives the projection even when no rows come back.
    let statement = (&mut *conn).prepare(query).await?;
    let columns = statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let rows = statement.query().fetch_all(&mut *conn).await?;

    Ok(QueryResult {
        columns,
        rows: rows.iter().map(row_values).collect(),
    })
}

async fn run_write(conn: &mut SqliteConnection, query: &str) -> Result<WriteResult, StoreError> {
    let mut tx = conn.begin().await?;
    match sqlx::query(query).execute(&mut *tx).await {
        Ok(done) => {
            tx.commit().await?;
            Ok(WriteResult {
                affected_rows: done.rows_affected(),
            })
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::error!(error = %rollback, "Rollback failed after write error");
            }
            Err(e.into())
        }
    }
}

fn column_info(row: &SqliteRow) -> Result<ColumnInfo, StoreError> {
    Ok(ColumnInfo {
        name: row.try_get("name")?,
        data_type: row.try_get::<Option<String>, _>("type")?.unwrap_or_default(),
        notnull: row.try_get::<i64, _>("notnull")? != 0,
        pk: row.try_get::<i64, _>("pk")? != 0,
    })
}

fn row_values(row: &SqliteRow) -> Vec<Value> {
    (0..row.len()).map(|i| column_value(row, i)).collect()
}

/// Convert one SQLite value to JSON using its runtime storage class.
fn column_value(row: &SqliteRow, index: usize) -> Value {
    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };

    match storage_class.as_str() {
        "INTEGER" | "BOOLEAN" => row
            .try_get::<i64, _>(index)
            .map(Value::from)
            .unwrap_or_else(|_| text_fallback(row, index)),
        "REAL" | "NUMERIC" => row
            .try_get::<f64, _>(index)
            .map(Value::from)
            .unwrap_or_else(|_| text_fallback(row, index)),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|bytes| Value::String(base64::engine::general_purpose::STANDARD.encode(bytes)))
            .unwrap_or(Value::Null),
        _ => text_fallback(row, index),
    }
}

/// TEXT that is not valid UTF-8 is decoded lossily rather than dropped.
fn text_fallback(row: &SqliteRow, index: usize) -> Value {
    match row.try_get::<String, _>(index) {
        Ok(text) => Value::String(text),
        Err(_) => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(Value::Null),
    }
}

const MULTIPLE_STATEMENTS: &str = "You can only execute one statement at a time.";

/// Fail when `query` continues past its first top-level `;`.
///
/// Quoted text and comments are skipped. Inside `CREATE TRIGGER` a `;`
/// only ends the statement once every `BEGIN`/`CASE` has met its `END`.
fn ensure_single_statement(query: &str) -> Result<(), StoreError> {
    let bytes = query.as_bytes();
    let mut leading: Vec<String> = Vec::with_capacity(3);
    let mut trigger = false;
    let mut depth = 0usize;
    let mut terminated = false;
    let mut i = 0;

    while i < bytes.len() {
        let rest = &bytes[i..];
        let byte = rest[0];

        let step = if rest.starts_with(b"--") {
            rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len())
        } else if rest.starts_with(b"/*") {
            rest[2..]
                .windows(2)
                .position(|w| w == b"*/")
                .map_or(rest.len(), |p| p + 4)
        } else if byte.is_ascii_whitespace() {
            1
        } else if terminated {
            return Err(StoreError::Statement(MULTIPLE_STATEMENTS.to_string()));
        } else if byte == b';' {
            terminated = !trigger || depth == 0;
            1
        } else if let Some(close) = closing_quote(byte) {
            rest[1..]
                .iter()
                .position(|&b| b == close)
                .map_or(rest.len(), |p| p + 2)
        } else if byte.is_ascii_alphabetic() || byte == b'_' {
            let len = rest
                .iter()
                .position(|&b| !(b.is_ascii_alphanumeric() || b == b'_' || b == b'$'))
                .unwrap_or(rest.len());
            let word = query[i..i + len].to_ascii_uppercase();
            if leading.len() < 3 {
                leading.push(word.clone());
                trigger = trigger || starts_trigger(&leading);
            }
            if trigger {
                match word.as_str() {
                    "BEGIN" | "CASE" => depth += 1,
                    "END" => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
            len
        } else {
            1
        };

        i += step;
    }
    Ok(())
}

fn closing_quote(open: u8) -> Option<u8> {
    match open {
        b'\'' | b'"' | b'`' => Some(open),
        b'[' => Some(b']'),
        _ => None,
    }
}

fn starts_trigger(words: &[String]) -> bool {
    match words {
        [create, trigger, ..] if create == "CREATE" && trigger == "TRIGGER" => true,
        [create, temp, trigger] => {
            create == "CREATE" && (temp == "TEMP" || temp == "TEMPORARY") && trigger == "TRIGGER"
        }
        _ => false,
    }
}
