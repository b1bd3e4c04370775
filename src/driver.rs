//! The wrapped-driver contract.
//!
//! These traits describe what my-ora needs from a native database driver:
//! open a connection, prepare and run statements, manage transactions.
//! Direct (unprepared) execution is an optional capability, exposed through
//! [`Connection::as_execer`] and [`Connection::as_queryer`] and checked
//! explicitly at every call.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::error::is_unsupported;

/// Error type produced by a driver. my-ora hands these back untouched.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// A bind value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

/// Optional execution modes a connection may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Execute a statement without a separate prepare step.
    Exec,
    /// Run a query without a separate prepare step.
    Query,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Exec => write!(f, "direct exec"),
            Capability::Query => write!(f, "direct query"),
        }
    }
}

/// Entry point of a native driver.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Open a connection. The DSN format belongs to the driver.
    async fn open(&self, dsn: &str) -> DriverResult<Box<dyn Connection>>;
}

/// An open connection.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn prepare(&self, query: &str) -> DriverResult<Box<dyn Statement>>;

    async fn begin(&self) -> DriverResult<Box<dyn Transaction>>;

    async fn ping(&self) -> DriverResult<()> {
        Ok(())
    }

    async fn close(&self) -> DriverResult<()>;

    /// Direct execution, if supported.
    fn as_execer(&self) -> Option<&dyn Execer> {
        None
    }

    /// Direct querying, if supported.
    fn as_queryer(&self) -> Option<&dyn Queryer> {
        None
    }
}

/// A prepared statement.
#[async_trait]
pub trait Statement: Send + Sync {
    /// Number of bind markers, when the driver knows it.
    fn num_input(&self) -> Option<usize> {
        None
    }

    async fn exec(&self, args: &[Value]) -> DriverResult<ExecResult>;

    async fn query(&self, args: &[Value]) -> DriverResult<Box<dyn Rows>>;

    async fn close(&self) -> DriverResult<()>;
}

/// Direct execution capability.
#[async_trait]
pub trait Execer: Send + Sync {
    async fn exec(&self, query: &str, args: &[Value]) -> DriverResult<ExecResult>;
}

/// Direct query capability.
#[async_trait]
pub trait Queryer: Send + Sync {
    async fn query(&self, query: &str, args: &[Value]) -> DriverResult<Box<dyn Rows>>;
}

/// An open transaction.
#[async_trait]
pub trait Transaction: Send + Sync {
    async fn commit(&self) -> DriverResult<()>;

    async fn rollback(&self) -> DriverResult<()>;
}

/// A result set, read row by row.
#[async_trait]
pub trait Rows: Send {
    fn columns(&self) -> &[String];

    /// The next row, or `None` once exhausted.
    async fn next(&mut self) -> DriverResult<Option<Vec<Value>>>;
}

/// Execute on `conn`, directly when it can, through a prepared statement
/// otherwise.
pub async fn exec_or_prepare(
    conn: &dyn Connection,
    query: &str,
    args: &[Value],
) -> DriverResult<ExecResult> {
    if let Some(execer) = conn.as_execer() {
        match execer.exec(query, args).await {
            Err(err) if is_unsupported(&err) => {}
            result => return result,
        }
    }

    let stmt = conn.prepare(query).await?;
    let result = stmt.exec(args).await;
    let closed = stmt.close().await;
    let result = result?;
    closed?;
    Ok(result)
}

/// Query `conn`, directly when it can, through a prepared statement
/// otherwise.
pub async fn query_or_prepare(
    conn: &dyn Connection,
    query: &str,
    args: &[Value],
) -> DriverResult<Box<dyn Rows>> {
    if let Some(queryer) = conn.as_queryer() {
        match queryer.query(query, args).await {
            Err(err) if is_unsupported(&err) => {}
            result => return result,
        }
    }

    let stmt = conn.prepare(query).await?;
    match stmt.query(args).await {
        Ok(rows) => Ok(Box::new(StatementRows {
            rows,
            stmt: Some(stmt),
        })),
        Err(err) => {
            if let Err(close_err) = stmt.close().await {
                tracing::warn!(error = %close_err, "failed to close statement after query error");
            }
            Err(err)
        }
    }
}

/// Rows that keep their statement open until they are exhausted.
struct StatementRows {
    rows: Box<dyn Rows>,
    stmt: Option<Box<dyn Statement>>,
}

#[async_trait]
impl Rows for StatementRows {
    fn columns(&self) -> &[String] {
        self.rows.columns()
    }

    async fn next(&mut self) -> DriverResult<Option<Vec<Value>>> {
        let row = self.rows.next().await?;
        if row.is_none() {
            if let Some(stmt) = self.stmt.take() {
                stmt.close().await?;
            }
        }
        Ok(row)
    }
}
