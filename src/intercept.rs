//! The Interception Layer.
//!
//! [`RewritingDriver`] wraps a native [`Driver`] and hands out connections
//! and statements that look exactly like the native ones, except that every
//! query is rewritten and its arguments reordered before the native driver
//! sees them. Errors from the native driver come back untouched.

use async_trait::async_trait;
use std::sync::Arc;

use crate::driver::{
    Capability, Connection, Driver, DriverResult, ExecResult, Execer, Queryer, Rows, Statement,
    Transaction, Value,
};
use crate::error::ShimError;
use crate::query::PreparedQuery;

/// Name the rewriting driver registers under.
pub const DRIVER_NAME: &str = "my-ora";

/// A driver that rewrites MySQL-flavored SQL for the driver it wraps.
#[derive(Clone)]
pub struct RewritingDriver {
    inner: Arc<dyn Driver>,
}

impl RewritingDriver {
    pub fn new(inner: Arc<dyn Driver>) -> Self {
        Self { inner }
    }

    /// Open a connection, keeping the concrete wrapper type.
    pub async fn connect(&self, dsn: &str) -> DriverResult<RewritingConnection> {
        let conn = self.inner.open(dsn).await?;
        Ok(RewritingConnection::new(conn))
    }
}

#[async_trait]
impl Driver for RewritingDriver {
    async fn open(&self, dsn: &str) -> DriverResult<Box<dyn Connection>> {
        Ok(Box::new(self.connect(dsn).await?))
    }
}

/// A connection whose statements are rewritten on the way in.
pub struct RewritingConnection {
    inner: Box<dyn Connection>,
}

impl RewritingConnection {
    pub fn new(inner: Box<dyn Connection>) -> Self {
        Self { inner }
    }

    /// The wrapped native connection.
    pub fn inner(&self) -> &dyn Connection {
        self.inner.as_ref()
    }
}

#[async_trait]
impl Connection for RewritingConnection {
    async fn prepare(&self, query: &str) -> DriverResult<Box<dyn Statement>> {
        let prepared = PreparedQuery::new(query);
        let stmt = self.inner.prepare(prepared.rewritten()).await?;
        Ok(Box::new(RewritingStatement {
            inner: stmt,
            prepared,
        }))
    }

    async fn begin(&self) -> DriverResult<Box<dyn Transaction>> {
        self.inner.begin().await
    }

    async fn ping(&self) -> DriverResult<()> {
        self.inner.ping().await
    }

    async fn close(&self) -> DriverResult<()> {
        self.inner.close().await
    }

    fn as_execer(&self) -> Option<&dyn Execer> {
        self.inner.as_execer().map(|_| self as &dyn Execer)
    }

    fn as_queryer(&self) -> Option<&dyn Queryer> {
        self.inner.as_queryer().map(|_| self as &dyn Queryer)
    }
}

#[async_trait]
impl Execer for RewritingConnection {
    /// Rewrite and execute directly. Fails with
    /// [`ShimError::Unsupported`] when the native connection cannot.
    async fn exec(&self, query: &str, args: &[Value]) -> DriverResult<ExecResult> {
        let Some(execer) = self.inner.as_execer() else {
            return Err(ShimError::Unsupported(Capability::Exec).into());
        };
        let prepared = PreparedQuery::new(query);
        let args = prepared.arguments(args);
        execer.exec(prepared.rewritten(), &args).await
    }
}

#[async_trait]
impl Queryer for RewritingConnection {
    /// Rewrite and query directly. Fails with
    /// [`ShimError::Unsupported`] when the native connection cannot.
    async fn query(&self, query: &str, args: &[Value]) -> DriverResult<Box<dyn Rows>> {
        let Some(queryer) = self.inner.as_queryer() else {
            return Err(ShimError::Unsupported(Capability::Query).into());
        };
        let prepared = PreparedQuery::new(query);
        let args = prepared.arguments(args);
        queryer.query(prepared.rewritten(), &args).await
    }
}

/// A native statement prepared from rewritten SQL.
pub struct RewritingStatement {
    inner: Box<dyn Statement>,
    prepared: PreparedQuery,
}

impl RewritingStatement {
    /// Text and reorder plan computed at prepare time.
    pub fn prepared(&self) -> &PreparedQuery {
        &self.prepared
    }
}

#[async_trait]
impl Statement for RewritingStatement {
    fn num_input(&self) -> Option<usize> {
        self.inner.num_input()
    }

    async fn exec(&self, args: &[Value]) -> DriverResult<ExecResult> {
        let args = self.prepared.arguments(args);
        self.inner.exec(&args).await
    }

    async fn query(&self, args: &[Value]) -> DriverResult<Box<dyn Rows>> {
        let args = self.prepared.arguments(args);
        self.inner.query(&args).await
    }

    async fn close(&self) -> DriverResult<()> {
        self.inner.close().await
    }
}
