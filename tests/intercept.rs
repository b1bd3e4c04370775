//! Interception layer tests against an in-memory driver.

use async_trait::async_trait;
use myora::driver::{
    exec_or_prepare, query_or_prepare, Connection, Driver, DriverResult, ExecResult, Execer,
    Queryer, Rows, Statement, Transaction, Value,
};
use myora::error::{is_unsupported, ShimError};
use myora::intercept::{RewritingConnection, RewritingDriver};
use myora::registry;
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// What the native driver was asked to do.
#[derive(Debug, Clone, PartialEq)]
enum Call {
    Open(String),
    Prepare(String),
    StmtExec(String, Vec<Value>),
    StmtQuery(String, Vec<Value>),
    StmtClose(String),
    Exec(String, Vec<Value>),
    Query(String, Vec<Value>),
    Begin,
    Commit,
    Close,
}

type Log = Arc<Mutex<Vec<Call>>>;

#[derive(Debug, thiserror::Error)]
#[error("ORA-{code:05}: {message}")]
struct OraError {
    code: u32,
    message: &'static str,
}

fn check(sql: &str) -> DriverResult<()> {
    if sql.contains("missing_table") {
        return Err(Box::new(OraError {
            code: 942,
            message: "table or view does not exist",
        }));
    }
    Ok(())
}

/// Statements on `locked_table` prepare fine but fail to run and to close.
fn check_locked(sql: &str, code: u32) -> DriverResult<()> {
    if sql.contains("locked_table") {
        return Err(Box::new(OraError {
            code,
            message: "resource busy",
        }));
    }
    Ok(())
}

fn record(log: &Log, call: Call) {
    log.lock().unwrap().push(call);
}

struct MockDriver {
    log: Log,
    direct: bool,
}

#[async_trait]
impl Driver for MockDriver {
    async fn open(&self, dsn: &str) -> DriverResult<Box<dyn Connection>> {
        record(&self.log, Call::Open(dsn.to_string()));
        Ok(Box::new(MockConnection {
            log: self.log.clone(),
            direct: self.direct,
        }))
    }
}

struct MockConnection {
    log: Log,
    direct: bool,
}

#[async_trait]
impl Connection for MockConnection {
    async fn prepare(&self, query: &str) -> DriverResult<Box<dyn Statement>> {
        record(&self.log, Call::Prepare(query.to_string()));
        check(query)?;
        Ok(Box::new(MockStatement {
            log: self.log.clone(),
            sql: query.to_string(),
        }))
    }

    async fn begin(&self) -> DriverResult<Box<dyn Transaction>> {
        record(&self.log, Call::Begin);
        Ok(Box::new(MockTransaction {
            log: self.log.clone(),
        }))
    }

    async fn close(&self) -> DriverResult<()> {
        record(&self.log, Call::Close);
        Ok(())
    }

    fn as_execer(&self) -> Option<&dyn Execer> {
        self.direct.then_some(self as &dyn Execer)
    }

    fn as_queryer(&self) -> Option<&dyn Queryer> {
        self.direct.then_some(self as &dyn Queryer)
    }
}

#[async_trait]
impl Execer for MockConnection {
    async fn exec(&self, query: &str, args: &[Value]) -> DriverResult<ExecResult> {
        record(&self.log, Call::Exec(query.to_string(), args.to_vec()));
        check(query)?;
        Ok(ExecResult {
            rows_affected: 1,
            last_insert_id: None,
        })
    }
}

#[async_trait]
impl Queryer for MockConnection {
    async fn query(&self, query: &str, args: &[Value]) -> DriverResult<Box<dyn Rows>> {
        record(&self.log, Call::Query(query.to_string(), args.to_vec()));
        check(query)?;
        Ok(Box::new(MockRows::new(args)))
    }
}

struct MockStatement {
    log: Log,
    sql: String,
}

#[async_trait]
impl Statement for MockStatement {
    async fn exec(&self, args: &[Value]) -> DriverResult<ExecResult> {
        record(&self.log, Call::StmtExec(self.sql.clone(), args.to_vec()));
        Ok(ExecResult {
            rows_affected: args.len() as u64,
            last_insert_id: Some(7),
        })
    }

    async fn query(&self, args: &[Value]) -> DriverResult<Box<dyn Rows>> {
        record(&self.log, Call::StmtQuery(self.sql.clone(), args.to_vec()));
        check_locked(&self.sql, 54)?;
        Ok(Box::new(MockRows::new(args)))
    }

    async fn close(&self) -> DriverResult<()> {
        record(&self.log, Call::StmtClose(self.sql.clone()));
        check_locked(&self.sql, 3113)
    }
}

struct MockTransaction {
    log: Log,
}

#[async_trait]
impl Transaction for MockTransaction {
    async fn commit(&self) -> DriverResult<()> {
        record(&self.log, Call::Commit);
        Ok(())
    }

    async fn rollback(&self) -> DriverResult<()> {
        Ok(())
    }
}

/// One row echoing the bound arguments.
struct MockRows {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
}

impl MockRows {
    fn new(args: &[Value]) -> Self {
        Self {
            columns: (1..=args.len()).map(|i| format!("arg{}", i)).collect(),
            rows: VecDeque::from([args.to_vec()]),
        }
    }
}

#[async_trait]
impl Rows for MockRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next(&mut self) -> DriverResult<Option<Vec<Value>>> {
        Ok(self.rows.pop_front())
    }
}

async fn connect(direct: bool) -> (RewritingConnection, Log) {
    let log = Log::default();
    let driver = RewritingDriver::new(Arc::new(MockDriver {
        log: log.clone(),
        direct,
    }));
    let conn = driver.connect("oracle://scott@db/orcl").await.unwrap();
    (conn, log)
}

fn calls(log: &Log) -> Vec<Call> {
    log.lock().unwrap().clone()
}

fn args(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

const PAGED: &str = "SELECT * FROM users LIMIT ? OFFSET ?";
const PAGED_ORACLE: &str = "SELECT * FROM users OFFSET :2 ROWS FETCH NEXT :1 ROWS ONLY";

#[tokio::test]
async fn test_prepare_rewrites_and_reorders() {
    let (conn, log) = connect(false).await;

    let stmt = conn.prepare(PAGED).await.unwrap();
    stmt.exec(&args(&[10, 0])).await.unwrap();
    stmt.exec(&args(&[10, 20])).await.unwrap();
    stmt.close().await.unwrap();

    assert_eq!(
        calls(&log),
        vec![
            Call::Open("oracle://scott@db/orcl".into()),
            Call::Prepare(PAGED_ORACLE.into()),
            Call::StmtExec(PAGED_ORACLE.into(), args(&[0, 10])),
            Call::StmtExec(PAGED_ORACLE.into(), args(&[20, 10])),
            Call::StmtClose(PAGED_ORACLE.into()),
        ]
    );
}

#[tokio::test]
async fn test_prepare_without_reorder() {
    let (conn, log) = connect(false).await;

    let stmt = conn
        .prepare("UPDATE users SET name = ? WHERE id = ?")
        .await
        .unwrap();
    let result = stmt.exec(&[Value::from("ann"), Value::Int(3)]).await.unwrap();
    assert_eq!(result.rows_affected, 2);
    assert_eq!(result.last_insert_id, Some(7));

    assert_eq!(
        calls(&log).last(),
        Some(&Call::StmtExec(
            "UPDATE users SET name = :1 WHERE id = :2".into(),
            vec![Value::from("ann"), Value::Int(3)]
        ))
    );
}

#[tokio::test]
async fn test_statement_query_reorders() {
    let (conn, _log) = connect(false).await;

    let stmt = conn.prepare(PAGED).await.unwrap();
    let mut rows = stmt.query(&args(&[5, 15])).await.unwrap();
    assert_eq!(rows.columns(), &["arg1".to_string(), "arg2".to_string()]);
    assert_eq!(rows.next().await.unwrap(), Some(args(&[15, 5])));
    assert_eq!(rows.next().await.unwrap(), None);
}

#[tokio::test]
async fn test_direct_exec_rewrites_and_reorders() {
    let (conn, log) = connect(true).await;

    assert!(conn.as_execer().is_some());
    let result = conn.exec(PAGED, &args(&[10, 20])).await.unwrap();
    assert_eq!(result.rows_affected, 1);

    assert_eq!(
        calls(&log).last(),
        Some(&Call::Exec(PAGED_ORACLE.into(), args(&[20, 10])))
    );
}

#[tokio::test]
async fn test_direct_query_rewrites_functions() {
    let (conn, log) = connect(true).await;

    let mut rows = conn
        .query("SELECT IFNULL(name, ?) FROM users WHERE created < NOW()", &[Value::from("-")])
        .await
        .unwrap();
    assert_eq!(rows.next().await.unwrap(), Some(vec![Value::from("-")]));

    assert_eq!(
        calls(&log).last(),
        Some(&Call::Query(
            "SELECT NVL(name, :1) FROM users WHERE created < SYSDATE".into(),
            vec![Value::from("-")]
        ))
    );
}

#[tokio::test]
async fn test_direct_unsupported() {
    let (conn, log) = connect(false).await;

    assert!(conn.as_execer().is_none());
    assert!(conn.as_queryer().is_none());

    let err = conn.exec(PAGED, &args(&[1, 2])).await.unwrap_err();
    assert!(is_unsupported(&err));
    let err = conn.query(PAGED, &args(&[1, 2])).await.err().unwrap();
    assert!(is_unsupported(&err));
    assert!(matches!(
        err.downcast_ref::<ShimError>(),
        Some(ShimError::Unsupported(_))
    ));

    // Nothing reached the native driver beyond the open.
    assert_eq!(calls(&log).len(), 1);
}

#[tokio::test]
async fn test_exec_or_prepare_falls_back() {
    let (conn, log) = connect(false).await;

    exec_or_prepare(&conn, PAGED, &args(&[10, 0])).await.unwrap();

    assert_eq!(
        calls(&log)[1..].to_vec(),
        vec![
            Call::Prepare(PAGED_ORACLE.into()),
            Call::StmtExec(PAGED_ORACLE.into(), args(&[0, 10])),
            Call::StmtClose(PAGED_ORACLE.into()),
        ]
    );
}

#[tokio::test]
async fn test_exec_or_prepare_prefers_direct() {
    let (conn, log) = connect(true).await;

    exec_or_prepare(&conn, PAGED, &args(&[10, 0])).await.unwrap();

    assert_eq!(
        calls(&log)[1..].to_vec(),
        vec![Call::Exec(PAGED_ORACLE.into(), args(&[0, 10]))]
    );
}

#[tokio::test]
async fn test_query_or_prepare_closes_when_exhausted() {
    let (conn, log) = connect(false).await;

    let mut rows = query_or_prepare(&conn, PAGED, &args(&[3, 6])).await.unwrap();
    assert!(!calls(&log).contains(&Call::StmtClose(PAGED_ORACLE.into())));

    assert_eq!(rows.next().await.unwrap(), Some(args(&[6, 3])));
    assert_eq!(rows.next().await.unwrap(), None);
    assert_eq!(
        calls(&log).last(),
        Some(&Call::StmtClose(PAGED_ORACLE.into()))
    );
}

#[tokio::test]
async fn test_query_or_prepare_keeps_query_error_when_close_fails() {
    let (conn, log) = connect(false).await;

    let err = query_or_prepare(&conn, "SELECT * FROM locked_table LIMIT ?", &args(&[1]))
        .await
        .err()
        .unwrap();

    let ora = err.downcast_ref::<OraError>().unwrap();
    assert_eq!(ora.code, 54);
    assert_eq!(
        calls(&log).last(),
        Some(&Call::StmtClose(
            "SELECT * FROM locked_table FETCH NEXT :1 ROWS ONLY".into()
        ))
    );
}

#[tokio::test]
async fn test_driver_error_passes_through() {
    let (conn, _log) = connect(true).await;

    let err = conn
        .prepare("SELECT * FROM missing_table")
        .await
        .err()
        .unwrap();
    let ora = err.downcast_ref::<OraError>().unwrap();
    assert_eq!(ora.code, 942);
    assert_eq!(err.to_string(), "ORA-00942: table or view does not exist");

    let err = conn
        .exec("DELETE FROM missing_table", &[])
        .await
        .unwrap_err();
    assert!(err.downcast_ref::<OraError>().is_some());
    assert!(!is_unsupported(&err));
}

#[tokio::test]
async fn test_connection_passthrough() {
    let (conn, log) = connect(false).await;

    let tx = conn.begin().await.unwrap();
    tx.commit().await.unwrap();
    conn.ping().await.unwrap();
    conn.close().await.unwrap();

    assert_eq!(
        calls(&log)[1..].to_vec(),
        vec![Call::Begin, Call::Commit, Call::Close]
    );
}

#[tokio::test]
async fn test_registry_open_rewrites() {
    let log = Log::default();
    let native = Arc::new(MockDriver {
        log: log.clone(),
        direct: false,
    });
    registry::register_driver("mock-native", native.clone()).unwrap();
    registry::register_rewriting(
        &myora::config::ShimConfig {
            driver_name: "mock-rewriting".into(),
            ..Default::default()
        },
        native,
    )
    .unwrap();

    let names = registry::drivers();
    assert!(names.contains(&"mock-native".to_string()));
    assert!(names.contains(&"mock-rewriting".to_string()));

    let conn = registry::open("mock-rewriting", "dsn").await.unwrap();
    conn.prepare(PAGED).await.unwrap();
    let native_conn = registry::open("mock-native", "dsn").await.unwrap();
    native_conn.prepare(PAGED).await.unwrap();

    assert_eq!(
        calls(&log),
        vec![
            Call::Open("dsn".into()),
            Call::Prepare(PAGED_ORACLE.into()),
            Call::Open("dsn".into()),
            Call::Prepare(PAGED.into()),
        ]
    );
}

#[tokio::test]
async fn test_registry_errors() {
    let driver = Arc::new(MockDriver {
        log: Log::default(),
        direct: false,
    });
    registry::register_driver("mock-duplicate", driver.clone()).unwrap();

    let err = registry::register_driver("mock-duplicate", driver).unwrap_err();
    assert!(matches!(err, ShimError::DuplicateDriver(name) if name == "mock-duplicate"));

    let err = registry::open("mock-unknown", "dsn").await.err().unwrap();
    assert!(matches!(err, ShimError::UnknownDriver(name) if name == "mock-unknown"));
}

#[tokio::test]
async fn test_register_default_name() {
    let driver = Arc::new(MockDriver {
        log: Log::default(),
        direct: false,
    });
    myora::register(driver.clone()).unwrap();
    assert!(registry::drivers().contains(&myora::intercept::DRIVER_NAME.to_string()));
    assert!(myora::register(driver).is_err());
}
