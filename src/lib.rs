//! # my-ora: MySQL-flavored SQL on Oracle
//!
//! my-ora sits between an application and its Oracle driver. Queries written
//! in MySQL dialect are rewritten into Oracle SQL, and bind arguments are
//! reordered wherever the rewrite moved their markers.
//!
//! ## Quick Example
//!
//! ```
//! let sql = myora::rewrite("SELECT IFNULL(name, '-') FROM users LIMIT ? OFFSET ?");
//! assert_eq!(
//!     sql,
//!     "SELECT NVL(name, '-') FROM users OFFSET :2 ROWS FETCH NEXT :1 ROWS ONLY"
//! );
//!
//! let args = myora::reorder("SELECT IFNULL(name, '-') FROM users LIMIT ? OFFSET ?", vec![10, 20]);
//! assert_eq!(args, vec![20, 10]);
//! ```
//!
//! Wrapping a native driver:
//!
//! ```rust,ignore
//! myora::register(Arc::new(NativeOracle))?;
//! let conn = myora::registry::open("my-ora", "oracle://scott@db/orcl").await?;
//! let stmt = conn.prepare("SELECT * FROM t LIMIT ? OFFSET ?").await?;
//! ```
//!
//! ## Rules
//!
//! | MySQL                    | Oracle                                  |
//! |--------------------------|-----------------------------------------|
//! | `` `col` ``              | `"col"`                                 |
//! | `AUTO_INCREMENT`         | `GENERATED ALWAYS AS IDENTITY`          |
//! | `BOOLEAN`, `TRUE`        | `NUMBER(1)`, `1`                        |
//! | `IFNULL(a, b)`           | `NVL(a, b)`                             |
//! | `CONCAT(a, b)`           | `a \|\| b`                              |
//! | `NOW()`                  | `SYSDATE`                               |
//! | `ENGINE=InnoDB`          | (removed)                               |
//! | `?`                      | `:1`, `:2`, ...                         |
//! | `LIMIT a OFFSET b`       | `OFFSET b ROWS FETCH NEXT a ROWS ONLY`  |

use std::sync::Arc;

pub mod clause;
pub mod config;
pub mod driver;
pub mod error;
pub mod intercept;
pub mod lexer;
pub mod orm;
pub mod placeholder;
pub mod query;
pub mod registry;
pub mod reorder;
pub mod rewrite;
pub mod rules;

pub use reorder::reorder;
pub use rewrite::rewrite;

use config::ShimConfig;
use driver::Driver;
use error::ShimResult;

pub mod prelude {
    pub use crate::config::ShimConfig;
    pub use crate::driver::{
        exec_or_prepare, query_or_prepare, Capability, Connection, Driver, DriverError,
        DriverResult, ExecResult, Execer, Queryer, Rows, Statement, Transaction, Value,
    };
    pub use crate::error::*;
    pub use crate::intercept::{RewritingConnection, RewritingDriver, DRIVER_NAME};
    pub use crate::orm::{raw_with_rewriter, Binding, RawQuery};
    pub use crate::query::PreparedQuery;
    pub use crate::reorder::{reorder, ReorderPlan};
    pub use crate::rewrite::rewrite;
}

/// Register the rewriting driver around `inner` under
/// [`DRIVER_NAME`](intercept::DRIVER_NAME).
///
/// The inner driver's own registration, if any, is left alone.
pub fn register(inner: Arc<dyn Driver>) -> ShimResult<()> {
    register_with_config(&ShimConfig::default(), inner)
}

/// Like [`register`], under the configured driver name.
pub fn register_with_config(config: &ShimConfig, inner: Arc<dyn Driver>) -> ShimResult<()> {
    registry::register_rewriting(config, inner)
}
