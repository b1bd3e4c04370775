//! ORM-facing entry point.
//!
//! [`raw_with_rewriter`] is the hook an ORM calls before handing raw SQL to
//! its executor. The returned [`RawQuery`] carries Oracle SQL and arguments
//! in bind order; running it is the executor's job.

use serde::Serialize;

use crate::driver::Value;
use crate::lexer::tokenize;
use crate::query::PreparedQuery;

/// Rewritten SQL with its arguments already in bind order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawQuery {
    pub sql: String,
    pub args: Vec<Value>,
}

/// One bind argument and the marker it lands on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding<'a> {
    /// 1-based bind position.
    pub position: usize,
    /// Marker text at that position in the rewritten SQL, if there is one.
    pub marker: Option<&'a str>,
    pub value: &'a Value,
}

impl RawQuery {
    /// Pair each argument with the marker it binds to. Positional binding
    /// follows the textual order of markers, not their labels, so after
    /// `LIMIT ? OFFSET ?` the first argument lands on `:2`.
    pub fn bindings(&self) -> Vec<Binding<'_>> {
        let tokens = tokenize(&self.sql);
        let mut markers = tokens.iter().filter(|t| t.is_marker()).map(|t| t.text);
        self.args
            .iter()
            .enumerate()
            .map(|(i, value)| Binding {
                position: i + 1,
                marker: markers.next(),
                value,
            })
            .collect()
    }
}

/// Reorder `args` against the original text of `sql`, then rewrite it.
///
/// ```
/// use myora::driver::Value;
/// use myora::orm::raw_with_rewriter;
///
/// let raw = raw_with_rewriter("SELECT * FROM t LIMIT ? OFFSET ?", [Value::Int(10), Value::Int(20)]);
/// assert_eq!(raw.sql, "SELECT * FROM t OFFSET :2 ROWS FETCH NEXT :1 ROWS ONLY");
/// assert_eq!(raw.args, vec![Value::Int(20), Value::Int(10)]);
/// ```
pub fn raw_with_rewriter(sql: &str, args: impl IntoIterator<Item = Value>) -> RawQuery {
    let prepared = PreparedQuery::new(sql);
    let args: Vec<Value> = args.into_iter().collect();
    let args = prepared.arguments(&args).into_owned();
    RawQuery {
        sql: prepared.rewritten().to_string(),
        args,
    }
}
