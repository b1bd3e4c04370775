//! A query after the pipeline: rewritten text plus the reordering it needs.
//!
//! Both call paths, the driver wrapper and the raw ORM entry point, go
//! through [`PreparedQuery`] so they agree on the SQL a driver sees and on
//! the order its arguments arrive in.

use std::borrow::Cow;

use crate::reorder::ReorderPlan;
use crate::rewrite::rewrite;

/// Rewritten SQL, the original text and its reorder plan. Computed once,
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedQuery {
    original: String,
    rewritten: String,
    plan: Option<ReorderPlan>,
}

impl PreparedQuery {
    /// Analyze and rewrite `original`.
    pub fn new(original: &str) -> Self {
        let plan = ReorderPlan::analyze(original);
        let rewritten = rewrite(original);
        tracing::debug!(
            original,
            rewritten = rewritten.as_str(),
            reorder = plan.is_some(),
            "rewrote query"
        );
        Self {
            original: original.to_string(),
            rewritten,
            plan,
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn rewritten(&self) -> &str {
        &self.rewritten
    }

    /// Do arguments need reordering before they are bound?
    pub fn requires_reorder(&self) -> bool {
        self.plan.is_some()
    }

    pub fn plan(&self) -> Option<&ReorderPlan> {
        self.plan.as_ref()
    }

    /// `args` in bind order for [`rewritten`](Self::rewritten). Borrows when
    /// nothing has to move.
    pub fn arguments<'a, T: Clone>(&self, args: &'a [T]) -> Cow<'a, [T]> {
        match &self.plan {
            Some(plan) => {
                let mut owned = args.to_vec();
                plan.apply(&mut owned);
                Cow::Owned(owned)
            }
            None => Cow::Borrowed(args),
        }
    }
}
