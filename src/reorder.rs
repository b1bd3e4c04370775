//! The Argument Reorderer.
//!
//! `LIMIT ? OFFSET ?` is rewritten into `OFFSET :2 ROWS FETCH NEXT :1 ROWS
//! ONLY`: the offset marker now comes first in the text. Oracle binds
//! positional arguments in textual order, so the two arguments have to trade
//! places before they reach the driver.
//!
//! Slots are counted over the original text's bind markers as the lexer sees
//! them; `?` or `:` inside literals and comments never counts.

use crate::lexer::{skip_whitespace, tokenize, Token};

/// Swaps an argument list needs to line up with the rewritten query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    swaps: Vec<(usize, usize)>,
    slots: usize,
}

impl ReorderPlan {
    /// Analyze the original (un-rewritten) query text.
    ///
    /// Returns `None` when no `LIMIT <marker> OFFSET <marker>` clause is
    /// present, i.e. the arguments are already in the right order.
    pub fn analyze(original: &str) -> Option<Self> {
        let tokens = tokenize(original);

        let mut slot_of = vec![None; tokens.len()];
        let mut slots = 0;
        for (i, tok) in tokens.iter().enumerate() {
            if tok.is_marker() {
                slot_of[i] = Some(slots);
                slots += 1;
            }
        }

        let swaps: Vec<(usize, usize)> = (0..tokens.len())
            .filter_map(|i| limit_offset_markers(&tokens, i))
            .filter_map(|(limit, offset)| Some((slot_of[limit]?, slot_of[offset]?)))
            .collect();

        if swaps.is_empty() {
            None
        } else {
            Some(Self { swaps, slots })
        }
    }

    /// `(limit slot, offset slot)` pairs, one per clause.
    pub fn swaps(&self) -> &[(usize, usize)] {
        &self.swaps
    }

    /// Number of bind markers in the original text.
    pub fn slot_count(&self) -> usize {
        self.slots
    }

    /// Reorder `args` in place.
    ///
    /// When there are fewer arguments than markers the list is left exactly
    /// as supplied and `false` is returned.
    pub fn apply<T>(&self, args: &mut [T]) -> bool {
        if args.len() < self.slots {
            tracing::warn!(
                markers = self.slots,
                arguments = args.len(),
                "fewer arguments than bind markers, leaving argument order unchanged"
            );
            return false;
        }
        if args.len() > self.slots {
            tracing::warn!(
                markers = self.slots,
                arguments = args.len(),
                "more arguments than bind markers"
            );
        }

        for &(limit, offset) in &self.swaps {
            args.swap(limit, offset);
        }
        true
    }
}

/// Does the original query need its arguments reordered?
pub fn requires_reorder(original: &str) -> bool {
    ReorderPlan::analyze(original).is_some()
}

/// Return `args` in the order the rewritten form of `original` binds them.
///
/// # Example
///
/// ```
/// let args = myora::reorder("SELECT * FROM t LIMIT ? OFFSET ?", vec![5, 0]);
/// assert_eq!(args, vec![0, 5]);
/// ```
pub fn reorder<T>(original: &str, mut args: Vec<T>) -> Vec<T> {
    if let Some(plan) = ReorderPlan::analyze(original) {
        plan.apply(&mut args);
    }
    args
}

/// Token indices of `(limit marker, offset marker)` for a
/// `LIMIT <marker> OFFSET <marker>` clause starting at `i`.
fn limit_offset_markers(tokens: &[Token<'_>], i: usize) -> Option<(usize, usize)> {
    if !tokens[i].is_word("LIMIT") {
        return None;
    }
    let limit = marker_after(tokens, i)?;
    let keyword = skip_whitespace(tokens, limit + 1);
    if !tokens.get(keyword)?.is_word("OFFSET") {
        return None;
    }
    let offset = marker_after(tokens, keyword)?;
    Some((limit, offset))
}

fn marker_after(tokens: &[Token<'_>], i: usize) -> Option<usize> {
    let j = skip_whitespace(tokens, i + 1);
    tokens.get(j)?.is_marker().then_some(j)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_limit_offset_swaps() {
        assert_eq!(reorder("SELECT * FROM t LIMIT ? OFFSET ?", vec![5, 0]), vec![0, 5]);
    }

    #[test]
    fn test_offset_limit_unchanged() {
        assert_eq!(reorder("SELECT * FROM t OFFSET ? LIMIT ?", vec![0, 5]), vec![0, 5]);
        assert!(!requires_reorder("SELECT * FROM t OFFSET ? LIMIT ?"));
    }

    #[test]
    fn test_leading_filters_keep_position() {
        assert_eq!(
            reorder(
                "SELECT * FROM t WHERE a = ? AND b = ? LIMIT ? OFFSET ?",
                vec!["a", "b", "limit", "offset"]
            ),
            vec!["a", "b", "offset", "limit"]
        );
    }

    #[test]
    fn test_named_markers_count_once() {
        let plan = ReorderPlan::analyze("SELECT * FROM t WHERE id = :10 LIMIT :2 OFFSET :3").unwrap();
        assert_eq!(plan.swaps(), &[(1, 2)]);
        assert_eq!(plan.slot_count(), 3);
    }

    #[test]
    fn test_markers_in_literals_ignored() {
        let sql = "SELECT '?', ':x' FROM t /* ? */ WHERE a = ? LIMIT ? OFFSET ?";
        let plan = ReorderPlan::analyze(sql).unwrap();
        assert_eq!(plan.swaps(), &[(1, 2)]);
        assert_eq!(reorder(sql, vec![1, 10, 20]), vec![1, 20, 10]);
    }

    #[test]
    fn test_keywords_in_literals_ignored() {
        assert!(!requires_reorder("SELECT 'LIMIT ? OFFSET ?' FROM t"));
    }

    #[test]
    fn test_literal_operands_need_nothing() {
        assert!(!requires_reorder("SELECT * FROM t LIMIT 10 OFFSET ?"));
        assert!(!requires_reorder("SELECT * FROM t LIMIT ?, ?"));
        assert!(!requires_reorder("SELECT * FROM t LIMIT ?"));
    }

    #[test]
    fn test_short_argument_list_untouched() {
        assert_eq!(reorder("SELECT * FROM t LIMIT ? OFFSET ?", vec![5]), vec![5]);
        assert_eq!(
            reorder("SELECT * FROM t LIMIT ? OFFSET ? UNION SELECT * FROM u WHERE x = ?", vec![5, 0]),
            vec![5, 0]
        );
        assert_eq!(reorder::<i32>("SELECT * FROM t LIMIT ? OFFSET ?", vec![]), Vec::<i32>::new());
    }

    #[test]
    fn test_extra_arguments_tolerated() {
        assert_eq!(reorder("SELECT * FROM t LIMIT ? OFFSET ?", vec![5, 0, 9]), vec![0, 5, 9]);
    }

    #[test]
    fn test_every_clause_swapped() {
        let sql = "SELECT * FROM (SELECT * FROM a LIMIT ? OFFSET ?) x LIMIT ? OFFSET ?";
        assert_eq!(reorder(sql, vec![1, 2, 3, 4]), vec![2, 1, 4, 3]);
    }

    #[test]
    fn test_apply_reports_fallback() {
        let plan = ReorderPlan::analyze("LIMIT ? OFFSET ?").unwrap();
        let mut short = [1];
        assert!(!plan.apply(&mut short));
        let mut exact = [1, 2];
        assert!(plan.apply(&mut exact));
        assert_eq!(exact, [2, 1]);
    }
}
