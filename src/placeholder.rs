//! The Placeholder Converter.
//!
//! MySQL binds `?` by position; Oracle wants explicit markers. Every
//! positional marker outside literals and comments is replaced, left to
//! right, with `:1`, `:2`, ...

use crate::lexer::{tokenize, TokenKind};

/// Replace each `?` with a 1-based numbered marker.
pub fn convert_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut next = 1usize;

    for tok in tokenize(sql) {
        if tok.kind == TokenKind::Positional {
            out.push(':');
            out.push_str(&next.to_string());
            next += 1;
        } else {
            out.push_str(tok.text);
        }
    }

    out
}

/// Count the positional markers in `sql`.
pub fn count_placeholders(sql: &str) -> usize {
    tokenize(sql)
        .iter()
        .filter(|t| t.kind == TokenKind::Positional)
        .count()
}
