//! The Clause Transformer.
//!
//! Rewrites MySQL row-limiting clauses into Oracle 12c `OFFSET ... ROWS
//! FETCH NEXT ... ROWS ONLY`. Each `LIMIT`/`OFFSET` site is handled on its
//! own, so a subquery keeps its own clause. At every site the forms are
//! tried in order:
//!
//! | MySQL                  | Oracle                                       |
//! |------------------------|----------------------------------------------|
//! | `LIMIT a OFFSET b`     | `OFFSET b ROWS FETCH NEXT a ROWS ONLY`       |
//! | `OFFSET a LIMIT b`     | `OFFSET a ROWS FETCH NEXT b ROWS ONLY`       |
//! | `LIMIT a, b`           | `OFFSET a ROWS FETCH NEXT b ROWS ONLY`       |
//! | `LIMIT a`              | `FETCH NEXT a ROWS ONLY`                     |
//!
//! Operands are `?`, named markers or numbers, and are copied verbatim.

use crate::lexer::{skip_whitespace, tokenize, Token, TokenKind};

/// Rewrite every row-limiting clause in `sql`.
pub fn rewrite_limit_offset(sql: &str) -> String {
    let tokens = tokenize(sql);
    let mut out = String::with_capacity(sql.len() + 32);
    let mut i = 0;

    while i < tokens.len() {
        match clause_at(&tokens, i) {
            Some(clause) => {
                out.push_str(&clause.render());
                i = clause.end;
            }
            None => {
                out.push_str(tokens[i].text);
                i += 1;
            }
        }
    }

    out
}

/// A recognized clause: operands plus the index just past it.
#[derive(Debug, PartialEq, Eq)]
struct Clause<'a> {
    offset: Option<&'a str>,
    limit: &'a str,
    end: usize,
}

impl Clause<'_> {
    fn render(&self) -> String {
        match self.offset {
            Some(offset) => format!(
                "OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                offset, self.limit
            ),
            None => format!("FETCH NEXT {} ROWS ONLY", self.limit),
        }
    }
}

fn clause_at<'a>(tokens: &[Token<'a>], i: usize) -> Option<Clause<'a>> {
    let tok = tokens[i];

    if tok.is_word("LIMIT") {
        let a = operand_after(tokens, i)?;
        let next = skip_whitespace(tokens, a + 1);

        // LIMIT a OFFSET b
        if tokens.get(next).is_some_and(|t| t.is_word("OFFSET")) {
            if let Some(b) = operand_after(tokens, next) {
                return Some(Clause {
                    offset: Some(tokens[b].text),
                    limit: tokens[a].text,
                    end: b + 1,
                });
            }
        }

        // LIMIT a, b
        if tokens.get(next).is_some_and(|t| t.kind == TokenKind::Comma) {
            if let Some(b) = operand_after(tokens, next) {
                return Some(Clause {
                    offset: Some(tokens[a].text),
                    limit: tokens[b].text,
                    end: b + 1,
                });
            }
        }

        // LIMIT a
        return Some(Clause {
            offset: None,
            limit: tokens[a].text,
            end: a + 1,
        });
    }

    // OFFSET a LIMIT b
    if tok.is_word("OFFSET") {
        let a = operand_after(tokens, i)?;
        let next = skip_whitespace(tokens, a + 1);
        if tokens.get(next).is_some_and(|t| t.is_word("LIMIT")) {
            let b = operand_after(tokens, next)?;
            return Some(Clause {
                offset: Some(tokens[a].text),
                limit: tokens[b].text,
                end: b + 1,
            });
        }
    }

    None
}

/// Index of the operand following the token at `i`, if there is one.
fn operand_after(tokens: &[Token<'_>], i: usize) -> Option<usize> {
    let j = skip_whitespace(tokens, i + 1);
    let tok = tokens.get(j)?;
    matches!(
        tok.kind,
        TokenKind::Positional | TokenKind::Named | TokenKind::Number
    )
    .then_some(j)
}
