//! The Rewrite Pipeline.
//!
//! Converts MySQL-flavored SQL into Oracle SQL as an ordered series of
//! `text -> text` stages. Every stage works on the lexer's token stream, so
//! string literals, quoted identifiers and comments pass through untouched.
//!
//! ```text
//! SELECT IFNULL(`name`, '') FROM users LIMIT ? OFFSET ?
//!   │ quote identifiers      SELECT IFNULL("name", '') ...
//!   │ map functions          SELECT NVL("name", '') ...
//!   │ number placeholders    ... LIMIT :1 OFFSET :2
//!   ▼ row limiting           ... OFFSET :2 ROWS FETCH NEXT :1 ROWS ONLY
//! ```

use crate::clause::rewrite_limit_offset;
use crate::lexer::{matching_paren, render, skip_whitespace, tokenize, Token, TokenKind};
use crate::placeholder::convert_placeholders;
use crate::rules::{self, FunctionAction, FunctionRule, TableOption};

/// A named rewrite stage.
#[derive(Debug, Clone, Copy)]
pub struct Stage {
    pub name: &'static str,
    pub apply: fn(&str) -> String,
}

/// Pipeline stages in application order.
///
/// Placeholders are numbered before the row-limiting clause moves its
/// operands, so each `:n` keeps the caller's argument slot in its label.
pub static STAGES: &[Stage] = &[
    Stage {
        name: "quote identifiers",
        apply: quote_identifiers,
    },
    Stage {
        name: "schema tokens",
        apply: translate_schema_tokens,
    },
    Stage {
        name: "map functions",
        apply: map_functions,
    },
    Stage {
        name: "fold infix calls",
        apply: fold_infix_calls,
    },
    Stage {
        name: "timestamps",
        apply: translate_timestamps,
    },
    Stage {
        name: "strip table options",
        apply: strip_table_options,
    },
    Stage {
        name: "number placeholders",
        apply: convert_placeholders,
    },
    Stage {
        name: "row limiting",
        apply: rewrite_limit_offset,
    },
];

/// Rewrite a MySQL-flavored query into Oracle SQL.
///
/// Total and deterministic: text that matches no rule comes back unchanged.
///
/// # Example
///
/// ```
/// assert_eq!(
///     myora::rewrite("SELECT * FROM t LIMIT ? OFFSET ?"),
///     "SELECT * FROM t OFFSET :2 ROWS FETCH NEXT :1 ROWS ONLY"
/// );
/// ```
pub fn rewrite(query: &str) -> String {
    STAGES
        .iter()
        .fold(query.to_string(), |sql, stage| (stage.apply)(&sql))
}

/// Run the pipeline, keeping the output of every stage.
pub fn explain(query: &str) -> Vec<(&'static str, String)> {
    let mut sql = query.to_string();
    STAGES
        .iter()
        .map(|stage| {
            sql = (stage.apply)(&sql);
            (stage.name, sql.clone())
        })
        .collect()
}

/// `` `name` `` becomes `"name"`.
pub fn quote_identifiers(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());

    for tok in tokenize(sql) {
        match tok.kind {
            TokenKind::BacktickIdent if tok.text.len() >= 2 && tok.text.ends_with('`') => {
                let inner = &tok.text[1..tok.text.len() - 1];
                out.push('"');
                out.push_str(&inner.replace("``", "`").replace('"', "\"\""));
                out.push('"');
            }
            _ => out.push_str(tok.text),
        }
    }

    out
}

/// Replace auto-increment markers and boolean types/literals.
pub fn translate_schema_tokens(sql: &str) -> String {
    let tokens = tokenize(sql);
    let mut out = String::with_capacity(sql.len());

    for (i, tok) in tokens.iter().enumerate() {
        let replacement = match tok.kind {
            TokenKind::Word if !is_qualified(&tokens, i) => rules::find_token(tok.text),
            _ => None,
        };

        match replacement {
            // `AUTO_INCREMENT = n` is a table option, handled by strip_table_options.
            Some(_) if tok.is_word("AUTO_INCREMENT") && followed_by_eq(&tokens, i) => {
                out.push_str(tok.text)
            }
            Some(r) => out.push_str(r),
            None => out.push_str(tok.text),
        }
    }

    out
}

/// Rename functions and replace niladic calls.
pub fn map_functions(sql: &str) -> String {
    apply_call_rules(sql, rules::FUNCTION_RULES)
}

/// Fold `CONCAT(a, b, c)` into `a || b || c` (and `DATEDIFF` into a
/// subtraction). Arguments split on top-level commas only.
pub fn fold_infix_calls(sql: &str) -> String {
    fold(&tokenize(sql))
}

/// `NOW()` becomes `SYSDATE`.
pub fn translate_timestamps(sql: &str) -> String {
    apply_call_rules(sql, rules::TIMESTAMP_RULES)
}

/// Drop storage-engine, charset, collation and counter options from
/// `CREATE TABLE`/`ALTER TABLE` statements.
///
/// An option keyword in name position (first in a column definition, after
/// `ADD COLUMN`, in a select list) or followed by a column type is a column,
/// and is kept.
pub fn strip_table_options(sql: &str) -> String {
    let tokens = tokenize(sql);
    if !is_table_definition(&tokens) {
        return sql.to_string();
    }

    let mut out: Vec<Token<'_>> = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        if let Some(end) = table_option_at(&tokens, i) {
            while out.last().is_some_and(Token::is_whitespace) {
                out.pop();
            }
            i = end;
            continue;
        }
        out.push(tokens[i]);
        i += 1;
    }

    render(&out)
}

/// Parenthesis positions of a call `name ( ... )` starting at `i`.
struct Call {
    open: usize,
    close: usize,
}

fn call_at(tokens: &[Token<'_>], i: usize) -> Option<Call> {
    if tokens[i].kind != TokenKind::Word || is_qualified(tokens, i) {
        return None;
    }
    let open = skip_whitespace(tokens, i + 1);
    if tokens.get(open)?.kind != TokenKind::OpenParen {
        return None;
    }
    let close = matching_paren(tokens, open)?;
    Some(Call { open, close })
}

/// `pkg.name` is a member, not a built-in.
fn is_qualified(tokens: &[Token<'_>], i: usize) -> bool {
    i > 0 && tokens[i - 1].text == "."
}

fn followed_by_eq(tokens: &[Token<'_>], i: usize) -> bool {
    tokens
        .get(skip_whitespace(tokens, i + 1))
        .is_some_and(|t| t.text == "=")
}

fn apply_call_rules(sql: &str, table: &'static [FunctionRule]) -> String {
    let tokens = tokenize(sql);
    let mut out = String::with_capacity(sql.len());
    let mut i = 0;

    while i < tokens.len() {
        let tok = tokens[i];
        let matched = call_at(&tokens, i)
            .and_then(|call| rules::find_function(table, tok.text).map(|rule| (call, rule.action)));

        match matched {
            Some((call, FunctionAction::Rename(name))) => {
                out.push_str(name);
                i = call.open;
            }
            Some((call, FunctionAction::Nullary(expr)))
                if skip_whitespace(&tokens, call.open + 1) == call.close =>
            {
                out.push_str(expr);
                i = call.close + 1;
            }
            _ => {
                out.push_str(tok.text);
                i += 1;
            }
        }
    }

    out
}

fn fold(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    let mut i = 0;

    while i < tokens.len() {
        if let Some((text, next)) = fold_call(tokens, i) {
            out.push_str(&text);
            i = next;
        } else {
            out.push_str(tokens[i].text);
            i += 1;
        }
    }

    out
}

fn fold_call(tokens: &[Token<'_>], i: usize) -> Option<(String, usize)> {
    let call = call_at(tokens, i)?;
    let rule = rules::find_function(rules::FUNCTION_RULES, tokens[i].text)?;
    let FunctionAction::Infix {
        op,
        parenthesize,
        group_operands,
        arity,
    } = rule.action
    else {
        return None;
    };

    let mut args: Vec<String> = split_args(&tokens[call.open + 1..call.close])
        .into_iter()
        .map(|arg| fold(arg).trim().to_string())
        .collect();

    if args.iter().any(String::is_empty) || arity.is_some_and(|n| n != args.len()) {
        return None;
    }
    if group_operands {
        for arg in args.iter_mut().filter(|arg| !is_operand(arg)) {
            *arg = format!("({})", arg);
        }
    }

    let joined = args.join(op);
    let text = if parenthesize {
        format!("({})", joined)
    } else {
        joined
    };
    Some((text, call.close + 1))
}

/// Does `expr` bind as a single operand? True for a lone token, a dotted
/// name, a call or a parenthesized group.
fn is_operand(expr: &str) -> bool {
    let tokens: Vec<Token<'_>> = tokenize(expr)
        .into_iter()
        .filter(|t| !matches!(t.kind, TokenKind::Whitespace | TokenKind::Comment))
        .collect();
    let Some(last) = tokens.len().checked_sub(1) else {
        return false;
    };

    let dotted = tokens.iter().enumerate().all(|(i, t)| {
        if i % 2 == 1 {
            t.text == "."
        } else {
            !matches!(
                t.kind,
                TokenKind::Punct | TokenKind::OpenParen | TokenKind::CloseParen | TokenKind::Comma
            )
        }
    });
    if dotted && last % 2 == 0 {
        return true;
    }

    let group_start = match (tokens[0].kind, tokens.get(1).map(|t| t.kind)) {
        (TokenKind::OpenParen, _) => 0,
        (TokenKind::Word, Some(TokenKind::OpenParen)) => 1,
        _ => return false,
    };
    matching_paren(&tokens, group_start) == Some(last)
}

/// Split an argument list on commas at parenthesis depth zero.
fn split_args<'t, 'a>(tokens: &'t [Token<'a>]) -> Vec<&'t [Token<'a>]> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, tok) in tokens.iter().enumerate() {
        match tok.kind {
            TokenKind::OpenParen => depth += 1,
            TokenKind::CloseParen => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                args.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(&tokens[start..]);

    args
}

fn is_table_definition(tokens: &[Token<'_>]) -> bool {
    let mut words = tokens
        .iter()
        .filter(|t| !matches!(t.kind, TokenKind::Whitespace | TokenKind::Comment));

    if !words
        .next()
        .is_some_and(|t| t.is_word("CREATE") || t.is_word("ALTER"))
    {
        return false;
    }
    words
        .find(|t| !(t.is_word("TEMPORARY") || t.is_word("IGNORE") || t.is_word("ONLINE")))
        .is_some_and(|t| t.is_word("TABLE"))
}

/// Keywords after which the next word names something.
const NAME_POSITION: &[&str] = &[
    "TABLE", "ADD", "COLUMN", "MODIFY", "CHANGE", "DROP", "RENAME", "TO", "AS", "SELECT",
    "EXISTS", "BY", "ON", "KEY", "INDEX",
];

/// How a table option may appear at `i`, judged by the token before it.
/// `None` when `i` is in name position; `Some(true)` when only the
/// `KEYWORD = value` form is accepted.
fn option_context(tokens: &[Token<'_>], i: usize) -> Option<bool> {
    let prev = tokens[..i]
        .iter()
        .rev()
        .find(|t| !matches!(t.kind, TokenKind::Whitespace | TokenKind::Comment))?;

    match prev.kind {
        TokenKind::CloseParen => Some(false),
        TokenKind::Comma => Some(true),
        TokenKind::Word if NAME_POSITION.iter().any(|kw| prev.is_word(kw)) => None,
        TokenKind::Word | TokenKind::Number | TokenKind::Str | TokenKind::QuotedIdent => {
            Some(false)
        }
        _ => None,
    }
}

/// End index of a table option starting at `i`.
fn table_option_at(tokens: &[Token<'_>], i: usize) -> Option<usize> {
    if tokens[i].kind != TokenKind::Word {
        return None;
    }
    let needs_eq = option_context(tokens, i)?;
    let (start, defaulted) = if tokens[i].is_word("DEFAULT") {
        (skip_whitespace(tokens, i + 1), true)
    } else {
        (i, false)
    };

    rules::TABLE_OPTIONS
        .iter()
        .filter(|opt| !defaulted || opt.defaultable)
        .find_map(|opt| match_option(tokens, start, opt, needs_eq))
}

fn match_option(
    tokens: &[Token<'_>],
    start: usize,
    opt: &TableOption,
    needs_eq: bool,
) -> Option<usize> {
    let mut j = start;
    for (n, keyword) in opt.keywords.iter().enumerate() {
        if n > 0 {
            j = skip_whitespace(tokens, j);
        }
        if !tokens.get(j)?.is_word(keyword) {
            return None;
        }
        j += 1;
    }

    j = skip_whitespace(tokens, j);
    let has_eq = tokens.get(j)?.text == "=";
    if has_eq {
        j = skip_whitespace(tokens, j + 1);
    } else if opt.requires_eq || needs_eq {
        return None;
    }

    let value = tokens.get(j)?;
    // `charset VARCHAR(10)` is a column definition.
    if !has_eq && value.kind == TokenKind::Word && rules::is_column_type(value.text) {
        return None;
    }
    matches!(
        value.kind,
        TokenKind::Word | TokenKind::Number | TokenKind::Str | TokenKind::QuotedIdent
    )
    .then_some(j + 1)
}
