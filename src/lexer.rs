//! SQL lexer using nom.
//!
//! Splits MySQL-flavored SQL into a flat token stream. This is not a parser:
//! it only knows enough to tell code apart from literals, quoted names and
//! comments, so that rewrite rules never fire inside them.
//!
//! ```text
//! SELECT `name` FROM t WHERE note = 'LIMIT ?' LIMIT ?
//! ──┬─── ──┬───              ──┬─   ────┬──── ──┬── ┬
//!   │      │                   │        │       │   └── Positional
//!   │      │                   │        │       └────── Word (rewritable)
//!   │      │                   │        └────────────── Str (left alone)
//!   │      │                   └─────────────────────── Word
//!   │      └─────────────────────────────────────────── BacktickIdent
//!   └────────────────────────────────────────────────── Word
//! ```
//!
//! Tokenizing is total: every input produces a token stream whose texts,
//! concatenated, give back the input byte for byte.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_till, take_until, take_while, take_while1},
    character::complete::{anychar, char, digit1, multispace1},
    combinator::{map, opt, recognize, rest},
    multi::many0,
    sequence::{pair, terminated, tuple},
    IResult,
};

/// Lexical class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    /// `-- ...`, `# ...` or `/* ... */`.
    Comment,
    /// Identifier or keyword.
    Word,
    Number,
    /// Single-quoted string literal.
    Str,
    /// `"name"`
    QuotedIdent,
    /// `` `name` ``
    BacktickIdent,
    /// `?`
    Positional,
    /// `:1`, `:name`
    Named,
    OpenParen,
    CloseParen,
    Comma,
    Punct,
}

/// A slice of the input together with its lexical class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, text: &'a str) -> Self {
        Self { kind, text }
    }

    /// Case-insensitive keyword check.
    pub fn is_word(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    /// Positional or named bind marker.
    pub fn is_marker(&self) -> bool {
        matches!(self.kind, TokenKind::Positional | TokenKind::Named)
    }

    pub fn is_whitespace(&self) -> bool {
        self.kind == TokenKind::Whitespace
    }
}

/// Tokenize SQL text.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut remaining = input;

    while !remaining.is_empty() {
        match token(remaining) {
            Ok((rest, tok)) => {
                tokens.push(tok);
                remaining = rest;
            }
            Err(_) => {
                // anychar accepts any non-empty input, so this is only a guard.
                tokens.push(Token::new(TokenKind::Punct, remaining));
                break;
            }
        }
    }

    tokens
}

/// Concatenate token texts back into SQL.
pub fn render(tokens: &[Token<'_>]) -> String {
    tokens.iter().map(|t| t.text).collect()
}

/// Index of the first non-whitespace token at or after `from`.
pub(crate) fn skip_whitespace(tokens: &[Token<'_>], from: usize) -> usize {
    let mut i = from;
    while i < tokens.len() && tokens[i].is_whitespace() {
        i += 1;
    }
    i
}

/// Index of the `)` closing the `(` at `open`, if the input has one.
pub(crate) fn matching_paren(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(open) {
        match tok.kind {
            TokenKind::OpenParen => depth += 1,
            TokenKind::CloseParen => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn token(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        map(multispace1, |t| Token::new(TokenKind::Whitespace, t)),
        map(comment, |t| Token::new(TokenKind::Comment, t)),
        map(quoted('\'', "'\\", "''"), |t| Token::new(TokenKind::Str, t)),
        map(quoted('"', "\"\\", "\"\""), |t| {
            Token::new(TokenKind::QuotedIdent, t)
        }),
        map(quoted('`', "`", "``"), |t| {
            Token::new(TokenKind::BacktickIdent, t)
        }),
        map(number, |t| Token::new(TokenKind::Number, t)),
        map(word, |t| Token::new(TokenKind::Word, t)),
        map(tag("::"), |t| Token::new(TokenKind::Punct, t)),
        map(named_marker, |t| Token::new(TokenKind::Named, t)),
        map(tag("?"), |t| Token::new(TokenKind::Positional, t)),
        map(tag("("), |t| Token::new(TokenKind::OpenParen, t)),
        map(tag(")"), |t| Token::new(TokenKind::CloseParen, t)),
        map(tag(","), |t| Token::new(TokenKind::Comma, t)),
        map(recognize(anychar), |t| Token::new(TokenKind::Punct, t)),
    ))(input)
}

/// Parse a comment. An unterminated block comment runs to end of input.
fn comment(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(
            alt((tag("-- "), tag("--\t"), tag("#"))),
            take_till(|c: char| c == '\n'),
        )),
        recognize(pair(
            tag("/*"),
            alt((terminated(take_until("*/"), tag("*/")), rest)),
        )),
    ))(input)
}

/// Parse a quoted span. `stop` lists the characters that end a plain run,
/// `doubled` is the in-band escape for the delimiter. A backslash escapes the
/// next character wherever `stop` contains one. Unterminated spans run to end
/// of input.
fn quoted<'a>(
    delim: char,
    stop: &'static str,
    doubled: &'static str,
) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    recognize(tuple((
        char(delim),
        many0(alt((
            is_not(stop),
            tag(doubled),
            recognize(pair(char('\\'), anychar)),
        ))),
        opt(char(delim)),
    )))
}

fn number(input: &str) -> IResult<&str, &str> {
    recognize(pair(digit1, opt(pair(char('.'), digit1))))(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '$'),
    ))(input)
}

fn named_marker(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        char(':'),
        take_while1(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(input: &str) -> Vec<(TokenKind, &str)> {
        tokenize(input).into_iter().map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn test_simple_select() {
        use TokenKind::*;
        assert_eq!(
            kinds("SELECT a, b FROM t WHERE id = ?"),
            vec![
                (Word, "SELECT"),
                (Whitespace, " "),
                (Word, "a"),
                (Comma, ","),
                (Whitespace, " "),
                (Word, "b"),
                (Whitespace, " "),
                (Word, "FROM"),
                (Whitespace, " "),
                (Word, "t"),
                (Whitespace, " "),
                (Word, "WHERE"),
                (Whitespace, " "),
                (Word, "id"),
                (Whitespace, " "),
                (Punct, "="),
                (Whitespace, " "),
                (Positional, "?"),
            ]
        );
    }

    #[test]
    fn test_string_literal_hides_keywords() {
        let tokens = tokenize("SELECT 'LIMIT ? OFFSET ?' FROM t");
        assert_eq!(tokens[2], Token::new(TokenKind::Str, "'LIMIT ? OFFSET ?'"));
        assert!(tokens.iter().all(|t| !t.is_marker()));
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize(r"'it''s' 'a\'b'");
        assert_eq!(tokens[0], Token::new(TokenKind::Str, "'it''s'"));
        assert_eq!(tokens[2], Token::new(TokenKind::Str, r"'a\'b'"));
    }

    #[test]
    fn test_quoted_identifiers() {
        use TokenKind::*;
        assert_eq!(
            kinds("`my col` \"Other\""),
            vec![
                (BacktickIdent, "`my col`"),
                (Whitespace, " "),
                (QuotedIdent, "\"Other\""),
            ]
        );
    }

    #[test]
    fn test_comments() {
        use TokenKind::*;
        assert_eq!(
            kinds("a -- LIMIT ?\n/* ? */ # x"),
            vec![
                (Word, "a"),
                (Whitespace, " "),
                (Comment, "-- LIMIT ?"),
                (Whitespace, "\n"),
                (Comment, "/* ? */"),
                (Whitespace, " "),
                (Comment, "# x"),
            ]
        );
    }

    #[test]
    fn test_markers() {
        use TokenKind::*;
        assert_eq!(
            kinds("?,:1,:name,x::int"),
            vec![
                (Positional, "?"),
                (Comma, ","),
                (Named, ":1"),
                (Comma, ","),
                (Named, ":name"),
                (Comma, ","),
                (Word, "x"),
                (Punct, "::"),
                (Word, "int"),
            ]
        );
    }

    #[test]
    fn test_unterminated_spans_are_total() {
        for input in ["SELECT 'open", "SELECT /* open", "`open", "a \\"] {
            assert_eq!(render(&tokenize(input)), input);
        }
    }

    #[test]
    fn test_render_roundtrip() {
        let sql = "CREATE TABLE `t` (id INT AUTO_INCREMENT) ENGINE=InnoDB; -- done";
        assert_eq!(render(&tokenize(sql)), sql);
    }

    #[test]
    fn test_matching_paren() {
        let tokens = tokenize("f(a, (b), c) + 1");
        assert_eq!(matching_paren(&tokens, 1), Some(11));
        assert_eq!(matching_paren(&tokenize("f(a"), 1), None);
    }
}
