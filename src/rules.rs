//! The Pattern Rule Set.
//!
//! Fixed tables consulted by the rewrite stages. They are plain `static`
//! data: built into the binary, shared read-only by every caller, never
//! modified at runtime.

/// What a function rule does with a matched call `NAME(...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionAction {
    /// Replace the function name, keep the argument list.
    Rename(&'static str),
    /// Replace an empty-argument call `NAME()` with a fixed expression.
    Nullary(&'static str),
    /// Replace the call with its arguments joined by an infix operator.
    /// `arity` restricts the fold to an exact argument count.
    /// `group_operands` wraps every compound operand in parentheses.
    Infix {
        op: &'static str,
        parenthesize: bool,
        group_operands: bool,
        arity: Option<usize>,
    },
}

/// A function-name rule. Names match case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionRule {
    pub name: &'static str,
    pub action: FunctionAction,
}

/// A whole-word token replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRule {
    pub word: &'static str,
    pub replacement: &'static str,
}

const fn rename(name: &'static str, to: &'static str) -> FunctionRule {
    FunctionRule {
        name,
        action: FunctionAction::Rename(to),
    }
}

const fn nullary(name: &'static str, to: &'static str) -> FunctionRule {
    FunctionRule {
        name,
        action: FunctionAction::Nullary(to),
    }
}

/// Schema and literal tokens.
pub static SCHEMA_TOKENS: &[TokenRule] = &[
    TokenRule {
        word: "AUTO_INCREMENT",
        replacement: "GENERATED ALWAYS AS IDENTITY",
    },
    TokenRule {
        word: "BOOLEAN",
        replacement: "NUMBER(1)",
    },
    TokenRule {
        word: "BOOL",
        replacement: "NUMBER(1)",
    },
    TokenRule {
        word: "TRUE",
        replacement: "1",
    },
    TokenRule {
        word: "FALSE",
        replacement: "0",
    },
];

/// Function calls with an Oracle counterpart.
pub static FUNCTION_RULES: &[FunctionRule] = &[
    rename("IFNULL", "NVL"),
    rename("ISNULL", "NVL"),
    rename("SUBSTRING", "SUBSTR"),
    rename("CHAR_LENGTH", "LENGTH"),
    rename("LENGTH", "LENGTH"),
    rename("REPLACE", "REPLACE"),
    rename("LOCATE", "INSTR"),
    nullary("CURDATE", "TRUNC(SYSDATE)"),
    nullary("CURRENT_DATE", "TRUNC(SYSDATE)"),
    nullary("CURTIME", "TO_CHAR(SYSDATE, 'HH24:MI:SS')"),
    rename("DATE_FORMAT", "TO_CHAR"),
    nullary("RAND", "DBMS_RANDOM.VALUE"),
    rename("FLOOR", "FLOOR"),
    rename("CEIL", "CEIL"),
    rename("ROUND", "ROUND"),
    rename("MOD", "MOD"),
    FunctionRule {
        name: "CONCAT",
        action: FunctionAction::Infix {
            op: " || ",
            parenthesize: false,
            group_operands: false,
            arity: None,
        },
    },
    FunctionRule {
        name: "DATEDIFF",
        action: FunctionAction::Infix {
            op: " - ",
            parenthesize: true,
            group_operands: true,
            arity: Some(2),
        },
    },
];

/// Current-timestamp calls.
pub static TIMESTAMP_RULES: &[FunctionRule] = &[
    nullary("NOW", "SYSDATE"),
    nullary("CURRENT_TIMESTAMP", "CURRENT_TIMESTAMP"),
];

/// A DDL table option: its keyword sequence and whether `=` is mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOption {
    pub keywords: &'static [&'static str],
    pub requires_eq: bool,
    /// May be preceded by `DEFAULT`.
    pub defaultable: bool,
}

/// Table options with no Oracle meaning, removed from `CREATE`/`ALTER`.
pub static TABLE_OPTIONS: &[TableOption] = &[
    TableOption {
        keywords: &["ENGINE"],
        requires_eq: true,
        defaultable: false,
    },
    TableOption {
        keywords: &["CHARSET"],
        requires_eq: false,
        defaultable: true,
    },
    TableOption {
        keywords: &["CHARACTER", "SET"],
        requires_eq: false,
        defaultable: true,
    },
    TableOption {
        keywords: &["COLLATE"],
        requires_eq: false,
        defaultable: true,
    },
    TableOption {
        keywords: &["AUTO_INCREMENT"],
        requires_eq: true,
        defaultable: false,
    },
];

/// MySQL column type names. A table option keyword followed by one of these
/// is a column called `charset` or `collate`, not an option.
pub static COLUMN_TYPES: &[&str] = &[
    "TINYINT", "SMALLINT", "MEDIUMINT", "INT", "INTEGER", "BIGINT", "DECIMAL", "DEC",
    "NUMERIC", "FLOAT", "DOUBLE", "REAL", "BIT", "BOOL", "BOOLEAN", "NUMBER", "DATE",
    "DATETIME", "TIMESTAMP", "TIME", "YEAR", "CHAR", "VARCHAR", "VARCHAR2", "NCHAR",
    "NVARCHAR", "TEXT", "TINYTEXT", "MEDIUMTEXT", "LONGTEXT", "BLOB", "TINYBLOB",
    "MEDIUMBLOB", "LONGBLOB", "CLOB", "BINARY", "VARBINARY", "ENUM", "SET", "JSON",
];

/// Look up a function rule by name.
pub fn find_function(rules: &'static [FunctionRule], name: &str) -> Option<&'static FunctionRule> {
    rules.iter().find(|r| r.name.eq_ignore_ascii_case(name))
}

/// Look up a schema token replacement.
pub fn find_token(word: &str) -> Option<&'static str> {
    SCHEMA_TOKENS
        .iter()
        .find(|r| r.word.eq_ignore_ascii_case(word))
        .map(|r| r.replacement)
}

/// Is `word` a column type name?
pub fn is_column_type(word: &str) -> bool {
    COLUMN_TYPES.iter().any(|t| t.eq_ignore_ascii_case(word))
}
