//! Value and identifier normalization
//!
//! Editor input is loosely typed (strings, booleans, numbers, blanks). The
//! functions here turn it into the canonical forms the planner compares and the
//! DDL builder interpolates. Nothing in this module touches the database.

use crate::error::{MigrationError, Result};
use regex::Regex;
use std::sync::LazyLock;

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").expect("identifier regex")
});

static NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("numeric regex"));

/// A single-quoted literal, optionally followed by `::type` casts as the
/// catalog reports defaults (`'open'::character varying`).
static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^'(?:[^']|'')*'(?:::[A-Za-z_"][A-Za-z0-9_ ."]*(?:\(\d+(?:,\s*\d+)?\))?(?:\[\])*)*$"#)
        .expect("quoted literal regex")
});

static FUNCTION_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*\($").expect("function name regex"));

static CAST_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:::[A-Za-z_][A-Za-z0-9_ ]*)?$").expect("cast suffix regex")
});

/// `CHECK` as a keyword, not the start of a column name like `checked`.
static CHECK_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^check[\s(]").expect("check keyword regex"));

static TYPE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z_][A-Za-z0-9_ ]*(?:\(\s*\d+\s*(?:,\s*\d+\s*)?\))?[A-Za-z ]*(?:\[\])*$",
    )
    .expect("type name regex")
});

const DATETIME_KEYWORDS: &[&str] = &[
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "LOCALTIME",
    "LOCALTIMESTAMP",
];

/// A normalized editor value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

/// Normalize a raw editor value.
///
/// `null` and blank strings become [`Value::Null`]; `true/t/1` and `false/f/0`
/// (case-insensitive) become booleans; numbers pass through; any other string
/// is trimmed.
pub fn normalize_value(raw: &serde_json::Value) -> Value {
    match raw {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.clone()),
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Value::Null;
            }
            match trimmed.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Value::Bool(true),
                "false" | "f" | "0" => Value::Bool(false),
                _ => Value::Text(trimmed.to_string()),
            }
        }
        other => Value::Text(other.to_string().trim().to_string()),
    }
}

/// Format a raw default value as SQL literal text, or `None` for "no default".
pub fn format_default_literal(raw: &serde_json::Value) -> Option<String> {
    match raw {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(true) => Some("TRUE".to_string()),
        serde_json::Value::Bool(false) => Some("FALSE".to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) => format_default_text(s),
        other => Some(quote_literal(&other.to_string())),
    }
}

/// [`format_default_literal`] for text input.
///
/// Passes through `NULL`, boolean keywords, numerics, already-quoted literals,
/// date/time keywords and function calls; quotes everything else.
pub fn format_default_text(raw: &str) -> Option<String> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    let upper = text.to_ascii_uppercase();
    if upper == "NULL" || upper == "TRUE" || upper == "FALSE" {
        return Some(upper);
    }
    if DATETIME_KEYWORDS.contains(&upper.as_str()) {
        return Some(upper);
    }
    if QUOTED_RE.is_match(text) || NUMERIC_RE.is_match(text) || is_function_call(text) {
        return Some(text.to_string());
    }
    // The catalog reports negative numeric defaults as `(-1)`.
    if strip_outer_parens(text).is_some_and(|inner| NUMERIC_RE.is_match(inner)) {
        return Some(text.to_string());
    }
    Some(quote_literal(text))
}

/// Whether `text` is exactly one call, `name(args)` with an optional `::type`.
///
/// Arguments must balance outside quotes, and `;` may not appear at all.
fn is_function_call(text: &str) -> bool {
    if text.contains(';') {
        return false;
    }
    let Some(open) = text.find('(') else {
        return false;
    };
    if !FUNCTION_NAME_RE.is_match(&text[..=open]) {
        return false;
    }
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in text[open..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return CAST_SUFFIX_RE.is_match(&text[open + i + 1..]);
                }
            }
            (None, _) => {}
        }
    }
    false
}

/// Comparison form of a default: the formatted literal with casts stripped
/// from quoted literals and quoted numerics unquoted. `NULL` is no default.
pub fn canonical_default(raw: Option<&str>) -> Option<String> {
    let formatted = format_default_text(raw?).filter(|f| f != "NULL")?;
    if let Some(literal) = leading_literal(&formatted) {
        let inner = &literal[1..literal.len() - 1];
        if NUMERIC_RE.is_match(inner) {
            return Some(inner.to_string());
        }
        return Some(literal.to_string());
    }
    let unwrapped = formatted
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .filter(|s| NUMERIC_RE.is_match(s));
    Some(unwrapped.map(str::to_string).unwrap_or(formatted))
}

/// The unquoted text of a literal default (`'open'::text` -> `open`), if the
/// default is a plain quoted literal.
pub fn literal_text(default: &str) -> Option<String> {
    let literal = leading_literal(default.trim())?;
    Some(literal[1..literal.len() - 1].replace("''", "'"))
}

/// The `'...'` prefix of a quoted literal, including both quotes.
fn leading_literal(text: &str) -> Option<&str> {
    if !text.starts_with('\'') || !QUOTED_RE.is_match(text) {
        return None;
    }
    let bytes = text.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(&text[..=i]);
        }
        i += 1;
    }
    None
}

/// A check predicate as written, without a leading `CHECK` keyword or
/// redundant outer parentheses. This is the text put into DDL.
pub fn check_predicate(raw: &str) -> Option<String> {
    let mut text = raw.trim();
    if CHECK_KEYWORD_RE.is_match(text) {
        text = text[5..].trim_start();
    }
    while let Some(inner) = strip_outer_parens(text) {
        text = inner.trim();
    }
    (!text.is_empty()).then(|| text.to_string())
}

/// Comparison form of a check predicate.
///
/// [`check_predicate`] with whitespace collapsed, so `CHECK ((age > 0))` and
/// `age  > 0` compare equal.
pub fn normalize_check(raw: &str) -> Option<String> {
    let predicate = check_predicate(raw)?;
    Some(predicate.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn strip_outer_parens(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    // `(a) AND (b)` starts and ends with parens but they do not wrap the whole text.
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

/// Check that `name` can be interpolated into DDL as an identifier.
///
/// Accepts `name` or `schema.name`, each part `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_identifier(name: &str) -> Result<&str> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(name)
    } else {
        Err(MigrationError::InvalidIdentifier(name.to_string()))
    }
}

/// Check a raw type name (`bigint`, `character varying(20)`, `numeric(10, 2)[]`).
pub fn validate_type_name(name: &str) -> Result<&str> {
    if TYPE_NAME_RE.is_match(name.trim()) {
        Ok(name.trim())
    } else {
        Err(MigrationError::invalid(format!("invalid type name {name:?}")))
    }
}

/// Double-quote an identifier, quoting each dot-separated part.
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Single-quote a string literal, doubling inner quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// The last part of a possibly schema-qualified name.
pub fn unqualified(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Parse catalog boolean text (`true`, `t`, `1`, ...).
pub fn parse_bool(text: Option<&str>) -> bool {
    matches!(
        text.map(|t| normalize_value(&serde_json::Value::String(t.to_string()))),
        Some(Value::Bool(true))
    )
}
