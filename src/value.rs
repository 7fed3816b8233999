//! Scalar coercion and the `NOSPACE` collation.
//!
//! Raw values read out of the relational store or out of the XML codec are
//! plain strings; callers want typed scalars back. [`coerce`] applies a
//! fixed precedence (int, then float, then bool, then a structured literal,
//! falling back to the original string) so the same text always coerces to
//! the same kind of value.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{EngineError, Result};

static BLANK_OR_CONTROL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*$|[\x00-\x08\x0b\x0c\x0e-\x1f]").unwrap());

/// A coerced scalar. `List`/`Map` cover the structured-literal case; most
/// stored properties coerce to `Int`, `Float`, `Bool`, or `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub fn as_str_lossy(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Bool(v) => v.to_string(),
            Value::Text(v) => v.clone(),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::as_str_lossy).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Map(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.as_str_lossy(), v.as_str_lossy()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
        }
    }

    /// The value as an `i64`, for callers that know the kind already (id
    /// columns coerced out of bulk-ingest records). Fails rather than
    /// silently truncating a float or parsing text.
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(EngineError::NameError {
                name: other.as_str_lossy(),
                context: "expected an integer value".to_string(),
            }),
        }
    }
}

/// Coerce raw text into a typed scalar.
///
/// Precedence: `None` passes through; whole-string integer; whole-string
/// float; the literal set `true|TRUE|false|FALSE`; a brace-delimited
/// comma-separated `key: value` dict literal; a bracketed comma-separated
/// list literal; otherwise the original string.
pub fn coerce(value: Option<&str>) -> Value {
    let Some(raw) = value else {
        return Value::Null;
    };
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Float(f);
    }
    match raw {
        "true" | "TRUE" => return Value::Bool(true),
        "false" | "FALSE" => return Value::Bool(false),
        _ => {}
    }
    if let Some(map) = parse_literal_map(raw) {
        return Value::Map(map);
    }
    if let Some(list) = parse_literal_list(raw) {
        return Value::List(list);
    }
    Value::Text(raw.to_string())
}

/// Parse a `[a, b, c]` style literal into a list of coerced scalars. Returns
/// `None` for anything that isn't a well-formed bracketed list; this is
/// intentionally conservative rather than a general expression parser.
fn parse_literal_list(raw: &str) -> Option<Vec<Value>> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .or_else(|| trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')))?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    Some(
        inner
            .split(',')
            .map(|part| coerce(Some(part.trim())))
            .collect(),
    )
}

/// Parse a `{a: 1, b: 2}` style literal into coerced key/value pairs. Returns
/// `None` for anything that isn't a well-formed brace-delimited literal with
/// `key: value` entries; as with [`parse_literal_list`] this is deliberately
/// conservative rather than a general expression parser.
fn parse_literal_map(raw: &str) -> Option<Vec<(Value, Value)>> {
    let trimmed = raw.trim();
    let inner = trimmed.strip_prefix('{').and_then(|s| s.strip_suffix('}'))?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    inner
        .split(',')
        .map(|part| {
            let (key, value) = part.split_once(':')?;
            Some((coerce(Some(key.trim())), coerce(Some(value.trim()))))
        })
        .collect()
}

/// Reject names that are blank or carry control characters, the two
/// malformations a caller-supplied catalog name can't recover from.
pub fn validate_string(name: &str) -> Result<()> {
    if BLANK_OR_CONTROL.is_match(name) {
        return Err(EngineError::NameError {
            name: name.to_string(),
            context: "names must be non-blank and free of control characters".to_string(),
        });
    }
    Ok(())
}

/// Compare two strings ignoring interior whitespace. Registered with the
/// storage driver as the `NOSPACE` collation so catalog lookups can match
/// names that differ only in spacing.
pub fn no_space_collation(a: &str, b: &str) -> Ordering {
    let stripped_a: String = a.chars().filter(|c| !c.is_whitespace()).collect();
    let stripped_b: String = b.chars().filter(|c| !c.is_whitespace()).collect();
    stripped_a.cmp(&stripped_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_integers() {
        assert_eq!(coerce(Some("42")), Value::Int(42));
        assert_eq!(coerce(Some("-7")), Value::Int(-7));
    }

    #[test]
    fn coerces_floats() {
        assert_eq!(coerce(Some("3.14")), Value::Float(3.14));
    }

    #[test]
    fn coerces_bools() {
        assert_eq!(coerce(Some("true")), Value::Bool(true));
        assert_eq!(coerce(Some("FALSE")), Value::Bool(false));
    }

    #[test]
    fn coerces_lists() {
        assert_eq!(
            coerce(Some("[1, 2, 3]")),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn coerces_dicts() {
        assert_eq!(
            coerce(Some("{a: 1, b: 2}")),
            Value::Map(vec![
                (Value::Text("a".into()), Value::Int(1)),
                (Value::Text("b".into()), Value::Int(2)),
            ])
        );
    }

    #[test]
    fn falls_back_to_text() {
        assert_eq!(coerce(Some("Max Capacity")), Value::Text("Max Capacity".into()));
    }

    #[test]
    fn none_is_null() {
        assert_eq!(coerce(None), Value::Null);
    }

    #[test]
    fn no_space_collation_ignores_interior_whitespace() {
        assert_eq!(no_space_collation("Max Capacity", "MaxCapacity"), Ordering::Equal);
        assert_eq!(no_space_collation("Max Capacity", "Min Capacity"), "MaxCapacity".cmp("MinCapacity"));
    }

    #[test]
    fn validate_string_rejects_blank_and_control_characters() {
        assert!(validate_string("Gen1").is_ok());
        assert!(validate_string("   ").is_err());
        assert!(validate_string("Gen\u{0007}1").is_err());
    }
}
