//! Parsing of `key=value,key=value` argument lists.

use crate::error::{AuthorError, AuthorResult};
use lectio_delta::{ColumnMap, SqlValue};

/// Parse a comma-separated list of `key=value` pairs.
///
/// Values wrapped in double quotes may contain commas and are always text;
/// inside them `\"` and `\\` escape a quote and a backslash. Unquoted values
/// go through [`coerce_value`]. An empty or blank input yields an empty map.
pub fn parse_assignments(input: &str) -> AuthorResult<ColumnMap> {
    let mut columns = ColumnMap::new();
    if input.trim().is_empty() {
        return Ok(columns);
    }

    for item in split_top_level(input)? {
        let Some((key, raw)) = item.split_once('=') else {
            return Err(AuthorError::InvalidArgument(format!(
                "expected key=value, got {:?}",
                item.trim()
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(AuthorError::InvalidArgument(format!(
                "empty column name in {:?}",
                item.trim()
            )));
        }
        let value = parse_value(raw.trim())?;
        if columns.insert(key.to_string(), value).is_some() {
            return Err(AuthorError::InvalidArgument(format!(
                "column {key} given twice"
            )));
        }
    }
    Ok(columns)
}

/// Turn an unquoted argument into a value.
///
/// `null` becomes NULL. Numbers are recognized only in canonical form, so
/// `42`, `-3` and `2.5` become numbers while `007`, `+1`, `1e3`, `.5` and
/// `NaN` stay text.
pub fn coerce_value(raw: &str) -> SqlValue {
    if raw == "null" {
        return SqlValue::Null;
    }
    if let Ok(n) = raw.parse::<i64>() {
        if n.to_string() == raw {
            return SqlValue::Integer(n);
        }
    }
    if is_canonical_decimal(raw) {
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return SqlValue::Real(f);
            }
        }
    }
    SqlValue::Text(raw.to_string())
}

fn is_canonical_decimal(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let Some((int_part, frac_part)) = digits.split_once('.') else {
        return false;
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(int_part)
        && all_digits(frac_part)
        && (int_part == "0" || !int_part.starts_with('0'))
}

fn parse_value(raw: &str) -> AuthorResult<SqlValue> {
    let Some(quoted) = raw.strip_prefix('"') else {
        return Ok(coerce_value(raw));
    };
    let mut text = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped @ ('"' | '\\')) => text.push(escaped),
                Some(other) => {
                    text.push('\\');
                    text.push(other);
                }
                None => break,
            },
            '"' => {
                let rest = chars.as_str().trim();
                if !rest.is_empty() {
                    return Err(AuthorError::InvalidArgument(format!(
                        "unexpected text after closing quote: {rest:?}"
                    )));
                }
                return Ok(SqlValue::Text(text));
            }
            c => text.push(c),
        }
    }
    Err(AuthorError::InvalidArgument(format!(
        "unterminated quote in {raw:?}"
    )))
}

/// Split on commas that are not inside double quotes.
fn split_top_level(input: &str) -> AuthorResult<Vec<&str>> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                items.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_quotes {
        return Err(AuthorError::InvalidArgument(format!(
            "unterminated quote in {input:?}"
        )));
    }
    items.push(&input[start..]);
    Ok(items)
}
