//! String literal escaping and value typing

use std::str::FromStr;

use records_core::FieldValue;
use rust_decimal::Decimal;

/// How the stored procedures inline a value: numbers unquoted, strings quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Number,
    String,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Number => "NUMBER",
            ValueType::String => "STRING",
        }
    }
}

/// Strip NUL bytes, double quotes and backslashes.
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        match ch {
            '\0' => {}
            '\'' => escaped.push_str("''"),
            '\\' => escaped.push_str("\\\\"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Escape-string literal (`E'...'`), so doubled backslashes read back as one.
pub fn quote_literal(value: &str) -> String {
    format!("E'{}'", escape_literal(value))
}

/// Escape `%`, `_` and `\` so user text matches literally inside a `LIKE`
/// pattern (backslash is the default escape character).
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub fn infer_type(value: &FieldValue) -> ValueType {
    match value {
        FieldValue::Int(_) | FieldValue::Decimal(_) | FieldValue::Bool(_) => ValueType::Number,
        _ => ValueType::String,
    }
}

/// Whether a value may be declared `Number` without becoming an injection vector.
pub(crate) fn is_numeric(value: &FieldValue) -> bool {
    match value {
        FieldValue::Null | FieldValue::Int(_) | FieldValue::Decimal(_) | FieldValue::Bool(_) => true,
        FieldValue::Text(s) => Decimal::from_str(s.trim()).is_ok(),
        _ => false,
    }
}

/// SQL text for a value inside a `ROW(...)`: `NULL` or a quoted literal.
pub(crate) fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => "NULL".to_string(),
        other => quote_literal(&other.to_string()),
    }
}
