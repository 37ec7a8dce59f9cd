//! Formats document values as YAML-like text for reports. Scalars and
//! containers print in flow style through `Display`; [`to_text`] renders a
//! whole subtree in block style.

use std::fmt;

use itertools::Itertools as _;

use super::Value;

/// Formats a string as a plain scalar when that is unambiguous, quoting it
/// otherwise.
pub fn scalar_string(s: &str) -> String {
    let ambiguous = s.is_empty()
        || s.starts_with([' ', '-', '?', '!', '&', '*', '#', '|', '>', '%', '@', '`', '\'', '"'])
        || s.ends_with(' ')
        || s.contains([':', '#', '{', '}', '[', ']', ',', '\n', '\t'])
        || matches!(s, "null" | "~" | "true" | "false")
        || s.parse::<f64>().is_ok();
    if ambiguous {
        format!("{:?}", s)
    } else {
        s.to_string()
    }
}

// Keeps integral floats distinguishable from integers
fn float(text: String) -> String {
    if text.contains(['.', 'e', 'i', 'N']) {
        text
    } else {
        text + ".0"
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "{}", scalar_string(s)),
            Value::Binary(bytes) => write!(
                f,
                "!!binary {}",
                bytes.iter().map(|b| format!("{:02x}", b)).join("")
            ),
            Value::Array(items) => write!(f, "[{}]", items.iter().join(", ")),
            Value::Hash(hash) => write!(
                f,
                "{{{}}}",
                hash.iter()
                    .map(|(k, v)| format!("{}: {}", scalar_string(k), v))
                    .join(", ")
            ),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I32(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", float(v.to_string())),
            Value::U32(v) => write!(f, "!u {:#x}", v),
            Value::I64(v) => write!(f, "!l {}", v),
            Value::U64(v) => write!(f, "!ul {}", v),
            Value::F64(v) => write!(f, "!f64 {}", float(v.to_string())),
        }
    }
}

/// Renders a value as block-style YAML, one scalar per line.
pub fn to_text(value: &Value) -> String {
    let mut out = String::new();
    block(value, 0, &mut out);
    out
}

fn is_nested(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Hash(hash) => !hash.is_empty(),
        _ => false,
    }
}

fn block(value: &Value, indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    let entry = |lead: String, child: &Value, out: &mut String| {
        out.push_str(&pad);
        out.push_str(&lead);
        if is_nested(child) {
            out.push('\n');
            block(child, indent + 2, out);
        } else {
            out.push(' ');
            out.push_str(&child.to_string());
            out.push('\n');
        }
    };

    match value {
        Value::Hash(hash) if !hash.is_empty() => {
            for (key, child) in hash {
                entry(format!("{}:", scalar_string(key)), child, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for child in items {
                entry("-".to_string(), child, out);
            }
        }
        scalar => {
            out.push_str(&pad);
            out.push_str(&scalar.to_string());
            out.push('\n');
        }
    }
}
