//! Event payloads and their text form.
//!
//! Payloads are opaque to the server; the only thing done with them is
//! rendering to text, which follows the JavaScript `${value}` rules so a
//! JS client sees the string it would expect.

use std::fmt;

use serde_json::{Number, Value};

/// First argument of an event, or `Undefined` when the sender sent none.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Undefined,
    Value(Value),
}

impl Payload {
    /// Take the first argument of an event's argument list.
    pub fn from_args(args: Vec<Value>) -> Self {
        args.into_iter()
            .next()
            .map(Self::Value)
            .unwrap_or(Self::Undefined)
    }

    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Value(v) => f.write_str(&value_to_text(v)),
        }
    }
}

/// Render a JSON value the way JavaScript string conversion does.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_text(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                // Array.prototype.join renders null as empty
                Value::Null => String::new(),
                other => value_to_text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".into(),
    }
}

/// Integers JavaScript can hold without rounding.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

fn number_to_text(n: &Number) -> String {
    let exact = match (n.as_i64(), n.as_u64()) {
        (Some(i), _) => i.unsigned_abs() <= MAX_SAFE_INTEGER,
        (None, Some(u)) => u <= MAX_SAFE_INTEGER,
        _ => false,
    };
    if exact {
        return n.to_string();
    }
    let f = n.as_f64().unwrap_or_default();
    if f == 0.0 {
        // covers -0
        return "0".into();
    }
    let abs = f.abs();
    if (1e-6..1e21).contains(&abs) {
        // shortest round-trip digits, zero padded, no exponent
        f.to_string()
    } else {
        exponent_form(f)
    }
}

/// `1e21` → `1e+21`, `1.5e-7` stays as is.
fn exponent_form(f: f64) -> String {
    let raw = format!("{f:e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => raw,
    }
}
