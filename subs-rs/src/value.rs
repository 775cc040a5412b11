//! Runtime value type for substitution data and filter arguments.
//!
//! Every value is a string at heart: placeholders always substitute text.
//! Numbers and booleans exist so that data maps and filter literals can carry
//! them without pre-formatting, and so numeric filter arguments (`substr(1, 3)`)
//! coerce without a round-trip through strings.

use std::fmt;

/// A scalar value flowing through a filter chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Default for Value {
    fn default() -> Self {
        Value::Str(String::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => {
                // Integral floats print bare: `2.0` renders as `2`.
                if x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{}", *x as i64)
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl Value {
    /// Coerce to a string (clones for Str, formats for the other variants).
    pub fn as_str(&self) -> String {
        self.to_string()
    }

    /// Coerce to `i64`. Floats truncate toward zero; unparseable strings are 0.
    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            Value::Float(x) => x.trunc() as i64,
            Value::Bool(b) => i64::from(*b),
            Value::Str(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .or_else(|_| s.parse::<f64>().map(|x| x.trunc() as i64))
                    .unwrap_or(0)
            }
        }
    }

    /// `true` when the value renders as the empty string.
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Str(s) if s.is_empty())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
