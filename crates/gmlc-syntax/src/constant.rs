//! Compile-time constant values.

use std::fmt;

/// A constant attached to a literal token or a folded expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// No usable value. Only produced by malformed input.
    Absent,
    /// A double. `is_bool` marks results of comparisons, which are emitted
    /// as boolean pushes.
    Number { value: f64, is_bool: bool },
    String(String),
    Int64(i64),
}

impl Constant {
    pub fn number(value: f64) -> Self {
        Constant::Number { value, is_bool: false }
    }

    pub fn boolean(value: bool) -> Self {
        Constant::Number { value: if value { 1.0 } else { 0.0 }, is_bool: true }
    }

    /// Numeric view of Number and Int64 constants.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Constant::Number { value, .. } => Some(*value),
            Constant::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::String(s) => Some(s),
            _ => None,
        }
    }

    /// GML truthiness: numbers at or above 0.5 are true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Constant::Number { value, .. } => *value >= 0.5,
            Constant::Int64(v) => *v >= 1,
            _ => false,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Absent => f.write_str("<absent>"),
            Constant::Number { value, .. } => write!(f, "{}", value),
            Constant::String(s) => write!(f, "{:?}", s),
            Constant::Int64(v) => write!(f, "{}", v),
        }
    }
}
