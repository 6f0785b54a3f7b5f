//! Compiler diagnostics.
//!
//! Diagnostics are data, not errors: every stage keeps collecting them and
//! carries on, so one compile reports as many problems as it can find. A
//! compile with any diagnostic is unsuccessful.
//!
//! ```rust
//! use gmlc_syntax::{Diagnostic, Location};
//!
//! let d = Diagnostic::semantic("Division by zero.", Some(Location::new(3, 9)));
//! assert_eq!(d.to_string(), "Division by zero. Around line 3, column 9.");
//! ```

use std::fmt;

use serde::Serialize;

use crate::token::Location;

/// How a diagnostic affected the pass that reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A structural error. The parser resynchronized at the next statement.
    Syntax,
    /// Recorded without disturbing the surrounding construct.
    Semantic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub location: Option<Location>,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn syntax(message: impl Into<String>, location: Option<Location>) -> Self {
        Self { message: message.into(), location, kind: DiagnosticKind::Syntax }
    }

    pub fn semantic(message: impl Into<String>, location: Option<Location>) -> Self {
        Self { message: message.into(), location, kind: DiagnosticKind::Semantic }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(f, "{} Around line {}, column {}.", self.message, loc.line, loc.column),
            None => f.write_str(&self.message),
        }
    }
}
