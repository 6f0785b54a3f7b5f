//! Optional hook notified about user symbols during code generation.

use crate::scope::Scope;

/// Receives the user variables and functions a compile touches.
///
/// Tools that compile against a loaded game database use this to create
/// missing entries. A compile without a registrar behaves identically.
pub trait Registrar {
    fn variable(&mut self, name: &str, scope: Scope, array: bool);
    fn function(&mut self, name: &str);
    /// Id for a declared local. `None` lets the writer number locals itself.
    fn local(&mut self, _name: &str) -> Option<u32> {
        None
    }
}

/// A registrar that records each symbol once, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolLog {
    pub variables: Vec<(String, Scope, bool)>,
    pub functions: Vec<String>,
    pub locals: Vec<String>,
}

impl Registrar for SymbolLog {
    fn variable(&mut self, name: &str, scope: Scope, array: bool) {
        if !self.variables.iter().any(|(n, s, _)| n == name && *s == scope) {
            self.variables.push((name.to_string(), scope, array));
        }
    }

    fn function(&mut self, name: &str) {
        if !self.functions.iter().any(|n| n == name) {
            self.functions.push(name.to_string());
        }
    }

    fn local(&mut self, name: &str) -> Option<u32> {
        if !self.locals.iter().any(|n| n == name) {
            self.locals.push(name.to_string());
        }
        None
    }
}
