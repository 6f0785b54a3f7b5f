//! Instance scopes a variable can be resolved to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a variable lives at runtime.
///
/// The numeric encoding matches the target machine: the named scopes are
/// small negative ids and any non-negative id names a specific instance or
/// object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// `self`, the executing instance.
    Own,
    Other,
    All,
    Noone,
    Global,
    Builtin,
    Local,
    /// An explicit instance or object id, as in `5.x`.
    Instance(i32),
}

impl Scope {
    pub fn id(self) -> i32 {
        match self {
            Scope::Own => -1,
            Scope::Other => -2,
            Scope::All => -3,
            Scope::Noone => -4,
            Scope::Global => -5,
            Scope::Builtin => -6,
            Scope::Local => -7,
            Scope::Instance(id) => id,
        }
    }

    pub fn from_id(id: i32) -> Self {
        match id {
            -1 => Scope::Own,
            -2 => Scope::Other,
            -3 => Scope::All,
            -4 => Scope::Noone,
            -5 => Scope::Global,
            -6 => Scope::Builtin,
            -7 => Scope::Local,
            other => Scope::Instance(other),
        }
    }

    /// Prefix used in instruction operands, e.g. `self.` or `5.`.
    pub fn prefix(self) -> String {
        match self {
            Scope::Own => "self.".to_string(),
            Scope::Other => "other.".to_string(),
            Scope::Global => "global.".to_string(),
            Scope::Local => "local.".to_string(),
            other => format!("{}.", other.id()),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Own => f.write_str("self"),
            Scope::Other => f.write_str("other"),
            Scope::All => f.write_str("all"),
            Scope::Noone => f.write_str("noone"),
            Scope::Global => f.write_str("global"),
            Scope::Builtin => f.write_str("builtin"),
            Scope::Local => f.write_str("local"),
            Scope::Instance(id) => write!(f, "{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_scopes_round_trip_through_ids() {
        for scope in [Scope::Own, Scope::Other, Scope::Global, Scope::Local, Scope::Instance(100)] {
            assert_eq!(Scope::from_id(scope.id()), scope);
        }
    }

    #[test]
    fn prefixes() {
        assert_eq!(Scope::Own.prefix(), "self.");
        assert_eq!(Scope::All.prefix(), "-3.");
        assert_eq!(Scope::Instance(7).prefix(), "7.");
    }
}
