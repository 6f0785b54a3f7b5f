pub mod ast;
pub mod builtins;
pub mod constant;
pub mod diagnostic;
pub mod error;
pub mod notation;
pub mod registrar;
pub mod scope;
pub mod token;

pub use ast::*;
pub use builtins::{AccessorInfo, BuiltinTable, FunctionInfo, SymbolTable, VariableInfo, VariableKind};
pub use constant::Constant;
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use error::{Error, Result};
pub use registrar::{Registrar, SymbolLog};
pub use scope::Scope;
pub use token::*;
