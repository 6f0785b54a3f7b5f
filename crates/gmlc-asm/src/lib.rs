//! Typed stack-machine assembly for the gmlc compiler.
//!
//! This crate defines the instruction set emitted by the code writer, the
//! operand types that select each instruction variant, and the finished
//! [`Assembly`] container with its textual rendering.

pub mod instruction;
pub mod program;
pub mod types;

pub use instruction::{BranchKind, Comparison, Instruction, Opcode, PushKind, VarRef};
pub use program::{Assembly, Line, LocalVar, FUNC_END};
pub use types::DataType;
