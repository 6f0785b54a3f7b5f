//! Instruction set of the target assembly dialect.

use std::fmt;

use gmlc_syntax::Scope;

use crate::types::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    /// Integer division, GML `div`.
    Rem,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl Opcode {
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Rem => "rem",
            Opcode::Mod => "mod",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Shl => "shl",
            Opcode::Shr => "shr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Comparison::Lt => "LT",
            Comparison::Le => "LTE",
            Comparison::Eq => "EQ",
            Comparison::Ne => "NEQ",
            Comparison::Ge => "GTE",
            Comparison::Gt => "GT",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    Always,
    IfTrue,
    IfFalse,
}

impl BranchKind {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BranchKind::Always => "b",
            BranchKind::IfTrue => "bt",
            BranchKind::IfFalse => "bf",
        }
    }
}

/// Which push instruction reads a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushKind {
    /// `push.v`
    Plain,
    /// `pushloc.v`
    Local,
    /// `pushglb.v`
    Global,
    /// `pushvar.v`, used for builtin globals.
    Builtin,
}

/// Operand naming a variable slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarRef {
    /// `self.x`, `global.x`, `5.x`
    Scoped(Scope, String),
    /// `[array]x`: instance and index are on the stack.
    Array(String),
    /// `[stacktop]x`: instance is on the stack.
    StackTop(String),
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarRef::Scoped(scope, name) => write!(f, "{}{}", scope.prefix(), name),
            VarRef::Array(name) => write!(f, "[array]{}", name),
            VarRef::StackTop(name) => write!(f, "[stacktop]{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // Constants
    PushInt(i32),
    PushLong(i64),
    PushDouble(f64),
    PushString(String),
    /// `push.e n`
    PushShort(i16),
    /// `pushi.e n`
    PushImmediate(i32),

    // Variables
    PushVar(PushKind, VarRef),
    /// `pop.<slot>.<value> target`; slot is `i` when the address was
    /// duplicated earlier and `v` otherwise.
    Pop { slot: DataType, value: DataType, target: VarRef },
    /// `pop.e.v n`: moves the top value below the `n`-slot address.
    PopSwap(u8),

    // Stack
    PopZ(DataType),
    Dup(DataType, u8),
    Conv(DataType, DataType),

    // Arithmetic, typed `<right>.<left>`
    Op(Opcode, DataType, DataType),
    Cmp(Comparison, DataType, DataType),
    Not(DataType),
    Neg(DataType),

    // Control flow
    Branch(BranchKind, String),
    PushEnv(String),
    PopEnv(String),
    /// `popenv [drop]`
    PopEnvDrop,
    Call { name: String, argc: usize },
    Ret(DataType),
    Exit(DataType),
    /// `break.e n`
    Break(i16),
}

impl Instruction {
    /// Label this instruction jumps to, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Instruction::Branch(_, t) | Instruction::PushEnv(t) | Instruction::PopEnv(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match self {
            PushInt(n) => write!(f, "push.i {}", n),
            PushLong(n) => write!(f, "push.l {}", n),
            PushDouble(x) => write!(f, "push.d {}", format_double(*x)),
            PushString(s) => write!(f, "push.s \"{}\"", escape(s)),
            PushShort(n) => write!(f, "push.e {}", n),
            PushImmediate(n) => write!(f, "pushi.e {}", n),
            PushVar(kind, var) => {
                let op = match kind {
                    PushKind::Plain => "push",
                    PushKind::Local => "pushloc",
                    PushKind::Global => "pushglb",
                    PushKind::Builtin => "pushvar",
                };
                write!(f, "{}.v {}", op, var)
            }
            Pop { slot, value, target } => write!(f, "pop.{}.{} {}", slot, value, target),
            PopSwap(n) => write!(f, "pop.e.v {}", n),
            PopZ(t) => write!(f, "popz.{}", t),
            Dup(t, n) => write!(f, "dup.{} {}", t, n),
            Conv(from, to) => write!(f, "conv.{}.{}", from, to),
            Op(op, right, left) => write!(f, "{}.{}.{}", op.name(), right, left),
            Cmp(cmp, right, left) => write!(f, "cmp.{}.{} {}", right, left, cmp),
            Not(t) => write!(f, "not.{}", t),
            Neg(t) => write!(f, "neg.{}", t),
            Branch(kind, target) => write!(f, "{} {}", kind.mnemonic(), target),
            PushEnv(target) => write!(f, "pushenv {}", target),
            PopEnv(target) => write!(f, "popenv {}", target),
            PopEnvDrop => f.write_str("popenv [drop]"),
            Call { name, argc } => write!(f, "call.i {}(argc={})", name, argc),
            Ret(t) => write!(f, "ret.{}", t),
            Exit(t) => write!(f, "exit.{}", t),
            Break(n) => write!(f, "break.e {}", n),
        }
    }
}

/// Shortest round-trip digits. Magnitudes under 1E-04 or from 1E+15 up use
/// `E` notation with a signed exponent of at least two digits.
fn format_double(x: f64) -> String {
    if x == 0.0 || !x.is_finite() {
        return x.to_string();
    }
    let sci = format!("{:e}", x);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return x.to_string();
    };
    match exp.parse::<i32>() {
        Ok(exp) if !(-4..15).contains(&exp) => {
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}E{}{:02}", mantissa, sign, exp.abs())
        }
        _ => x.to_string(),
    }
}

/// Escapes a string literal for `push.s`.
fn escape(s: &str) -> String {
    s.replace('\r', "\\r").replace('\n', "\\n").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_typed_instructions() {
        let cases = [
            (Instruction::Op(Opcode::Add, DataType::Int32, DataType::Variable), "add.i.v"),
            (Instruction::Cmp(Comparison::Le, DataType::Int32, DataType::Int32), "cmp.i.i LTE"),
            (Instruction::Conv(DataType::Variable, DataType::Boolean), "conv.v.b"),
            (Instruction::Dup(DataType::Int32, 1), "dup.i 1"),
            (Instruction::PushImmediate(-1), "pushi.e -1"),
            (Instruction::Break(-1), "break.e -1"),
            (Instruction::Call { name: "draw_text".into(), argc: 3 }, "call.i draw_text(argc=3)"),
            (Instruction::PopEnvDrop, "popenv [drop]"),
        ];
        for (instruction, text) in cases {
            assert_eq!(instruction.to_string(), text);
        }
    }

    #[test]
    fn renders_variable_operands() {
        let pop = Instruction::Pop {
            slot: DataType::Variable,
            value: DataType::Int32,
            target: VarRef::Scoped(Scope::Local, "i".into()),
        };
        assert_eq!(pop.to_string(), "pop.v.i local.i");
        let push = Instruction::PushVar(PushKind::Builtin, VarRef::Scoped(Scope::Own, "room".into()));
        assert_eq!(push.to_string(), "pushvar.v self.room");
        let array = Instruction::PushVar(PushKind::Plain, VarRef::Array("a".into()));
        assert_eq!(array.to_string(), "push.v [array]a");
        let chain = Instruction::Pop { slot: DataType::Int32, value: DataType::Variable, target: VarRef::StackTop("b".into()) };
        assert_eq!(chain.to_string(), "pop.i.v [stacktop]b");
    }

    #[test]
    fn doubles_switch_to_exponent_notation_at_the_extremes() {
        let cases = [
            (2.5, "push.d 2.5"),
            (0.0001, "push.d 0.0001"),
            (0.00001, "push.d 1E-05"),
            (1.5e-7, "push.d 1.5E-07"),
            (123456789012.5, "push.d 123456789012.5"),
            (1e300, "push.d 1E+300"),
            (-2.5e20, "push.d -2.5E+20"),
        ];
        for (x, text) in cases {
            assert_eq!(Instruction::PushDouble(x).to_string(), text);
        }
    }

    #[test]
    fn escapes_string_literals() {
        let push = Instruction::PushString("say \"hi\"\r\n".into());
        assert_eq!(push.to_string(), r#"push.s "say \"hi\"\r\n""#);
    }
}
