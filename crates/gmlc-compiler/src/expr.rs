//! Expression code generation and operand type tracking.

use gmlc_asm::{BranchKind, Comparison, DataType, Instruction, Opcode};
use gmlc_syntax::{BinaryOp, Call, Constant, Expr, ExprKind, LogicalOp, UnaryOp};

use crate::variable::Dup;
use crate::writer::Writer;

impl<'a> Writer<'a> {
    /// Pushes the value of `e`, leaving its type on the shadow stack.
    pub(crate) fn expr(&mut self, e: &Expr) {
        match &e.kind {
            ExprKind::Constant(c) => self.constant(c, e),
            ExprKind::Binary { first, rest } => {
                self.expr(first);
                for (op, operand) in rest {
                    self.convert_for(*op);
                    self.expr(operand);
                    self.convert_for(*op);
                    self.binary(*op);
                }
            }
            ExprKind::Logical { op, operands } => self.logical(*op, operands),
            ExprKind::Unary { op, operand } => {
                self.expr(operand);
                self.unary(*op, e);
            }
            ExprKind::Conditional { condition, then_value, else_value } => {
                let otherwise = self.code.new_label();
                let end = self.code.new_label();
                self.expr(condition);
                self.convert_top(DataType::Boolean);
                self.pop_type();
                self.code.branch(BranchKind::IfFalse, otherwise);

                self.expr(then_value);
                self.convert_top(DataType::Variable);
                self.pop_type();
                self.code.branch(BranchKind::Always, end);

                self.code.place(otherwise);
                self.expr(else_value);
                self.convert_top(DataType::Variable);
                self.pop_type();
                self.code.place(end);
                self.push_type(DataType::Variable);
            }
            ExprKind::Call(call) => self.call(call),
            ExprKind::SingleVariable(_) | ExprKind::VariableRef { .. } => {
                self.push_variable(e, Dup::None);
            }
            ExprKind::IncDec(inc) => self.inc_dec(inc, true, e.location),
        }
    }

    fn constant(&mut self, c: &Constant, e: &Expr) {
        let (instruction, t) = match c {
            Constant::Number { value, is_bool: true } => (Instruction::PushImmediate(*value as i32), DataType::Boolean),
            // Integral only when the value survives a round trip through i64.
            Constant::Number { value, .. } if (*value as i64) as f64 == *value => {
                let v = *value;
                if v >= f64::from(i16::MIN) && v <= f64::from(i16::MAX) {
                    (Instruction::PushImmediate(v as i32), DataType::Int32)
                } else if v >= f64::from(i32::MIN) && v <= f64::from(i32::MAX) {
                    (Instruction::PushInt(v as i32), DataType::Int32)
                } else {
                    (Instruction::PushLong(v as i64), DataType::Int64)
                }
            }
            Constant::Number { value, .. } => (Instruction::PushDouble(*value), DataType::Double),
            Constant::String(s) => (Instruction::PushString(s.clone()), DataType::String),
            Constant::Int64(v) => (Instruction::PushLong(*v), DataType::Int64),
            Constant::Absent => {
                self.error("Invalid constant type.", e.location);
                self.push_type(DataType::Variable);
                return;
            }
        };
        self.emit(instruction);
        self.push_type(t);
    }

    /// Converts the top operand to what `op` works on.
    fn convert_for(&mut self, op: BinaryOp) {
        use DataType::*;

        let t = self.peek_type();
        let to = match op {
            BinaryOp::Div if t != Double && t != Variable => Double,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::IntDiv | BinaryOp::Mod if t == Boolean => Int32,
            BinaryOp::Xor if t != Boolean => Boolean,
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor if t != Int32 => match t {
                Variable | Double => Int64,
                Int64 => return,
                _ => Int32,
            },
            BinaryOp::Shl | BinaryOp::Shr if t != Int64 => Int64,
            _ => return,
        };
        self.convert_top(to);
    }

    /// Combines the two top operands.
    fn binary(&mut self, op: BinaryOp) {
        let right = self.pop_type();
        let left = self.pop_type();
        let comparison = match op {
            BinaryOp::Eq => Some(Comparison::Eq),
            BinaryOp::Ne => Some(Comparison::Ne),
            BinaryOp::Lt => Some(Comparison::Lt),
            BinaryOp::Le => Some(Comparison::Le),
            BinaryOp::Gt => Some(Comparison::Gt),
            BinaryOp::Ge => Some(Comparison::Ge),
            _ => None,
        };
        if let Some(cmp) = comparison {
            self.emit(Instruction::Cmp(cmp, right, left));
            self.push_type(DataType::Boolean);
            return;
        }
        let opcode = match op {
            BinaryOp::Add => Opcode::Add,
            BinaryOp::Sub => Opcode::Sub,
            BinaryOp::Mul => Opcode::Mul,
            BinaryOp::Div => Opcode::Div,
            BinaryOp::IntDiv => Opcode::Rem,
            BinaryOp::Mod => Opcode::Mod,
            BinaryOp::BitAnd => Opcode::And,
            BinaryOp::BitOr => Opcode::Or,
            BinaryOp::Shl => Opcode::Shl,
            BinaryOp::Shr => Opcode::Shr,
            _ => Opcode::Xor,
        };
        self.emit(Instruction::Op(opcode, right, left));
        self.push_type(DataType::promote(right, left));
    }

    /// `&&` and `||` branch to a shared label as soon as the result is known.
    fn logical(&mut self, op: LogicalOp, operands: &[Expr]) {
        let Some((first, rest)) = operands.split_first() else {
            self.push_type(DataType::Variable);
            return;
        };
        let end = self.code.new_label();
        let short = self.code.new_label();
        let (jump, known) = match op {
            LogicalOp::And => (BranchKind::IfFalse, 0),
            LogicalOp::Or => (BranchKind::IfTrue, 1),
        };

        self.expr(first);
        for operand in rest {
            self.convert_top(DataType::Boolean);
            self.pop_type();
            self.code.branch(jump, short);
            self.expr(operand);
        }
        self.convert_top(DataType::Boolean);
        self.code.branch(BranchKind::Always, end);
        self.code.place(short);
        self.emit(Instruction::PushShort(known));
        self.code.place(end);
    }

    fn unary(&mut self, op: UnaryOp, e: &Expr) {
        use DataType::*;

        let t = self.peek_type();
        match op {
            UnaryOp::Not => {
                if t == String {
                    self.error("Cannot logically negate a string.", e.location);
                } else {
                    self.convert_top(Boolean);
                }
                self.emit(Instruction::Not(Boolean));
            }
            UnaryOp::BitNot => {
                let mut t = t;
                if t == String {
                    self.error("Cannot bitwise negate a string.", e.location);
                } else if matches!(t, Double | Float | Variable) {
                    self.convert_top(Int32);
                    t = Int32;
                }
                self.emit(Instruction::Not(t));
            }
            UnaryOp::Negate => {
                let mut t = t;
                if t == String {
                    self.error("Cannot negate a string.", e.location);
                } else if t == Boolean {
                    self.convert_top(Int32);
                    t = Int32;
                }
                self.emit(Instruction::Neg(t));
            }
            UnaryOp::Plus => {}
        }
    }

    /// Arguments go on the stack last to first, each as a variable.
    pub(crate) fn call(&mut self, call: &Call) {
        for arg in call.args.iter().rev() {
            self.expr(arg);
            self.convert_top(DataType::Variable);
            self.pop_type();
        }
        if self.symbols.function(&call.name).is_none() {
            if let Some(registrar) = self.registrar.as_deref_mut() {
                registrar.function(&call.name);
            }
        }
        self.emit(Instruction::Call { name: call.name.clone(), argc: call.args.len() });
        self.push_type(DataType::Variable);
    }

    /// `dup.v 0`, then for addressed slots move the copy under the address.
    pub(crate) fn keep_result(&mut self, single: bool, array: bool) {
        self.emit(Instruction::Dup(DataType::Variable, 0));
        if !single {
            self.emit(Instruction::PopSwap(if array { 6 } else { 5 }));
        }
    }
}
