//! Variable reads, stores and in-place updates.
//!
//! A variable operand is one of three shapes: a single unindexed name
//! resolved to a scope, a single array element addressed by scope id and
//! index, or a chain whose head expression yields the instance. Compound
//! assignment and `++`/`--` read the slot with its address duplicated so
//! the store can reuse it without evaluating the index twice.

use gmlc_asm::{DataType, Instruction, Opcode, PushKind, VarRef};
use gmlc_syntax::{Constant, Expr, ExprKind, IncDec, Index, Location, Scope, Variable, VariableKind};

use crate::writer::Writer;

/// How a read leaves the slot address for a later store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dup {
    None,
    /// Compound assignment.
    Short,
    /// Increment and decrement.
    Long,
}

/// The addressing a variable operand used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Shape {
    /// A single unindexed name; nothing was left on the stack to address it.
    pub single: bool,
    /// The final segment is an array element.
    pub array: bool,
}

impl Shape {
    const SINGLE: Shape = Shape { single: true, array: false };
}

impl<'a> Writer<'a> {
    /// An explicit scope wins; otherwise declarations decide, then `self`.
    pub(crate) fn resolve_scope(&self, var: &Variable) -> Scope {
        match var.scope {
            Some(scope) => scope,
            None if self.locals.contains(&var.name) => Scope::Local,
            None if self.globals.contains(&var.name) => Scope::Global,
            None => Scope::Own,
        }
    }

    /// Tells the registrar about a user variable outside the local scope.
    fn notify_variable(&mut self, var: &Variable, scope: Scope) {
        if scope == Scope::Local || self.symbols.variable(&var.name).is_some() {
            return;
        }
        let array = var.index.is_some();
        if let Some(registrar) = self.registrar.as_deref_mut() {
            registrar.variable(&var.name, scope, array);
        }
    }

    /// Pushes the value of a variable operand. Always leaves a variable on
    /// the shadow stack.
    pub(crate) fn push_variable(&mut self, e: &Expr, dup: Dup) -> Shape {
        let shape = match &e.kind {
            ExprKind::SingleVariable(var) => self.push_single(var, dup),
            ExprKind::VariableRef { head, path } => self.push_chain(head, path, dup),
            _ => {
                self.expr(e);
                self.pop_type();
                Shape::SINGLE
            }
        };
        self.push_type(DataType::Variable);
        shape
    }

    fn push_single(&mut self, var: &Variable, dup: Dup) -> Shape {
        let scope = self.resolve_scope(var);
        self.notify_variable(var, scope);

        let Some(index) = &var.index else {
            let kind = match scope {
                Scope::Own if self.is_builtin_global(&var.name) => PushKind::Builtin,
                Scope::Global => PushKind::Global,
                Scope::Local => PushKind::Local,
                _ => PushKind::Plain,
            };
            self.emit(Instruction::PushVar(kind, VarRef::Scoped(scope, var.name.clone())));
            return Shape::SINGLE;
        };
        if !self.check_accessor(index, var.location) {
            self.emit(Instruction::PushShort(0));
            return Shape::SINGLE;
        }

        self.emit(Instruction::PushImmediate(scope.id()));
        self.array_index(index);
        self.dup_array(dup);
        self.emit(Instruction::PushVar(PushKind::Plain, VarRef::Array(var.name.clone())));
        Shape { single: false, array: true }
    }

    fn push_chain(&mut self, head: &Expr, path: &[Variable], dup: Dup) -> Shape {
        self.expr(head);
        self.convert_top(DataType::Int32);
        self.pop_type();

        let mut array = false;
        for (i, segment) in path.iter().enumerate() {
            let last = i + 1 == path.len();
            array = false;
            match &segment.index {
                Some(index) if self.check_accessor(index, segment.location) => {
                    self.array_index(index);
                    if last {
                        self.dup_array(dup);
                    }
                    self.emit(Instruction::PushVar(PushKind::Plain, VarRef::Array(segment.name.clone())));
                    array = true;
                }
                _ => {
                    if last && dup != Dup::None {
                        self.emit(Instruction::Dup(DataType::Int32, 0));
                    }
                    self.emit(Instruction::PushVar(PushKind::Plain, VarRef::StackTop(segment.name.clone())));
                }
            }
            if !last {
                self.emit(Instruction::Conv(DataType::Variable, DataType::Int32));
            }
        }
        Shape { single: false, array }
    }

    fn dup_array(&mut self, dup: Dup) {
        match dup {
            Dup::None => {}
            Dup::Short => self.emit(Instruction::Dup(DataType::Int32, 1)),
            Dup::Long => self.emit(Instruction::Dup(DataType::Int64, 0)),
        }
    }

    fn is_builtin_global(&self, name: &str) -> bool {
        self.symbols.variable(name).is_some_and(|info| info.kind == VariableKind::Global)
    }

    /// Data-structure accessors must have been lowered to calls by now.
    fn check_accessor(&mut self, index: &Index, location: Option<Location>) -> bool {
        if index.accessor.is_array_like() {
            return true;
        }
        self.error("Accessor was not rewritten before code generation.", location);
        false
    }

    /// Pushes an array index as one Int32, flattening two dimensions.
    pub(crate) fn array_index(&mut self, index: &Index) {
        let mut dims = index.dims.iter();
        if let Some(first) = dims.next() {
            self.index_dim(first);
        }
        if let Some(second) = dims.next() {
            self.emit(Instruction::Break(-1));
            self.emit(Instruction::PushInt(32000));
            self.emit(Instruction::Op(Opcode::Mul, DataType::Int32, DataType::Int32));
            self.index_dim(second);
            self.emit(Instruction::Break(-1));
            self.emit(Instruction::Op(Opcode::Add, DataType::Int32, DataType::Int32));
        }
        if let Some(extra) = dims.next() {
            self.error("Arrays have at most two dimensions.", extra.location);
        }
    }

    fn index_dim(&mut self, dim: &Expr) {
        let negative = match dim.as_constant() {
            Some(Constant::Number { value, .. }) => *value < 0.0,
            Some(Constant::Int64(value)) => *value < 0,
            _ => false,
        };
        if negative {
            self.error("Array index should not be negative.", dim.location);
        }
        self.expr(dim);
        self.convert_top(DataType::Int32);
        self.pop_type();
    }

    /// Stores the value on top of the stack, of type `value`, into `target`.
    /// A `duplicated` target already has its address on the stack.
    pub(crate) fn store(&mut self, target: &Expr, value: DataType, duplicated: bool) {
        let slot = if duplicated { DataType::Int32 } else { DataType::Variable };
        match &target.kind {
            ExprKind::SingleVariable(var) => {
                let scope = self.resolve_scope(var);
                self.notify_variable(var, scope);
                let target = match &var.index {
                    None => VarRef::Scoped(scope, var.name.clone()),
                    Some(index) => {
                        if !self.check_accessor(index, var.location) {
                            self.emit(Instruction::PopZ(value));
                            return;
                        }
                        if !duplicated {
                            self.emit(Instruction::PushImmediate(scope.id()));
                            self.array_index(index);
                        }
                        VarRef::Array(var.name.clone())
                    }
                };
                self.emit(Instruction::Pop { slot, value, target });
            }
            ExprKind::VariableRef { head, path } => {
                let Some((last, init)) = path.split_last() else {
                    self.error("Malformed variable store.", target.location);
                    self.emit(Instruction::PopZ(value));
                    return;
                };
                if !duplicated {
                    self.expr(head);
                    self.convert_top(DataType::Int32);
                    self.pop_type();
                    for segment in init {
                        match &segment.index {
                            Some(index) if self.check_accessor(index, segment.location) => {
                                self.array_index(index);
                                self.emit(Instruction::PushVar(PushKind::Plain, VarRef::Array(segment.name.clone())));
                            }
                            _ => {
                                self.emit(Instruction::PushVar(PushKind::Plain, VarRef::StackTop(segment.name.clone())));
                            }
                        }
                        self.emit(Instruction::Conv(DataType::Variable, DataType::Int32));
                    }
                }
                let target = match &last.index {
                    Some(index) if index.accessor.is_array_like() => {
                        if !duplicated {
                            self.array_index(index);
                        }
                        VarRef::Array(last.name.clone())
                    }
                    Some(_) => {
                        self.error("Accessor was not rewritten before code generation.", last.location);
                        self.emit(Instruction::PopZ(value));
                        return;
                    }
                    None => VarRef::StackTop(last.name.clone()),
                };
                self.emit(Instruction::Pop { slot, value, target });
            }
            _ => {
                self.error("Malformed variable store.", target.location);
                self.emit(Instruction::PopZ(value));
            }
        }
    }

    /// `++`/`--`. As an expression the old (postfix) or new (prefix) value
    /// stays on the stack.
    pub(crate) fn inc_dec(&mut self, inc: &IncDec, as_expression: bool, location: Option<Location>) {
        if as_expression && accessor_target(&inc.target) {
            self.error("Cannot increment a data structure accessor inside an expression.", location);
            self.emit(Instruction::PushShort(0));
            self.push_type(DataType::Variable);
            return;
        }

        let shape = self.push_variable(&inc.target, Dup::Long);
        let t = self.pop_type();
        if as_expression && inc.postfix {
            self.keep_result(shape.single, shape.array);
        }
        self.emit(Instruction::PushShort(1));
        let op = if inc.increment { Opcode::Add } else { Opcode::Sub };
        self.emit(Instruction::Op(op, DataType::Int32, t));
        if as_expression && !inc.postfix {
            self.keep_result(shape.single, shape.array);
        }
        self.store(&inc.target, DataType::Variable, !shape.single);
        if as_expression {
            self.push_type(DataType::Variable);
        }
    }
}

/// The final segment of `target` indexes a data structure.
fn accessor_target(target: &Expr) -> bool {
    let last = match &target.kind {
        ExprKind::SingleVariable(var) => Some(var),
        ExprKind::VariableRef { path, .. } => path.last(),
        _ => None,
    };
    last.and_then(|v| v.index.as_ref()).is_some_and(|i| !i.accessor.is_array_like())
}
