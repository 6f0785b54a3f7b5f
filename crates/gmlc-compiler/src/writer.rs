//! Statement code generation.
//!
//! A [`Writer`] lives for exactly one compile. It owns the instruction
//! buffer, the compile-time shadow of the evaluation stack, the stack of
//! enclosing loops, switches and withs, and the diagnostics raised while
//! writing. Nothing survives between two writers.

use indexmap::IndexSet;
use tracing::debug;

use gmlc_asm::{Assembly, BranchKind, Comparison, DataType, Instruction, LocalVar, Opcode, PushKind, VarRef};
use gmlc_syntax::{
    AssignOp, BinaryOp, Constant, Declaration, Diagnostic, Expr, Location, Registrar, Scope, Stmt,
    StmtKind, SymbolTable, Variable,
};

use crate::builder::{CodeWriter, Jump, LabelId};
use crate::context::{ContextKind, Contexts};
use crate::variable::Dup;

/// Local holding a return value while enclosing constructs are unwound.
pub const RETURN_TEMP: &str = "$$$$temp$$$$";

/// What [`Writer::write`] produced.
#[derive(Debug, Clone)]
pub struct Written {
    pub assembly: Assembly,
    pub diagnostics: Vec<Diagnostic>,
    /// Declared locals in slot order.
    pub locals: Vec<String>,
}

pub struct Writer<'a> {
    pub(crate) symbols: &'a dyn SymbolTable,
    pub(crate) registrar: Option<&'a mut dyn Registrar>,
    pub(crate) code: CodeWriter,
    pub(crate) types: Vec<DataType>,
    contexts: Contexts,
    pub(crate) locals: IndexSet<String>,
    pub(crate) globals: IndexSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Writer<'a> {
    pub fn new(symbols: &'a dyn SymbolTable) -> Self {
        Self {
            symbols,
            registrar: None,
            code: CodeWriter::new(),
            types: Vec::new(),
            contexts: Contexts::default(),
            locals: IndexSet::new(),
            globals: IndexSet::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Names declared with `var` and `globalvar` anywhere in the script.
    pub fn with_declarations(mut self, locals: IndexSet<String>, globals: IndexSet<String>) -> Self {
        self.locals = locals;
        self.globals = globals;
        self
    }

    pub fn with_registrar(mut self, registrar: &'a mut dyn Registrar) -> Self {
        self.registrar = Some(registrar);
        self
    }

    pub fn write(mut self, root: &Stmt) -> Written {
        self.stmt(root);

        let mut locals = Vec::with_capacity(self.locals.len());
        for (i, name) in self.locals.iter().enumerate() {
            let slot = i + 1;
            let id = self.registrar.as_deref_mut().and_then(|r| r.local(name)).unwrap_or(slot as u32);
            locals.push(LocalVar { slot, name: name.clone(), id });
        }
        let assembly = self.code.finish(locals);
        debug!(
            lines = assembly.lines.len(),
            locals = assembly.locals.len(),
            diagnostics = self.diagnostics.len(),
            "wrote assembly"
        );
        Written { assembly, diagnostics: self.diagnostics, locals: self.locals.into_iter().collect() }
    }

    /// Records a diagnostic and leaves a comment at the current position.
    pub(crate) fn error(&mut self, message: &str, location: Option<Location>) {
        self.code.comment(message);
        self.diagnostics.push(Diagnostic::semantic(message, location));
    }

    pub(crate) fn emit(&mut self, i: Instruction) {
        self.code.emit(i);
    }

    pub(crate) fn push_type(&mut self, t: DataType) {
        self.types.push(t);
    }

    /// Malformed code can leave the shadow stack short; it then reads as
    /// a variable.
    pub(crate) fn pop_type(&mut self) -> DataType {
        self.types.pop().unwrap_or(DataType::Variable)
    }

    pub(crate) fn peek_type(&self) -> DataType {
        self.types.last().copied().unwrap_or(DataType::Variable)
    }

    /// Converts the top of the stack to `to` unless it already is.
    pub(crate) fn convert_top(&mut self, to: DataType) {
        let from = self.pop_type();
        if from != to {
            self.emit(Instruction::Conv(from, to));
        }
        self.push_type(to);
    }

    /// Evaluates `e` and consumes it as a branch condition.
    fn condition(&mut self, e: &Expr) {
        self.expr(e);
        self.convert_top(DataType::Boolean);
        self.pop_type();
    }

    pub(crate) fn stmt(&mut self, s: &Stmt) {
        match &s.kind {
            StmtKind::Discard => {}
            StmtKind::Block(body) => {
                for stmt in body {
                    self.stmt(stmt);
                }
            }
            StmtKind::Assign { target, op, value } => self.assign(target, *op, value),
            StmtKind::LocalVars(decls) => self.declarations(decls, Scope::Local),
            StmtKind::GlobalVars(decls) => self.declarations(decls, Scope::Global),
            StmtKind::If { condition, then_branch, else_branch } => {
                let end = self.code.new_label();
                let otherwise = else_branch.as_ref().map(|_| self.code.new_label());
                self.condition(condition);
                self.code.branch(BranchKind::IfFalse, otherwise.unwrap_or(end));
                self.stmt(then_branch);
                if let (Some(else_branch), Some(label)) = (else_branch, otherwise) {
                    self.code.branch(BranchKind::Always, end);
                    self.code.place(label);
                    self.stmt(else_branch);
                }
                self.code.place(end);
            }
            StmtKind::While { condition, body } => {
                let start = self.code.new_label();
                let end = self.code.new_label();
                self.code.place(start);
                self.condition(condition);
                self.code.branch(BranchKind::IfFalse, end);
                self.loop_body(body, end, Some(start));
                self.code.branch(BranchKind::Always, start);
                self.code.place(end);
            }
            StmtKind::For { init, condition, step, body } => {
                self.stmt(init);
                let start = self.code.new_label();
                let end = self.code.new_label();
                let next = self.code.new_label();
                self.code.place(start);
                self.condition(condition);
                self.code.branch(BranchKind::IfFalse, end);
                if self.loop_body(body, end, Some(next)) {
                    self.code.place(next);
                }
                self.stmt(step);
                self.code.branch(BranchKind::Always, start);
                self.code.place(end);
            }
            StmtKind::Repeat { count, body } => self.repeat(count, body),
            StmtKind::DoUntil { body, condition } => {
                let start = self.code.new_label();
                let end = self.code.new_label();
                let next = self.code.new_label();
                self.code.place(start);
                self.loop_body(body, end, Some(next));
                self.code.place(next);
                self.condition(condition);
                self.code.branch(BranchKind::IfFalse, start);
                self.code.place(end);
            }
            StmtKind::Switch { value, body } => self.switch(value, body),
            StmtKind::Case(_) | StmtKind::Default => {
                self.error("Case and default labels must appear directly inside a switch statement.", s.location)
            }
            StmtKind::With { target, body } => self.with(target, body),
            StmtKind::Break => match self.contexts.break_target() {
                Some(label) => self.code.branch(BranchKind::Always, label),
                None => self.error("Break statement placed outside of any loops.", s.location),
            },
            StmtKind::Continue => match self.contexts.continue_target() {
                Some(label) => self.code.branch(BranchKind::Always, label),
                None => self.error("Continue statement placed outside of any loops.", s.location),
            },
            StmtKind::Exit | StmtKind::Return(None) => self.exit(),
            StmtKind::Return(Some(value)) => self.return_value(value),
            StmtKind::Call(call) => {
                self.call(call);
                let t = self.pop_type();
                self.emit(Instruction::PopZ(t));
            }
            StmtKind::IncDec(inc) => self.inc_dec(inc, false, s.location),
        }
    }

    /// Writes a loop body with its break and continue targets, returning
    /// whether `continue` was used.
    fn loop_body(&mut self, body: &Stmt, end: LabelId, next: Option<LabelId>) -> bool {
        self.contexts.push(ContextKind::Loop, end, next);
        self.stmt(body);
        self.contexts.pop().is_some_and(|ctx| ctx.continue_used)
    }

    fn declarations(&mut self, decls: &[Declaration], scope: Scope) {
        for decl in decls {
            match scope {
                Scope::Local => self.locals.insert(decl.name.clone()),
                _ => self.globals.insert(decl.name.clone()),
            };
            if let Some(value) = &decl.value {
                self.expr(value);
                let t = self.pop_type();
                let mut var = Variable::new(decl.name.clone(), decl.location);
                var.scope = Some(scope);
                self.store(&Expr::variable(var), t, false);
            }
        }
    }

    fn assign(&mut self, target: &Expr, op: AssignOp, value: &Expr) {
        let Some(binary) = op.binary() else {
            self.expr(value);
            let t = self.pop_type();
            self.store(target, t, false);
            return;
        };

        let shape = self.push_variable(target, Dup::Short);
        self.pop_type();
        self.expr(value);
        let mut t = self.pop_type();
        let bitwise = binary.is_bitwise();
        if (bitwise && !t.is_integer()) || (!bitwise && t == DataType::Boolean) {
            self.emit(Instruction::Conv(t, DataType::Int32));
            t = DataType::Int32;
        }
        let opcode = match binary {
            BinaryOp::Sub => Opcode::Sub,
            BinaryOp::Mul => Opcode::Mul,
            BinaryOp::Div => Opcode::Div,
            BinaryOp::Mod => Opcode::Mod,
            BinaryOp::BitAnd => Opcode::And,
            BinaryOp::BitOr => Opcode::Or,
            BinaryOp::BitXor => Opcode::Xor,
            _ => Opcode::Add,
        };
        self.emit(Instruction::Op(opcode, t, DataType::Variable));
        self.store(target, DataType::Variable, !shape.single);
    }

    /// `repeat` keeps its counter on the stack for the whole loop.
    fn repeat(&mut self, count: &Expr, body: &Stmt) {
        self.expr(count);
        self.convert_top(DataType::Int32);
        self.pop_type();

        let end = self.code.new_label();
        let next = self.code.new_label();
        let start = self.code.new_label();
        self.emit(Instruction::Dup(DataType::Int32, 0));
        self.emit(Instruction::PushInt(0));
        self.emit(Instruction::Cmp(Comparison::Le, DataType::Int32, DataType::Int32));
        self.code.branch(BranchKind::IfTrue, end);

        self.code.place(start);
        self.loop_body(body, end, Some(next));
        self.code.place(next);
        self.emit(Instruction::PushInt(1));
        self.emit(Instruction::Op(Opcode::Sub, DataType::Int32, DataType::Int32));
        self.emit(Instruction::Dup(DataType::Int32, 0));
        self.emit(Instruction::Conv(DataType::Int32, DataType::Boolean));
        self.code.branch(BranchKind::IfTrue, start);
        self.code.place(end);
        self.emit(Instruction::PopZ(DataType::Int32));
    }

    fn switch(&mut self, value: &Expr, body: &[Stmt]) {
        let end = self.code.new_label();
        let continue_end = self.contexts.can_continue().then(|| self.code.new_label());

        self.expr(value);
        let held = self.pop_type();
        self.contexts.push(ContextKind::Switch(held), end, continue_end);

        // Comparisons first, in source order; bodies follow.
        let mut sections: Vec<(LabelId, Vec<&Stmt>)> = Vec::new();
        let mut default = None;
        let mut seen: Vec<(&Constant, Option<Location>)> = Vec::new();
        for stmt in body {
            match &stmt.kind {
                StmtKind::Case(case) => {
                    if let Some(constant) = case.as_constant() {
                        match seen.iter().find(|(c, _)| same_case(c, constant)) {
                            Some((_, first)) => {
                                let first = *first;
                                self.error("Found duplicate case statement.", stmt.location);
                                self.error("First occurrence:", first);
                            }
                            None => seen.push((constant, stmt.location)),
                        }
                    }
                    let label = self.code.new_label();
                    self.emit(Instruction::Dup(held, 0));
                    self.expr(case);
                    let t = self.pop_type();
                    self.emit(Instruction::Cmp(Comparison::Eq, t, held));
                    self.code.branch(BranchKind::IfTrue, label);
                    sections.push((label, Vec::new()));
                }
                StmtKind::Default => {
                    let label = self.code.new_label();
                    default = Some(label);
                    sections.push((label, Vec::new()));
                }
                _ => match sections.last_mut() {
                    Some((_, stmts)) => stmts.push(stmt),
                    None => self.error("Statements in switch statement must be after case or default.", stmt.location),
                },
            }
        }
        if let Some(label) = default {
            self.code.branch(BranchKind::Always, label);
        }
        self.code.branch(BranchKind::Always, end);

        for (label, stmts) in sections {
            self.code.place(label);
            for stmt in stmts {
                self.stmt(stmt);
            }
        }

        let ctx = self.contexts.pop();
        if let (Some(label), true) = (continue_end, ctx.is_some_and(|c| c.continue_used)) {
            self.code.branch(BranchKind::Always, end);
            self.code.place(label);
            self.emit(Instruction::PopZ(held));
            if let Some(outer) = self.contexts.continue_target() {
                self.code.branch(BranchKind::Always, outer);
            }
        }
        self.code.place(end);
        self.emit(Instruction::PopZ(held));
    }

    fn with(&mut self, target: &Expr, body: &Stmt) {
        let end = self.code.new_label();
        let start = self.code.new_label();
        let pop_env = self.code.new_label();

        self.expr(target);
        self.convert_top(DataType::Int32);
        self.pop_type();

        self.contexts.push(ContextKind::With, end, Some(pop_env));
        self.code.jump(Jump::PushEnv, pop_env);
        self.code.place(start);
        self.stmt(body);
        let broke = self.contexts.pop().is_some_and(|c| c.break_used);

        self.code.place(pop_env);
        self.code.jump(Jump::PopEnv, start);
        if broke {
            let done = self.code.new_label();
            self.code.branch(BranchKind::Always, done);
            self.code.place(end);
            self.emit(Instruction::PopEnvDrop);
            self.code.place(done);
        } else {
            self.code.place(end);
        }
    }

    /// `exit` pops every held switch value, then drops every open environment.
    fn exit(&mut self) {
        let held: Vec<ContextKind> = self.contexts.held().collect();
        for kind in &held {
            if let ContextKind::Switch(t) = kind {
                self.emit(Instruction::PopZ(*t));
            }
        }
        for kind in &held {
            if *kind == ContextKind::With {
                self.emit(Instruction::PopEnvDrop);
            }
        }
        self.emit(Instruction::Exit(DataType::Int32));
    }

    fn return_value(&mut self, value: &Expr) {
        self.expr(value);
        self.convert_top(DataType::Variable);
        self.pop_type();

        let held: Vec<ContextKind> = self.contexts.held().collect();
        if !held.is_empty() {
            self.locals.insert(RETURN_TEMP.to_string());
            let temp = VarRef::Scoped(Scope::Local, RETURN_TEMP.to_string());
            self.emit(Instruction::Pop { slot: DataType::Variable, value: DataType::Variable, target: temp.clone() });
            for kind in held {
                match kind {
                    ContextKind::Switch(t) => self.emit(Instruction::PopZ(t)),
                    ContextKind::With => self.emit(Instruction::PopEnvDrop),
                    ContextKind::Loop => {}
                }
            }
            self.emit(Instruction::PushVar(PushKind::Plain, temp));
        }
        self.emit(Instruction::Ret(DataType::Variable));
    }
}

/// Case values compare by value: numbers numerically, strings exactly.
fn same_case(a: &Constant, b: &Constant) -> bool {
    match (a, b) {
        (Constant::String(x), Constant::String(y)) => x == y,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}
