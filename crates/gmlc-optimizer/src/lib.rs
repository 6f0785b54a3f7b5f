//! Tree-to-tree simplification between parsing and code generation.
//!
//! The [`Optimizer`] never mutates its input. It folds constant operators
//! and pure conversion calls, removes dead `if` branches and self
//! assignments, and rewrites data-structure accessors into the runtime
//! functions the symbol table names for them. Problems found along the way
//! (division by a constant zero, a bad `real()` argument) are collected as
//! semantic diagnostics.

mod accessor;
mod calls;
mod fold;

use tracing::debug;

use gmlc_syntax::{
    Constant, Declaration, Diagnostic, Expr, ExprKind, IncDec, Location, Stmt, StmtKind, SymbolTable,
};

use crate::accessor::Target;

pub struct Optimizer<'a> {
    symbols: &'a dyn SymbolTable,
    diagnostics: Vec<Diagnostic>,
    /// Off when only accessor rewriting is wanted.
    pub(crate) fold: bool,
}

/// Optimizes a whole tree, returning it with any diagnostics raised.
pub fn optimize(root: &Stmt, symbols: &dyn SymbolTable) -> (Stmt, Vec<Diagnostic>) {
    let mut optimizer = Optimizer::new(symbols);
    let root = optimizer.optimize(root);
    debug!(diagnostics = optimizer.diagnostics.len(), "optimized tree");
    (root, optimizer.into_diagnostics())
}

/// Rewrites accessors without folding or removing anything.
///
/// Code generation needs accessors lowered to calls even when optimization
/// is turned off.
pub fn desugar(root: &Stmt, symbols: &dyn SymbolTable) -> (Stmt, Vec<Diagnostic>) {
    let mut optimizer = Optimizer::desugar_only(symbols);
    let root = optimizer.optimize(root);
    (root, optimizer.into_diagnostics())
}

impl<'a> Optimizer<'a> {
    pub fn new(symbols: &'a dyn SymbolTable) -> Self {
        Self { symbols, diagnostics: Vec::new(), fold: true }
    }

    pub fn desugar_only(symbols: &'a dyn SymbolTable) -> Self {
        Self { fold: false, ..Self::new(symbols) }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub(crate) fn report(&mut self, message: &str, location: Option<Location>) {
        self.diagnostics.push(Diagnostic::semantic(message, location));
    }

    pub fn optimize(&mut self, stmt: &Stmt) -> Stmt {
        let location = stmt.location;
        let kind = match &stmt.kind {
            StmtKind::Block(body) => StmtKind::Block(body.iter().map(|s| self.optimize(s)).collect()),
            StmtKind::Assign { target, op, value } => {
                let value = self.optimize_expr(value);
                return match self.split_target(target) {
                    Target::Accessor { container, info, dims } => {
                        self.accessor_store(container, info, dims, *op, value, location)
                    }
                    Target::Plain(target) if self.fold && op.binary().is_none() && same_variable(&target, &value) => {
                        Stmt::discard(location)
                    }
                    Target::Plain(target) => Stmt::new(StmtKind::Assign { target, op: *op, value }, location),
                };
            }
            StmtKind::LocalVars(decls) => StmtKind::LocalVars(self.optimize_declarations(decls)),
            StmtKind::GlobalVars(decls) => StmtKind::GlobalVars(self.optimize_declarations(decls)),
            StmtKind::If { condition, then_branch, else_branch } => {
                let condition = self.optimize_expr(condition);
                let then_branch = self.optimize(then_branch);
                let else_branch = else_branch.as_deref().map(|s| self.optimize(s));
                if let Some(Constant::Number { value, .. }) = condition.as_constant().filter(|_| self.fold) {
                    if *value <= 0.5 {
                        return else_branch.unwrap_or_else(|| Stmt::discard(location));
                    }
                }
                StmtKind::If {
                    condition,
                    then_branch: Box::new(then_branch),
                    else_branch: else_branch.map(Box::new),
                }
            }
            StmtKind::While { condition, body } => StmtKind::While {
                condition: self.optimize_expr(condition),
                body: Box::new(self.optimize(body)),
            },
            StmtKind::DoUntil { body, condition } => StmtKind::DoUntil {
                body: Box::new(self.optimize(body)),
                condition: self.optimize_expr(condition),
            },
            StmtKind::Repeat { count, body } => StmtKind::Repeat {
                count: self.optimize_expr(count),
                body: Box::new(self.optimize(body)),
            },
            StmtKind::For { init, condition, step, body } => StmtKind::For {
                init: Box::new(self.optimize(init)),
                condition: self.optimize_expr(condition),
                step: Box::new(self.optimize(step)),
                body: Box::new(self.optimize(body)),
            },
            StmtKind::Switch { value, body } => StmtKind::Switch {
                value: self.optimize_expr(value),
                body: body.iter().map(|s| self.optimize(s)).collect(),
            },
            StmtKind::Case(value) => {
                let value = self.optimize_expr(value);
                if self.fold && !matches!(value.kind, ExprKind::Constant(_)) && !value.is_variable() {
                    self.report("Case argument must be constant.", location);
                }
                StmtKind::Case(value)
            }
            StmtKind::With { target, body } => StmtKind::With {
                target: self.optimize_expr(target),
                body: Box::new(self.optimize(body)),
            },
            StmtKind::Return(value) => StmtKind::Return(value.as_ref().map(|v| self.optimize_expr(v))),
            StmtKind::Call(call) => {
                let mut call = call.clone();
                call.args = call.args.iter().map(|a| self.optimize_expr(a)).collect();
                StmtKind::Call(call)
            }
            StmtKind::IncDec(inc) => {
                return match self.split_target(&inc.target) {
                    Target::Accessor { container, info, dims } => {
                        self.accessor_step(container, info, dims, inc.increment, location)
                    }
                    Target::Plain(target) => Stmt::new(StmtKind::IncDec(IncDec { target, ..inc.clone() }), location),
                };
            }
            StmtKind::Default | StmtKind::Break | StmtKind::Continue | StmtKind::Exit | StmtKind::Discard => {
                stmt.kind.clone()
            }
        };
        Stmt::new(kind, location)
    }

    fn optimize_declarations(&mut self, decls: &[Declaration]) -> Vec<Declaration> {
        decls
            .iter()
            .map(|d| Declaration { value: d.value.as_ref().map(|v| self.optimize_expr(v)), ..d.clone() })
            .collect()
    }

    pub fn optimize_expr(&mut self, expr: &Expr) -> Expr {
        let location = expr.location;
        match &expr.kind {
            ExprKind::Constant(_) => expr.clone(),
            ExprKind::Binary { first, rest } => {
                let first = self.optimize_expr(first);
                let rest = rest.iter().map(|(op, e)| (*op, self.optimize_expr(e))).collect();
                self.fold_binary(first, rest, location)
            }
            ExprKind::Logical { op, operands } => {
                let operands = operands.iter().map(|e| self.optimize_expr(e)).collect();
                self.fold_logical(*op, operands, location)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.optimize_expr(operand);
                self.fold_unary(*op, operand, location)
            }
            ExprKind::Conditional { condition, then_value, else_value } => Expr::new(
                ExprKind::Conditional {
                    condition: Box::new(self.optimize_expr(condition)),
                    then_value: Box::new(self.optimize_expr(then_value)),
                    else_value: Box::new(self.optimize_expr(else_value)),
                },
                location,
            ),
            ExprKind::Call(call) => {
                let mut call = call.clone();
                call.args = call.args.iter().map(|a| self.optimize_expr(a)).collect();
                self.fold_call(call, location)
            }
            ExprKind::SingleVariable(var) => self.read_variable(var),
            ExprKind::VariableRef { head, path } => self.read_chain(head, path, location),
            ExprKind::IncDec(inc) => {
                let target = self.keep_target(&inc.target);
                Expr::new(ExprKind::IncDec(Box::new(IncDec { target, ..(**inc).clone() })), location)
            }
        }
    }
}

/// `a = a` on the same unindexed variable.
fn same_variable(target: &Expr, value: &Expr) -> bool {
    match (&target.kind, &value.kind) {
        (ExprKind::SingleVariable(a), ExprKind::SingleVariable(b)) => {
            a.index.is_none() && b.index.is_none() && a.name == b.name && a.scope == b.scope
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmlc_syntax::*;

    fn num(value: f64) -> Expr {
        Expr::constant(Constant::number(value), None)
    }

    fn int(value: i64) -> Expr {
        Expr::constant(Constant::Int64(value), None)
    }

    fn string(value: &str) -> Expr {
        Expr::constant(Constant::String(value.to_string()), None)
    }

    fn var(name: &str) -> Expr {
        Expr::variable(Variable::new(name, None))
    }

    fn indexed(name: &str, accessor: Accessor, dims: Vec<Expr>) -> Expr {
        let mut v = Variable::new(name, None);
        v.index = Some(Index { accessor, dims });
        Expr::variable(v)
    }

    fn binary(first: Expr, rest: Vec<(BinaryOp, Expr)>) -> Expr {
        Expr::new(ExprKind::Binary { first: Box::new(first), rest }, None)
    }

    fn call(name: &str, args: Vec<Expr>) -> Expr {
        Expr::call(name, args, None)
    }

    fn assign(target: Expr, op: AssignOp, value: Expr) -> Stmt {
        Stmt::new(StmtKind::Assign { target, op, value }, None)
    }

    fn fold(expr: Expr) -> (Expr, Vec<String>) {
        let table = BuiltinTable::standard();
        let mut optimizer = Optimizer::new(&table);
        let out = optimizer.optimize_expr(&expr);
        (out, optimizer.into_diagnostics().into_iter().map(|d| d.message).collect())
    }

    fn folded(expr: Expr) -> Constant {
        let (out, errors) = fold(expr);
        assert!(errors.is_empty(), "unexpected diagnostics: {:?}", errors);
        out.as_constant().cloned().expect("Expected a constant")
    }

    fn run(stmt: Stmt) -> (Stmt, Vec<String>) {
        let (out, diagnostics) = optimize(&stmt, &BuiltinTable::standard());
        (out, diagnostics.into_iter().map(|d| d.message).collect())
    }

    #[test]
    fn test_arithmetic_folding() {
        assert_eq!(folded(binary(num(1.0), vec![(BinaryOp::Add, num(2.0)), (BinaryOp::Mul, num(3.0))])), Constant::number(9.0));
        assert_eq!(folded(binary(num(2.0), vec![(BinaryOp::Add, int(3))])), Constant::Int64(5));
        assert_eq!(folded(binary(num(7.0), vec![(BinaryOp::IntDiv, num(2.0))])), Constant::number(3.0));
        assert_eq!(folded(binary(num(7.0), vec![(BinaryOp::Mod, num(4.0))])), Constant::number(3.0));
        assert_eq!(folded(binary(int(7), vec![(BinaryOp::Div, num(2.0))])), Constant::Int64(3));
        assert_eq!(folded(binary(num(1.0), vec![(BinaryOp::Shl, num(4.0))])), Constant::Int64(16));
        assert_eq!(folded(binary(num(6.0), vec![(BinaryOp::BitAnd, num(3.0))])), Constant::Int64(2));
        assert_eq!(folded(binary(num(1.0), vec![(BinaryOp::Xor, num(1.0))])), Constant::Int64(0));
    }

    #[test]
    fn test_folding_stops_at_variables() {
        let (out, _) = fold(binary(num(1.0), vec![(BinaryOp::Sub, num(2.0)), (BinaryOp::Add, var("a"))]));
        if let ExprKind::Binary { first, rest } = out.kind {
            assert_eq!(first.as_constant(), Some(&Constant::number(-1.0)));
            assert_eq!(rest.len(), 1);
            assert_eq!(rest[0].0, BinaryOp::Add);
        } else {
            panic!("Expected Binary");
        }
    }

    #[test]
    fn test_strings_and_comparisons() {
        assert_eq!(folded(binary(string("a"), vec![(BinaryOp::Add, string("b"))])), Constant::String("ab".into()));
        assert_eq!(folded(binary(num(3.0), vec![(BinaryOp::Mul, string("ab"))])), Constant::String("ababab".into()));
        assert_eq!(folded(binary(num(1.0), vec![(BinaryOp::Lt, num(2.0))])), Constant::boolean(true));
        assert_eq!(folded(binary(string("b"), vec![(BinaryOp::Eq, string("a"))])), Constant::boolean(false));
        assert_eq!(folded(binary(int(3), vec![(BinaryOp::Ge, num(3.0))])), Constant::boolean(true));
    }

    #[test]
    fn test_huge_string_repetition_stays_unfolded() {
        let (out, errors) = fold(binary(num(1e7), vec![(BinaryOp::Mul, string(&"x".repeat(1024)))]));
        assert!(errors.is_empty());
        if let ExprKind::Binary { first, rest } = out.kind {
            assert_eq!(first.as_constant(), Some(&Constant::number(1e7)));
            assert_eq!(rest.len(), 1);
            assert_eq!(rest[0].0, BinaryOp::Mul);
        } else {
            panic!("Expected Binary");
        }

        let (out, _) = fold(binary(num(f64::MAX), vec![(BinaryOp::Mul, string("ab"))]));
        assert!(out.as_constant().is_none());
    }

    #[test]
    fn test_zero_divisors_are_reported() {
        let (out, errors) = fold(binary(num(1.0), vec![(BinaryOp::Div, num(0.0))]));
        assert!(matches!(out.kind, ExprKind::Binary { .. }));
        assert_eq!(errors, ["Division by zero."]);
        let (_, errors) = fold(binary(int(1), vec![(BinaryOp::Mod, int(0))]));
        assert_eq!(errors, ["Modulo by zero."]);
    }

    #[test]
    fn test_logical_and_unary_folding() {
        let and = Expr::new(ExprKind::Logical { op: LogicalOp::And, operands: vec![num(1.0), num(0.0)] }, None);
        assert_eq!(folded(and), Constant::number(0.0));
        let partial = Expr::new(ExprKind::Logical { op: LogicalOp::Or, operands: vec![num(0.0), num(1.0), var("a")] }, None);
        let (out, _) = fold(partial);
        assert!(matches!(out.kind, ExprKind::Logical { ref operands, .. } if operands.len() == 2));

        let unary = |op, operand| Expr::new(ExprKind::Unary { op, operand: Box::new(operand) }, None);
        assert_eq!(folded(unary(UnaryOp::Negate, num(2.0))), Constant::number(-2.0));
        assert_eq!(folded(unary(UnaryOp::Not, num(0.0))), Constant::number(1.0));
        assert_eq!(folded(unary(UnaryOp::BitNot, int(0))), Constant::Int64(-1));
    }

    #[test]
    fn test_pure_calls() {
        assert_eq!(folded(call("string", vec![num(5.0)])), Constant::String("5".into()));
        assert_eq!(folded(call("real", vec![string("2.5")])), Constant::number(2.5));
        assert_eq!(folded(call("int64", vec![num(2.5)])), Constant::Int64(2));
        assert_eq!(folded(call("chr", vec![num(65.0)])), Constant::String("A".into()));
        assert_eq!(folded(call("ord", vec![string("A")])), Constant::number(65.0));

        let (out, errors) = fold(call("real", vec![string("abc")]));
        assert_eq!(out.as_constant(), Some(&Constant::number(0.0)));
        assert_eq!(errors, ["Cannot convert non-number string to a number."]);

        let (out, _) = fold(call("string", vec![var("a")]));
        assert!(matches!(out.kind, ExprKind::Call(_)));
    }

    #[test]
    fn test_dead_branches_are_removed() {
        let if_stmt = |else_branch: Option<Box<Stmt>>| {
            Stmt::new(
                StmtKind::If {
                    condition: binary(num(1.0), vec![(BinaryOp::Gt, num(2.0))]),
                    then_branch: Box::new(assign(var("a"), AssignOp::Set, num(1.0))),
                    else_branch,
                },
                None,
            )
        };
        assert_eq!(run(if_stmt(None)).0.kind, StmtKind::Discard);
        let (out, _) = run(if_stmt(Some(Box::new(assign(var("b"), AssignOp::Set, num(2.0))))));
        assert!(matches!(out.kind, StmtKind::Assign { target, .. } if matches!(&target.kind, ExprKind::SingleVariable(v) if v.name == "b")));
    }

    #[test]
    fn test_self_assignment_is_discarded() {
        assert_eq!(run(assign(var("a"), AssignOp::Set, var("a"))).0.kind, StmtKind::Discard);
        assert!(matches!(run(assign(var("a"), AssignOp::Add, var("a"))).0.kind, StmtKind::Assign { .. }));
    }

    #[test]
    fn test_accessor_reads() {
        let (out, errors) = fold(indexed("m", Accessor::Map, vec![string("k")]));
        assert!(errors.is_empty());
        if let ExprKind::Call(call) = out.kind {
            assert_eq!(call.name, "ds_map_find_value");
            assert_eq!(call.args.len(), 2);
            assert!(matches!(&call.args[0].kind, ExprKind::SingleVariable(v) if v.name == "m" && v.index.is_none()));
        } else {
            panic!("Expected Call");
        }

        let (out, _) = fold(indexed("g", Accessor::Grid, vec![num(1.0), num(2.0)]));
        assert!(matches!(out.kind, ExprKind::Call(ref c) if c.name == "ds_grid_get" && c.args.len() == 3));

        let (out, _) = fold(indexed("a", Accessor::BaseArray, vec![num(0.0)]));
        assert!(matches!(out.kind, ExprKind::SingleVariable(_)));
    }

    #[test]
    fn test_accessor_in_chain_becomes_head() {
        let mut list = Variable::new("l", None);
        list.index = Some(Index { accessor: Accessor::List, dims: vec![num(0.0)] });
        let chain = Expr::new(
            ExprKind::VariableRef { head: Box::new(var("a")), path: vec![list, Variable::new("b", None)] },
            None,
        );
        let (out, _) = fold(chain);
        if let ExprKind::VariableRef { head, path } = out.kind {
            assert!(matches!(head.kind, ExprKind::Call(ref c) if c.name == "ds_list_find_value"));
            assert_eq!(path.len(), 1);
            assert_eq!(path[0].name, "b");
        } else {
            panic!("Expected VariableRef");
        }
    }

    #[test]
    fn test_accessor_writes() {
        let (out, _) = run(assign(indexed("m", Accessor::Map, vec![string("k")]), AssignOp::Set, num(1.0)));
        assert!(matches!(out.kind, StmtKind::Call(ref c) if c.name == "ds_map_set" && c.args.len() == 3));

        let (out, _) = run(assign(indexed("m", Accessor::Map, vec![string("k")]), AssignOp::Add, num(1.0)));
        if let StmtKind::Call(c) = out.kind {
            assert_eq!(c.name, "ds_map_set");
            assert!(matches!(
                &c.args[2].kind,
                ExprKind::Binary { first, rest }
                    if matches!(&first.kind, ExprKind::Call(read) if read.name == "ds_map_find_value")
                        && rest[0].0 == BinaryOp::Add
            ));
        } else {
            panic!("Expected Call");
        }

        let step = Stmt::new(
            StmtKind::IncDec(IncDec { target: indexed("l", Accessor::List, vec![num(0.0)]), increment: false, postfix: true }),
            None,
        );
        let (out, _) = run(step);
        assert!(matches!(out.kind, StmtKind::Call(ref c) if c.name == "ds_list_set"));
    }

    #[test]
    fn test_missing_accessor_is_reported() {
        let (_, errors) = fold(indexed("m", Accessor::Map, vec![num(1.0), num(2.0)]));
        assert_eq!(errors, ["Accessor has incorrect number of arguments."]);
    }

    #[test]
    fn test_case_values_must_be_constant() {
        let switch = |value: Expr| {
            Stmt::new(StmtKind::Switch { value: var("x"), body: vec![Stmt::new(StmtKind::Case(value), None)] }, None)
        };
        assert!(run(switch(binary(num(1.0), vec![(BinaryOp::Add, num(1.0))]))).1.is_empty());
        assert_eq!(run(switch(call("irandom", vec![num(3.0)]))).1, ["Case argument must be constant."]);
    }

    #[test]
    fn test_desugar_only_keeps_constant_code() {
        let table = BuiltinTable::standard();
        let body = Stmt::new(
            StmtKind::Block(vec![
                assign(var("a"), AssignOp::Set, var("a")),
                assign(var("b"), AssignOp::Set, binary(num(1.0), vec![(BinaryOp::Add, num(2.0))])),
                assign(indexed("m", Accessor::Map, vec![string("k")]), AssignOp::Set, num(1.0)),
            ]),
            None,
        );
        let (out, diagnostics) = desugar(&body, &table);
        assert!(diagnostics.is_empty());
        let StmtKind::Block(stmts) = out.kind else {
            panic!("Expected Block");
        };
        assert!(matches!(stmts[0].kind, StmtKind::Assign { .. }));
        assert!(matches!(&stmts[1].kind, StmtKind::Assign { value, .. } if matches!(value.kind, ExprKind::Binary { .. })));
        assert!(matches!(stmts[2].kind, StmtKind::Call(ref c) if c.name == "ds_map_set"));
    }
}
