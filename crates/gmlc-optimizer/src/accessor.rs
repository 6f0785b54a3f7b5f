//! Rewrites data-structure accessors into runtime calls.
//!
//! `m[? k]` reads become `read(m, k)` and the final segment of an assigned
//! target becomes `write(m, k, value)`. Intermediate segments of a chain
//! such as `a.l[| 0].b` collapse into a call that becomes the new chain
//! head. Plain and `[@` array indices are left for the code writer.

use gmlc_syntax::{
    AccessorInfo, AssignOp, Call, Constant, Expr, ExprKind, Index, Location, Stmt, StmtKind,
    Variable,
};

use crate::Optimizer;

/// An assignment target after accessor rewriting.
pub(crate) enum Target {
    Plain(Expr),
    Accessor {
        container: Expr,
        info: AccessorInfo,
        dims: Vec<Expr>,
    },
}

impl<'a> Optimizer<'a> {
    pub(crate) fn optimize_index(&mut self, var: &Variable) -> Variable {
        let mut var = var.clone();
        if let Some(index) = var.index.take() {
            let dims = index.dims.iter().map(|d| self.optimize_expr(d)).collect();
            var.index = Some(Index { accessor: index.accessor, dims });
        }
        var
    }

    /// Runtime functions for the segment's accessor, if it needs rewriting.
    fn accessor_info(&mut self, var: &Variable) -> Option<AccessorInfo> {
        let index = var.index.as_ref()?;
        if index.accessor.is_array_like() {
            return None;
        }
        let info = self.symbols.accessor(index.accessor, index.dims.len());
        if info.is_none() {
            self.report("Accessor has incorrect number of arguments.", var.location);
        }
        info
    }

    pub(crate) fn read_variable(&mut self, var: &Variable) -> Expr {
        let var = self.optimize_index(var);
        match self.accessor_info(&var) {
            Some(info) => read_call(&info, Expr::variable(var.without_index()), dims_of(&var), var.location),
            None => Expr::variable(var),
        }
    }

    pub(crate) fn read_chain(&mut self, head: &Expr, path: &[Variable], location: Option<Location>) -> Expr {
        let head = self.optimize_expr(head);
        let (head, path) = self.collapse(head, path);
        chain(head, path, location)
    }

    /// Folds every accessor segment into the head, returning what is left.
    fn collapse(&mut self, head: Expr, segments: &[Variable]) -> (Expr, Vec<Variable>) {
        let mut head = head;
        let mut path = Vec::new();
        for segment in segments {
            let segment = self.optimize_index(segment);
            match self.accessor_info(&segment) {
                Some(info) => {
                    let location = segment.location;
                    let dims = dims_of(&segment);
                    path.push(segment.without_index());
                    let container = chain(head, std::mem::take(&mut path), location);
                    head = read_call(&info, container, dims, location);
                }
                None => path.push(segment),
            }
        }
        (head, path)
    }

    pub(crate) fn split_target(&mut self, target: &Expr) -> Target {
        match &target.kind {
            ExprKind::SingleVariable(var) => {
                let var = self.optimize_index(var);
                match self.accessor_info(&var) {
                    Some(info) => Target::Accessor {
                        dims: dims_of(&var),
                        container: Expr::variable(var.without_index()),
                        info,
                    },
                    None => Target::Plain(Expr::variable(var)),
                }
            }
            ExprKind::VariableRef { head, path } => {
                let Some((last, init)) = path.split_last() else {
                    return Target::Plain(self.optimize_expr(head));
                };
                let head = self.optimize_expr(head);
                let (head, mut rest) = self.collapse(head, init);
                let last = self.optimize_index(last);
                match self.accessor_info(&last) {
                    Some(info) => {
                        let dims = dims_of(&last);
                        rest.push(last.without_index());
                        Target::Accessor { container: chain(head, rest, target.location), info, dims }
                    }
                    None => {
                        rest.push(last);
                        Target::Plain(chain(head, rest, target.location))
                    }
                }
            }
            _ => Target::Plain(self.optimize_expr(target)),
        }
    }

    /// Optimizes indices without rewriting the target's own accessor.
    pub(crate) fn keep_target(&mut self, target: &Expr) -> Expr {
        match &target.kind {
            ExprKind::SingleVariable(var) => Expr::new(ExprKind::SingleVariable(self.optimize_index(var)), target.location),
            ExprKind::VariableRef { head, path } => {
                let head = Box::new(self.optimize_expr(head));
                let path = path.iter().map(|v| self.optimize_index(v)).collect();
                Expr::new(ExprKind::VariableRef { head, path }, target.location)
            }
            _ => self.optimize_expr(target),
        }
    }

    /// `write(container, dims.., value)`, reading the old value first for
    /// compound operators.
    pub(crate) fn accessor_store(
        &mut self,
        container: Expr,
        info: AccessorInfo,
        dims: Vec<Expr>,
        op: AssignOp,
        value: Expr,
        location: Option<Location>,
    ) -> Stmt {
        let value = match op.binary() {
            None => value,
            Some(binary) => {
                let old = read_call(&info, container.clone(), dims.clone(), location);
                Expr::new(ExprKind::Binary { first: Box::new(old), rest: vec![(binary, value)] }, location)
            }
        };
        let mut args = Vec::with_capacity(dims.len() + 2);
        args.push(container);
        args.extend(dims);
        args.push(value);
        Stmt::new(StmtKind::Call(Call { name: info.write, args }), location)
    }

    /// `m[? k]++` as a statement: stored back through the write function.
    pub(crate) fn accessor_step(
        &mut self,
        container: Expr,
        info: AccessorInfo,
        dims: Vec<Expr>,
        increment: bool,
        location: Option<Location>,
    ) -> Stmt {
        let op = if increment { AssignOp::Add } else { AssignOp::Sub };
        let one = Expr::constant(Constant::number(1.0), location);
        self.accessor_store(container, info, dims, op, one, location)
    }
}

fn dims_of(var: &Variable) -> Vec<Expr> {
    var.index.as_ref().map(|i| i.dims.clone()).unwrap_or_default()
}

fn read_call(info: &AccessorInfo, container: Expr, dims: Vec<Expr>, location: Option<Location>) -> Expr {
    let mut args = Vec::with_capacity(dims.len() + 1);
    args.push(container);
    args.extend(dims);
    Expr::call(info.read.clone(), args, location)
}

fn chain(head: Expr, path: Vec<Variable>, location: Option<Location>) -> Expr {
    if path.is_empty() {
        head
    } else {
        Expr::new(ExprKind::VariableRef { head: Box::new(head), path }, location)
    }
}
