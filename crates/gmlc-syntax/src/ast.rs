//! AST types for GML.
//!
//! The tree is immutable once built: the optimizer consumes a borrowed tree
//! and returns a new one. Every node remembers where it came from so later
//! passes can attach locations to their diagnostics.

use std::fmt;

use crate::constant::Constant;
use crate::scope::Scope;
use crate::token::{Location, TokenKind};

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block(Vec<Stmt>),
    Assign {
        target: Expr,
        op: AssignOp,
        value: Expr,
    },
    /// `var a, b = 1;`
    LocalVars(Vec<Declaration>),
    /// `globalvar a, b;`
    GlobalVars(Vec<Declaration>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    DoUntil {
        body: Box<Stmt>,
        condition: Expr,
    },
    Repeat {
        count: Expr,
        body: Box<Stmt>,
    },
    For {
        init: Box<Stmt>,
        condition: Expr,
        step: Box<Stmt>,
        body: Box<Stmt>,
    },
    /// The body is flat: `Case` and `Default` markers interleave with the
    /// statements they label.
    Switch {
        value: Expr,
        body: Vec<Stmt>,
    },
    Case(Expr),
    Default,
    With {
        target: Expr,
        body: Box<Stmt>,
    },
    Break,
    Continue,
    Exit,
    Return(Option<Expr>),
    Call(Call),
    IncDec(IncDec),
    /// Removed by the optimizer; emits nothing.
    Discard,
}

/// One name of a `var` or `globalvar` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub location: Option<Location>,
    pub value: Option<Expr>,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Constant(Constant),
    /// `first op0 x0 op1 x1 ...`, evaluated left to right.
    Binary {
        first: Box<Expr>,
        rest: Vec<(BinaryOp, Expr)>,
    },
    /// Short-circuiting `&&` or `||` chain.
    Logical {
        op: LogicalOp,
        operands: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
    Call(Call),
    SingleVariable(Variable),
    /// `head.a.b[i]`: the head is any expression yielding an instance.
    VariableRef {
        head: Box<Expr>,
        path: Vec<Variable>,
    },
    IncDec(Box<IncDec>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
}

/// A variable path segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    /// Unset for user variables until code generation resolves them.
    pub scope: Option<Scope>,
    pub index: Option<Index>,
    pub location: Option<Location>,
}

impl Variable {
    pub fn new(name: impl Into<String>, location: Option<Location>) -> Self {
        Self { name: name.into(), scope: None, index: None, location }
    }

    pub fn without_index(&self) -> Variable {
        Variable { index: None, ..self.clone() }
    }
}

/// One- or two-dimensional index with its accessor kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub accessor: Accessor,
    pub dims: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessor {
    /// `a[i]`
    Array,
    /// `m[? key]`
    Map,
    /// `l[| i]`
    List,
    /// `g[# x, y]`
    Grid,
    /// `a[@ i]`
    BaseArray,
}

impl Accessor {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::OpenArray => Some(Accessor::Array),
            TokenKind::OpenArrayMap => Some(Accessor::Map),
            TokenKind::OpenArrayList => Some(Accessor::List),
            TokenKind::OpenArrayGrid => Some(Accessor::Grid),
            TokenKind::OpenArrayBaseArray => Some(Accessor::BaseArray),
            _ => None,
        }
    }

    /// Accessors that address plain array storage rather than a data structure.
    pub fn is_array_like(self) -> bool {
        matches!(self, Accessor::Array | Accessor::BaseArray)
    }
}

/// `++`/`--` in prefix or postfix position.
#[derive(Debug, Clone, PartialEq)]
pub struct IncDec {
    pub target: Expr,
    pub increment: bool,
    pub postfix: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
}

impl AssignOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Assign => Some(AssignOp::Set),
            TokenKind::AssignPlus => Some(AssignOp::Add),
            TokenKind::AssignMinus => Some(AssignOp::Sub),
            TokenKind::AssignTimes => Some(AssignOp::Mul),
            TokenKind::AssignDivide => Some(AssignOp::Div),
            TokenKind::AssignMod => Some(AssignOp::Mod),
            TokenKind::AssignAnd => Some(AssignOp::And),
            TokenKind::AssignOr => Some(AssignOp::Or),
            TokenKind::AssignXor => Some(AssignOp::Xor),
            _ => None,
        }
    }

    /// The binary operator a compound assignment applies; `None` for `=`.
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Set => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Mod => Some(BinaryOp::Mod),
            AssignOp::And => Some(BinaryOp::BitAnd),
            AssignOp::Or => Some(BinaryOp::BitOr),
            AssignOp::Xor => Some(BinaryOp::BitXor),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Logical `^^`. Evaluates both operands.
    Xor,
    BitOr,
    BitAnd,
    BitXor,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    /// `div`
    IntDiv,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinaryOp::BitOr | BinaryOp::BitAnd | BinaryOp::BitXor)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Xor => "^^",
            BinaryOp::BitOr => "|",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::IntDiv => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Negate,
    BitNot,
    Plus,
}

impl Stmt {
    pub fn new(kind: StmtKind, location: Option<Location>) -> Self {
        Self { kind, location }
    }

    pub fn discard(location: Option<Location>) -> Self {
        Self { kind: StmtKind::Discard, location }
    }

    pub fn empty_block(location: Option<Location>) -> Self {
        Self { kind: StmtKind::Block(Vec::new()), location }
    }
}

impl Expr {
    pub fn new(kind: ExprKind, location: Option<Location>) -> Self {
        Self { kind, location }
    }

    pub fn constant(value: Constant, location: Option<Location>) -> Self {
        Self { kind: ExprKind::Constant(value), location }
    }

    pub fn variable(var: Variable) -> Self {
        let location = var.location;
        Self { kind: ExprKind::SingleVariable(var), location }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>, location: Option<Location>) -> Self {
        Self { kind: ExprKind::Call(Call { name: name.into(), args }), location }
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match &self.kind {
            ExprKind::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// True for single variables and variable chains.
    pub fn is_variable(&self) -> bool {
        matches!(self.kind, ExprKind::SingleVariable(_) | ExprKind::VariableRef { .. })
    }
}
