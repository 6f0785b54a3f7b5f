//! Expression grammar, lowest precedence first:
//!
//! conditional, `||`, `&&`, `^^`, comparison, bitwise, shift, additive,
//! multiplicative, then postfix chains and primaries.

use gmlc_optimizer::Optimizer;
use gmlc_syntax::{
    Accessor, BinaryOp, Constant, Expr, ExprKind, IncDec, Index, LogicalOp, Scope, TokenKind,
    UnaryOp, Variable,
};

use crate::parser::Parser;

type Level<'a> = fn(&mut Parser<'a>) -> Option<Expr>;

const COMPARE_OPS: &[(TokenKind, BinaryOp)] = &[
    (TokenKind::CompareEqual, BinaryOp::Eq),
    // Legacy GML allows `=` as a comparison inside expressions.
    (TokenKind::Assign, BinaryOp::Eq),
    (TokenKind::CompareNotEqual, BinaryOp::Ne),
    (TokenKind::CompareLess, BinaryOp::Lt),
    (TokenKind::CompareLessEqual, BinaryOp::Le),
    (TokenKind::CompareGreater, BinaryOp::Gt),
    (TokenKind::CompareGreaterEqual, BinaryOp::Ge),
];

const BITWISE_OPS: &[(TokenKind, BinaryOp)] = &[
    (TokenKind::BitwiseOr, BinaryOp::BitOr),
    (TokenKind::BitwiseAnd, BinaryOp::BitAnd),
    (TokenKind::BitwiseXor, BinaryOp::BitXor),
];

const SHIFT_OPS: &[(TokenKind, BinaryOp)] = &[
    (TokenKind::BitwiseShiftLeft, BinaryOp::Shl),
    (TokenKind::BitwiseShiftRight, BinaryOp::Shr),
];

const ADD_OPS: &[(TokenKind, BinaryOp)] = &[(TokenKind::Plus, BinaryOp::Add), (TokenKind::Minus, BinaryOp::Sub)];

const MUL_OPS: &[(TokenKind, BinaryOp)] = &[
    (TokenKind::Times, BinaryOp::Mul),
    (TokenKind::Divide, BinaryOp::Div),
    (TokenKind::Div, BinaryOp::IntDiv),
    (TokenKind::Mod, BinaryOp::Mod),
];

impl<'a> Parser<'a> {
    pub fn parse_expr(&mut self) -> Option<Expr> {
        self.parse_conditional()
    }

    fn parse_conditional(&mut self) -> Option<Expr> {
        let condition = self.parse_or()?;
        if self.failed || !self.at(TokenKind::Conditional) {
            return Some(condition);
        }
        let question = self.advance()?;
        if !self.options.gms2 {
            self.syntax_error(
                "Attempt to use conditional operator in GameMaker version earlier than 2.",
                question.location,
            );
            return None;
        }
        let then_value = self.parse_or()?;
        self.expect(TokenKind::Colon)?;
        let else_value = self.parse_expr()?;
        Some(Expr::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                then_value: Box::new(then_value),
                else_value: Box::new(else_value),
            },
            question.location,
        ))
    }

    fn parse_or(&mut self) -> Option<Expr> {
        self.parse_logical(TokenKind::LogicalOr, LogicalOp::Or, Self::parse_and)
    }

    fn parse_and(&mut self) -> Option<Expr> {
        self.parse_logical(TokenKind::LogicalAnd, LogicalOp::And, Self::parse_xor)
    }

    fn parse_xor(&mut self) -> Option<Expr> {
        self.parse_binary(&[(TokenKind::LogicalXor, BinaryOp::Xor)], Self::parse_compare)
    }

    fn parse_compare(&mut self) -> Option<Expr> {
        self.parse_binary(COMPARE_OPS, Self::parse_bitwise)
    }

    fn parse_bitwise(&mut self) -> Option<Expr> {
        self.parse_binary(BITWISE_OPS, Self::parse_shift)
    }

    fn parse_shift(&mut self) -> Option<Expr> {
        self.parse_binary(SHIFT_OPS, Self::parse_additive)
    }

    fn parse_additive(&mut self) -> Option<Expr> {
        self.parse_binary(ADD_OPS, Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Option<Expr> {
        self.parse_binary(MUL_OPS, Self::parse_postfix)
    }

    fn parse_logical(&mut self, token: TokenKind, op: LogicalOp, next: Level<'a>) -> Option<Expr> {
        let first = next(self)?;
        if self.failed || !self.at(token) {
            return Some(first);
        }
        let location = self.peek_location();
        let mut operands = vec![first];
        while self.eat(token) {
            operands.push(next(self)?);
        }
        Some(Expr::new(ExprKind::Logical { op, operands }, location))
    }

    /// One precedence level, folded greedily into a single n-ary node.
    fn parse_binary(&mut self, ops: &[(TokenKind, BinaryOp)], next: Level<'a>) -> Option<Expr> {
        let first = next(self)?;
        let location = self.peek_location();
        let mut rest = Vec::new();
        while !self.failed {
            let kind = self.peek();
            let Some(&(_, op)) = ops.iter().find(|(t, _)| *t == kind) else {
                break;
            };
            self.advance()?;
            rest.push((op, next(self)?));
        }
        if rest.is_empty() {
            return Some(first);
        }
        Some(Expr::new(ExprKind::Binary { first: Box::new(first), rest }, location))
    }

    /// A primary followed by any `.name` segments and a postfix `++`/`--`.
    pub(crate) fn parse_postfix(&mut self) -> Option<Expr> {
        let left = self.parse_primary()?;
        if self.failed || !self.at(TokenKind::Dot) {
            return Some(left);
        }
        let location = self.peek_location();

        let mut head = None;
        let mut pending_scope = None;
        let constant_id = match &left.kind {
            ExprKind::Constant(c) => Some(c.as_f64()),
            _ => None,
        };
        match constant_id {
            Some(Some(id)) => pending_scope = Some(Scope::from_id(id as i32)),
            Some(None) => {
                self.semantic_error("Expected constant to be number in variable reference.", left.location)
            }
            None => head = Some(left),
        }

        let mut path = Vec::new();
        while self.eat(TokenKind::Dot) {
            let mut var = self.parse_single_var()?;
            if let Some(scope) = pending_scope.take() {
                var.scope = Some(scope);
            }
            match head {
                None => head = Some(Expr::variable(var)),
                Some(_) => path.push(var),
            }
        }

        let head = head?;
        let chain = if path.is_empty() {
            head
        } else {
            Expr::new(ExprKind::VariableRef { head: Box::new(head), path }, location)
        };
        self.wrap_postfix(chain)
    }

    fn wrap_postfix(&mut self, target: Expr) -> Option<Expr> {
        if !self.at_any(&[TokenKind::Increment, TokenKind::Decrement]) {
            return Some(target);
        }
        let op = self.advance()?;
        let inc = IncDec { target, increment: op.kind == TokenKind::Increment, postfix: true };
        Some(Expr::new(ExprKind::IncDec(Box::new(inc)), op.location))
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        use TokenKind::*;

        let location = self.peek_location();
        match self.peek() {
            OpenArray => self.parse_array_literal(),
            OpenParen => {
                self.advance()?;
                let inner = self.parse_expr()?;
                self.expect(CloseParen)?;
                Some(inner)
            }
            ProcConstant => {
                let tok = self.advance()?;
                Some(Expr::constant(tok.constant.unwrap_or(Constant::Absent), tok.location))
            }
            ProcFunction => {
                let (call, location) = self.parse_call()?;
                Some(Expr::new(ExprKind::Call(call), location))
            }
            ProcVariable => {
                let var = self.parse_single_var()?;
                if self.at(Dot) {
                    Some(Expr::variable(var))
                } else {
                    self.wrap_postfix(Expr::variable(var))
                }
            }
            Increment | Decrement => {
                let op = self.advance()?;
                let target = self.parse_postfix()?;
                let inc = IncDec { target, increment: op.kind == Increment, postfix: false };
                Some(Expr::new(ExprKind::IncDec(Box::new(inc)), op.location))
            }
            Not | Plus | Minus | BitwiseNegate => {
                let tok = self.advance()?;
                let op = match tok.kind {
                    Not => UnaryOp::Not,
                    Plus => UnaryOp::Plus,
                    Minus => UnaryOp::Negate,
                    _ => UnaryOp::BitNot,
                };
                let operand = self.parse_postfix()?;
                Some(Expr::new(ExprKind::Unary { op, operand: Box::new(operand) }, tok.location))
            }
            OpenBlock => {
                self.advance()?;
                self.syntax_error("Unsupported syntax.", location);
                None
            }
            _ => {
                self.advance()?;
                self.syntax_error("Unexpected token in expression.", location);
                None
            }
        }
    }

    fn parse_array_literal(&mut self) -> Option<Expr> {
        let open = self.expect(TokenKind::OpenArray)?;
        let mut items = Vec::new();
        while self.has_tokens() && !self.at_any(&[TokenKind::CloseArray, TokenKind::Eof]) {
            items.push(self.parse_expr()?);
            if !self.eat(TokenKind::Comma) && !self.at(TokenKind::CloseArray) {
                let location = self.peek_location();
                self.syntax_error("Expected ',' or ']' after value in inline array.", location);
                return None;
            }
        }
        self.expect(TokenKind::CloseArray)?;
        Some(Expr::call("@@NewGMLArray@@", items, open.location))
    }

    /// A variable name with its optional index.
    fn parse_single_var(&mut self) -> Option<Variable> {
        let tok = self.expect(TokenKind::ProcVariable)?;
        let mut var = Variable::new(tok.text(), tok.location);
        var.scope = tok.scope;

        if self.symbols.function(&var.name).is_some() {
            self.semantic_error(
                format!("Variable name {} cannot be used; a function or script already has the name.", var.name),
                tok.location,
            );
        }

        if let Some(accessor) = Accessor::from_token(self.peek()) {
            self.advance()?;
            let mut dims = vec![self.parse_index(accessor)?];
            if self.eat(TokenKind::Comma) {
                dims.push(self.parse_index(accessor)?);
            }
            self.expect(TokenKind::CloseArray)?;
            var.index = Some(Index { accessor, dims });
        } else if self.symbols.variable(&var.name).is_some_and(|v| v.array) {
            let zero = Expr::constant(Constant::Int64(0), var.location);
            var.index = Some(Index { accessor: Accessor::Array, dims: vec![zero] });
        }
        Some(var)
    }

    fn parse_index(&mut self, accessor: Accessor) -> Option<Expr> {
        let index = self.parse_expr()?;
        if !self.failed && accessor != Accessor::Map {
            let folded = Optimizer::new(self.symbols).optimize_expr(&index);
            if matches!(folded.kind, ExprKind::Constant(Constant::String(_))) {
                self.semantic_error(
                    "Strings cannot be used for array indices, unless in a map accessor.",
                    index.location,
                );
            }
        }
        Some(index)
    }
}
