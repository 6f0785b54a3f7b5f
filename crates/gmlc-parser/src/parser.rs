//! Statement grammar and the shared parser state.
//!
//! Every `parse_*` method returns `None` after reporting a diagnostic. A
//! syntax error discards tokens up to the next `;` or statement keyword,
//! and each statement loop makes sure at least one token is consumed per
//! iteration, so a single bad token can never stall the parser.

use std::collections::VecDeque;

use indexmap::IndexSet;
use tracing::debug;

use gmlc_syntax::{
    AssignOp, Call, Declaration, Diagnostic, Expr, ExprKind, IncDec, Location, Stmt, StmtKind,
    SymbolTable, Token, TokenKind,
};

use crate::preprocess::preprocess;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Accept GameMaker Studio 2 syntax such as the `?:` operator.
    pub gms2: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { gms2: true }
    }
}

/// A successfully parsed script.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub root: Stmt,
    /// Names declared with `var`, in declaration order.
    pub locals: IndexSet<String>,
    /// Names declared with `globalvar`.
    pub globals: IndexSet<String>,
    pub argument_count: usize,
}

pub struct Parser<'a> {
    tokens: VecDeque<Token>,
    pub(crate) symbols: &'a dyn SymbolTable,
    pub(crate) options: ParseOptions,
    diagnostics: Vec<Diagnostic>,
    /// Set by a syntax error; cleared at the start of each statement.
    pub(crate) failed: bool,
    locals: IndexSet<String>,
    globals: IndexSet<String>,
    argument_count: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, symbols: &'a dyn SymbolTable, options: ParseOptions) -> Self {
        let pre = preprocess(tokens, symbols);
        Self {
            tokens: pre.tokens.into(),
            symbols,
            options,
            diagnostics: pre.diagnostics,
            failed: false,
            locals: IndexSet::new(),
            globals: IndexSet::new(),
            argument_count: pre.argument_count,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn parse_program(mut self) -> Result<Parsed, Vec<Diagnostic>> {
        let location = self.peek_location();
        let mut body = Vec::new();
        while !self.tokens.is_empty() && !self.at(TokenKind::Eof) {
            if let Some(stmt) = self.parse_guarded(false) {
                body.push(stmt);
            }
        }
        debug!(
            statements = body.len(),
            locals = self.locals.len(),
            diagnostics = self.diagnostics.len(),
            "parsed script"
        );
        if !self.diagnostics.is_empty() {
            return Err(self.diagnostics);
        }
        Ok(Parsed {
            root: Stmt::new(StmtKind::Block(body), location),
            locals: self.locals,
            globals: self.globals,
            argument_count: self.argument_count,
        })
    }

    // === Token queue ===

    pub(crate) fn peek(&self) -> TokenKind {
        self.tokens.front().map_or(TokenKind::Eof, |t| t.kind)
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.tokens.front().is_some_and(|t| t.kind == kind)
    }

    pub(crate) fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.iter().any(|k| self.at(*k))
    }

    pub(crate) fn has_tokens(&self) -> bool {
        !self.tokens.is_empty()
    }

    pub(crate) fn peek_location(&self) -> Option<Location> {
        self.tokens.front().and_then(|t| t.location)
    }

    pub(crate) fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.pop_front();
        if tok.is_none() {
            self.semantic_error("Unexpected end of code.", None);
        }
        tok
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.tokens.pop_front();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.tokens.is_empty() {
            self.semantic_error("Unexpected end of code.", None);
            return None;
        }
        if self.at(kind) {
            return self.tokens.pop_front();
        }
        let got = self.peek();
        let location = self.peek_location();
        self.syntax_error(format!("Expected token kind {}, got {}.", kind, got), location);
        None
    }

    // === Diagnostics ===

    pub(crate) fn syntax_error(&mut self, message: impl Into<String>, location: Option<Location>) {
        self.diagnostics.push(Diagnostic::syntax(message, location));
        self.failed = true;
        self.synchronize();
    }

    pub(crate) fn semantic_error(&mut self, message: impl Into<String>, location: Option<Location>) {
        self.diagnostics.push(Diagnostic::semantic(message, location));
    }

    fn synchronize(&mut self) {
        while let Some(tok) = self.tokens.front() {
            if matches!(tok.kind, TokenKind::EndStatement | TokenKind::Eof) || tok.kind.is_keyword() {
                break;
            }
            self.tokens.pop_front();
        }
    }

    // === Statements ===

    /// Parses one statement, dropping a token if nothing was consumed.
    fn parse_guarded(&mut self, in_switch: bool) -> Option<Stmt> {
        let before = self.tokens.len();
        let stmt = self.parse_statement(in_switch);
        if self.tokens.len() == before && !self.at(TokenKind::Eof) {
            self.tokens.pop_front();
        }
        stmt
    }

    fn parse_statement(&mut self, in_switch: bool) -> Option<Stmt> {
        use TokenKind::*;

        self.failed = false;
        let location = self.peek_location();
        let stmt = match self.peek() {
            OpenBlock => self.parse_block(),
            ProcFunction => self
                .parse_call()
                .map(|(call, location)| Stmt::new(StmtKind::Call(call), location)),
            KeywordVar => self.parse_declarations(true),
            KeywordGlobalVar => self.parse_declarations(false),
            KeywordBreak => self.parse_keyword(StmtKind::Break),
            KeywordContinue => self.parse_keyword(StmtKind::Continue),
            KeywordExit => self.parse_keyword(StmtKind::Exit),
            KeywordReturn => self.parse_return(),
            KeywordWith => self.parse_with(),
            KeywordWhile => self.parse_while(),
            KeywordRepeat => self.parse_repeat(),
            KeywordFor => self.parse_for(),
            KeywordSwitch => self.parse_switch(),
            KeywordCase | KeywordDefault => {
                let label = self.parse_case_label();
                if in_switch {
                    label
                } else {
                    self.semantic_error(
                        "Case and default labels must appear directly inside a switch statement.",
                        location,
                    );
                    None
                }
            }
            KeywordIf => self.parse_if(),
            KeywordDo => self.parse_do_until(),
            Enum => {
                self.syntax_error("Enums are not currently supported.", location);
                None
            }
            Eof => {
                self.semantic_error("Unexpected end of code.", location);
                None
            }
            EndStatement => None,
            Increment | Decrement => self.parse_prefix_statement(),
            _ => self.parse_assign(),
        };
        while self.eat(EndStatement) {}
        stmt
    }

    /// A statement in body position. Missing bodies become empty blocks.
    fn parse_body(&mut self) -> Stmt {
        let location = self.peek_location();
        self.parse_statement(false)
            .unwrap_or_else(|| Stmt::empty_block(location))
    }

    fn parse_keyword(&mut self, kind: StmtKind) -> Option<Stmt> {
        let tok = self.advance()?;
        Some(Stmt::new(kind, tok.location))
    }

    fn parse_block(&mut self) -> Option<Stmt> {
        let open = self.expect(TokenKind::OpenBlock)?;
        let mut body = Vec::new();
        while self.has_tokens() && !self.at_any(&[TokenKind::CloseBlock, TokenKind::Eof]) {
            if let Some(stmt) = self.parse_guarded(false) {
                body.push(stmt);
            }
        }
        self.expect(TokenKind::CloseBlock)?;
        Some(Stmt::new(StmtKind::Block(body), open.location))
    }

    pub(crate) fn parse_call(&mut self) -> Option<(Call, Option<Location>)> {
        let name_tok = self.expect(TokenKind::ProcFunction)?;
        self.expect(TokenKind::OpenParen)?;

        let mut args = Vec::new();
        while self.has_tokens() && !self.at_any(&[TokenKind::CloseParen, TokenKind::Eof]) {
            if let Some(arg) = self.parse_expr() {
                args.push(arg);
            }
            if self.failed {
                return None;
            }
            if !self.eat(TokenKind::Comma) && !self.at(TokenKind::CloseParen) {
                let location = self.peek_location();
                self.syntax_error("Expected ',' or ')' after argument in function call.", location);
                return None;
            }
        }
        self.expect(TokenKind::CloseParen)?;

        let name = name_tok.text().to_string();
        if let Some(expected) = self.symbols.function(&name).and_then(|f| f.arguments) {
            if expected != args.len() {
                self.semantic_error(
                    format!("Function {} expects {} arguments, got {}.", name, expected, args.len()),
                    name_tok.location,
                );
            }
        }
        Some((Call { name, args }, name_tok.location))
    }

    fn parse_declarations(&mut self, local: bool) -> Option<Stmt> {
        let keyword = self.advance()?;
        let mut decls = Vec::new();
        while self.at(TokenKind::ProcVariable) {
            let tok = self.advance()?;
            let name = tok.text().to_string();
            if tok.scope.is_some() {
                self.semantic_error("Redeclaration of builtin variable.", tok.location);
            }
            if self.symbols.function(&name).is_some() {
                self.semantic_error(
                    format!("Variable name {} cannot be used; a function or script already has the name.", name),
                    tok.location,
                );
            }
            if local {
                self.locals.insert(name.clone());
            } else {
                self.globals.insert(name.clone());
            }
            let value = if local && self.eat(TokenKind::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            decls.push(Declaration { name, location: tok.location, value });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let kind = if local { StmtKind::LocalVars(decls) } else { StmtKind::GlobalVars(decls) };
        Some(Stmt::new(kind, keyword.location))
    }

    fn parse_return(&mut self) -> Option<Stmt> {
        let keyword = self.advance()?;
        let ends_value = self.peek().is_keyword()
            || self.at_any(&[TokenKind::EndStatement, TokenKind::Eof, TokenKind::CloseBlock])
            || !self.has_tokens();
        let value = if ends_value { None } else { Some(self.parse_expr()?) };
        Some(Stmt::new(StmtKind::Return(value), keyword.location))
    }

    fn parse_with(&mut self) -> Option<Stmt> {
        let keyword = self.advance()?;
        let target = self.parse_expr()?;
        self.eat(TokenKind::KeywordDo);
        let body = Box::new(self.parse_body());
        Some(Stmt::new(StmtKind::With { target, body }, keyword.location))
    }

    fn parse_while(&mut self) -> Option<Stmt> {
        let keyword = self.advance()?;
        let condition = self.parse_expr()?;
        self.eat(TokenKind::KeywordDo);
        let body = Box::new(self.parse_body());
        Some(Stmt::new(StmtKind::While { condition, body }, keyword.location))
    }

    fn parse_repeat(&mut self) -> Option<Stmt> {
        let keyword = self.advance()?;
        let count = self.parse_expr()?;
        let body = Box::new(self.parse_body());
        Some(Stmt::new(StmtKind::Repeat { count, body }, keyword.location))
    }

    fn parse_for(&mut self) -> Option<Stmt> {
        let keyword = self.advance()?;
        self.expect(TokenKind::OpenParen)?;

        let init = if self.at(TokenKind::EndStatement) {
            let semi = self.advance()?;
            Stmt::empty_block(semi.location)
        } else {
            self.parse_body()
        };

        let condition = if self.at(TokenKind::EndStatement) {
            let semi = self.advance()?;
            Expr::constant(gmlc_syntax::Constant::Int64(1), semi.location)
        } else {
            let condition = self.parse_expr()?;
            self.eat(TokenKind::EndStatement);
            condition
        };

        let step = if self.at(TokenKind::CloseParen) {
            let close = self.advance()?;
            Stmt::empty_block(close.location)
        } else {
            let step = self.parse_body();
            self.expect(TokenKind::CloseParen)?;
            step
        };

        let body = self.parse_body();
        Some(Stmt::new(
            StmtKind::For {
                init: Box::new(init),
                condition,
                step: Box::new(step),
                body: Box::new(body),
            },
            keyword.location,
        ))
    }

    fn parse_switch(&mut self) -> Option<Stmt> {
        let keyword = self.advance()?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::OpenBlock)?;
        let mut body = Vec::new();
        while self.has_tokens() && !self.at_any(&[TokenKind::CloseBlock, TokenKind::Eof]) {
            if let Some(stmt) = self.parse_guarded(true) {
                body.push(stmt);
            }
        }
        self.expect(TokenKind::CloseBlock)?;
        Some(Stmt::new(StmtKind::Switch { value, body }, keyword.location))
    }

    fn parse_case_label(&mut self) -> Option<Stmt> {
        let keyword = self.advance()?;
        let kind = if keyword.kind == TokenKind::KeywordCase {
            StmtKind::Case(self.parse_expr()?)
        } else {
            StmtKind::Default
        };
        self.expect(TokenKind::Colon)?;
        Some(Stmt::new(kind, keyword.location))
    }

    fn parse_if(&mut self) -> Option<Stmt> {
        let keyword = self.advance()?;
        let condition = self.parse_expr()?;
        self.eat(TokenKind::KeywordThen);
        let then_branch = Box::new(self.parse_body());
        let else_branch = if self.eat(TokenKind::KeywordElse) {
            Some(Box::new(self.parse_body()))
        } else {
            None
        };
        Some(Stmt::new(StmtKind::If { condition, then_branch, else_branch }, keyword.location))
    }

    fn parse_do_until(&mut self) -> Option<Stmt> {
        let keyword = self.advance()?;
        let body = Box::new(self.parse_body());
        self.expect(TokenKind::KeywordUntil)?;
        let condition = self.parse_expr()?;
        Some(Stmt::new(StmtKind::DoUntil { body, condition }, keyword.location))
    }

    fn parse_prefix_statement(&mut self) -> Option<Stmt> {
        let op = self.advance()?;
        let target = self.parse_postfix()?;
        let inc = IncDec { target, increment: op.kind == TokenKind::Increment, postfix: false };
        Some(Stmt::new(StmtKind::IncDec(inc), op.location))
    }

    fn parse_assign(&mut self) -> Option<Stmt> {
        let target = self.parse_postfix()?;
        if let ExprKind::IncDec(inc) = target.kind {
            return Some(Stmt::new(StmtKind::IncDec(*inc), target.location));
        }

        if let Some(name) = assigned_name(&target) {
            if self.symbols.variable(name).is_some_and(|v| v.read_only) {
                self.semantic_error("Attempt to set a read-only variable.", target.location);
            }
        }

        let op_tok = self.advance()?;
        let Some(op) = AssignOp::from_token(op_tok.kind) else {
            self.syntax_error("Expected assignment operator.", op_tok.location);
            return None;
        };
        let value = self.parse_expr()?;
        Some(Stmt::new(StmtKind::Assign { target, op, value }, op_tok.location))
    }
}

/// The variable an assignment writes: the last segment of a chain.
fn assigned_name(target: &Expr) -> Option<&str> {
    match &target.kind {
        ExprKind::SingleVariable(var) => Some(&var.name),
        ExprKind::VariableRef { path, .. } => path.last().map(|v| v.name.as_str()),
        _ => None,
    }
}
