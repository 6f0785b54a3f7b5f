pub mod expr;
pub mod parser;
pub mod preprocess;

pub use parser::{ParseOptions, Parsed, Parser};

use gmlc_syntax::{Diagnostic, SymbolTable, Token};

/// Preprocesses and parses a token stream into a statement tree.
pub fn parse(tokens: Vec<Token>, symbols: &dyn SymbolTable, options: &ParseOptions) -> Result<Parsed, Vec<Diagnostic>> {
    Parser::new(tokens, symbols, *options).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmlc_syntax::notation::read_words;
    use gmlc_syntax::*;

    fn parse_with(input: &str, options: ParseOptions) -> std::result::Result<Parsed, Vec<Diagnostic>> {
        let tokens = read_words(input).expect("Reading tokens should succeed");
        parse(tokens, &BuiltinTable::standard(), &options)
    }

    fn parse_program_str(input: &str) -> Parsed {
        parse_with(input, ParseOptions::default()).expect("Parsing should succeed")
    }

    fn parse_errors(input: &str) -> Vec<String> {
        parse_with(input, ParseOptions::default())
            .expect_err("Parsing should fail")
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    fn statements(input: &str) -> Vec<Stmt> {
        match parse_program_str(input).root.kind {
            StmtKind::Block(body) => body,
            other => panic!("Expected Block, got {:?}", other),
        }
    }

    /// The value of `x = <input> ;`.
    fn parse_expr_str(input: &str) -> Expr {
        let mut body = statements(&format!("x = {} ;", input));
        match body.remove(0).kind {
            StmtKind::Assign { value, .. } => value,
            other => panic!("Expected Assign, got {:?}", other),
        }
    }

    fn number(value: f64) -> Constant {
        Constant::number(value)
    }

    #[test]
    fn test_operator_precedence() {
        let expr = parse_expr_str("1 + 2 * 3");
        if let ExprKind::Binary { first, rest } = expr.kind {
            assert_eq!(first.as_constant(), Some(&number(1.0)));
            assert_eq!(rest.len(), 1);
            assert_eq!(rest[0].0, BinaryOp::Add);
            assert!(matches!(&rest[0].1.kind, ExprKind::Binary { rest, .. } if rest[0].0 == BinaryOp::Mul));
        } else {
            panic!("Expected Binary");
        }
    }

    #[test]
    fn test_mixed_operators_keep_their_order() {
        let expr = parse_expr_str("a - b + c");
        if let ExprKind::Binary { rest, .. } = expr.kind {
            let ops: Vec<_> = rest.iter().map(|(op, _)| *op).collect();
            assert_eq!(ops, [BinaryOp::Sub, BinaryOp::Add]);
        } else {
            panic!("Expected Binary");
        }
    }

    #[test]
    fn test_logical_chains() {
        assert!(matches!(
            parse_expr_str("a && b && c").kind,
            ExprKind::Logical { op: LogicalOp::And, ref operands } if operands.len() == 3
        ));
        assert!(matches!(
            parse_expr_str("a || b && c").kind,
            ExprKind::Logical { op: LogicalOp::Or, ref operands } if operands.len() == 2
        ));
    }

    #[test]
    fn test_legacy_assign_compares() {
        let body = statements("if a = 1 then b = 2 ;");
        assert!(matches!(
            &body[0].kind,
            StmtKind::If { condition, else_branch: None, .. }
                if matches!(&condition.kind, ExprKind::Binary { rest, .. } if rest[0].0 == BinaryOp::Eq)
        ));
    }

    #[test]
    fn test_conditional_operator() {
        assert!(matches!(parse_expr_str("a ? 1 : 2").kind, ExprKind::Conditional { .. }));
        let errors = parse_with("x = a ? 1 : 2 ;", ParseOptions { gms2: false })
            .expect_err("Parsing should fail")
            .into_iter()
            .map(|d| d.message)
            .collect::<Vec<_>>();
        assert_eq!(errors, ["Attempt to use conditional operator in GameMaker version earlier than 2."]);
    }

    #[test]
    fn test_unary_and_literals() {
        assert!(matches!(parse_expr_str("- a").kind, ExprKind::Unary { op: UnaryOp::Negate, .. }));
        assert!(matches!(parse_expr_str("! a").kind, ExprKind::Unary { op: UnaryOp::Not, .. }));
        assert_eq!(parse_expr_str("$ff").as_constant(), Some(&number(255.0)));
        assert_eq!(parse_expr_str("\"hi\"").as_constant(), Some(&Constant::String("hi".into())));
        assert_eq!(parse_expr_str("pi").as_constant(), Some(&number(std::f64::consts::PI)));
    }

    #[test]
    fn test_array_literal_becomes_call() {
        if let ExprKind::Call(call) = parse_expr_str("[ 1 , 2 , 3 ]").kind {
            assert_eq!(call.name, "@@NewGMLArray@@");
            assert_eq!(call.args.len(), 3);
        } else {
            panic!("Expected Call");
        }
    }

    #[test]
    fn test_constant_head_sets_scope() {
        let body = statements("global . score = 1 ; 5 . y = 2 ;");
        assert!(matches!(
            &body[0].kind,
            StmtKind::Assign { target, .. }
                if matches!(&target.kind, ExprKind::SingleVariable(v) if v.name == "score" && v.scope == Some(Scope::Global))
        ));
        assert!(matches!(
            &body[1].kind,
            StmtKind::Assign { target, .. }
                if matches!(&target.kind, ExprKind::SingleVariable(v) if v.scope == Some(Scope::Instance(5)))
        ));
    }

    #[test]
    fn test_variable_chain() {
        let body = statements("a . b [ 0 ] = 1 ;");
        if let StmtKind::Assign { target, op, .. } = &body[0].kind {
            assert_eq!(*op, AssignOp::Set);
            if let ExprKind::VariableRef { head, path } = &target.kind {
                assert!(matches!(&head.kind, ExprKind::SingleVariable(v) if v.name == "a"));
                assert_eq!(path.len(), 1);
                assert!(path[0].index.is_some());
            } else {
                panic!("Expected VariableRef");
            }
        } else {
            panic!("Expected Assign");
        }
    }

    #[test]
    fn test_builtin_arrays_get_implicit_index() {
        if let ExprKind::SingleVariable(var) = parse_expr_str("view_xview").kind {
            let index = var.index.expect("implicit index");
            assert_eq!(index.accessor, Accessor::Array);
            assert_eq!(index.dims[0].as_constant(), Some(&Constant::Int64(0)));
        } else {
            panic!("Expected SingleVariable");
        }
    }

    #[test]
    fn test_declarations_are_recorded() {
        let parsed = parse_program_str("var i = 0 , j ; globalvar g ; argument2 = 1 ;");
        assert_eq!(parsed.locals.iter().collect::<Vec<_>>(), ["i", "j"]);
        assert_eq!(parsed.globals.iter().collect::<Vec<_>>(), ["g"]);
        assert_eq!(parsed.argument_count, 3);
    }

    #[test]
    fn test_for_with_empty_clauses() {
        let body = statements("for ( ; ; ) { break ; }");
        if let StmtKind::For { init, condition, step, body } = &body[0].kind {
            assert!(matches!(&init.kind, StmtKind::Block(b) if b.is_empty()));
            assert_eq!(condition.as_constant(), Some(&Constant::Int64(1)));
            assert!(matches!(&step.kind, StmtKind::Block(b) if b.is_empty()));
            assert!(matches!(&body.kind, StmtKind::Block(b) if b.len() == 1));
        } else {
            panic!("Expected For");
        }
    }

    #[test]
    fn test_for_with_clauses() {
        let body = statements("for ( i = 0 ; i < 10 ; i += 1 ) a = i ;");
        assert!(matches!(
            &body[0].kind,
            StmtKind::For { init, step, .. }
                if matches!(init.kind, StmtKind::Assign { op: AssignOp::Set, .. })
                    && matches!(step.kind, StmtKind::Assign { op: AssignOp::Add, .. })
        ));
    }

    #[test]
    fn test_switch_body_is_flat() {
        let body = statements("switch x { case 1 : a = 1 ; break ; default : a = 2 ; }");
        if let StmtKind::Switch { body, .. } = &body[0].kind {
            let kinds: Vec<_> = body
                .iter()
                .map(|s| match s.kind {
                    StmtKind::Case(_) => "case",
                    StmtKind::Default => "default",
                    StmtKind::Break => "break",
                    StmtKind::Assign { .. } => "assign",
                    _ => "other",
                })
                .collect();
            assert_eq!(kinds, ["case", "assign", "break", "default", "assign"]);
        } else {
            panic!("Expected Switch");
        }
    }

    #[test]
    fn test_loops_and_optional_keywords() {
        let body = statements(
            "while a do a -= 1 ; do { a ++ ; } until a > 3 ; repeat 3 b = 1 ; with other x = 1 ; exit ;",
        );
        assert!(matches!(body[0].kind, StmtKind::While { .. }));
        assert!(matches!(body[1].kind, StmtKind::DoUntil { .. }));
        assert!(matches!(body[2].kind, StmtKind::Repeat { .. }));
        assert!(matches!(body[3].kind, StmtKind::With { .. }));
        assert!(matches!(body[4].kind, StmtKind::Exit));
    }

    #[test]
    fn test_return_value_is_optional() {
        let body = statements("if a { return ; } return a + 1 ;");
        assert!(matches!(
            &body[0].kind,
            StmtKind::If { then_branch, .. }
                if matches!(&then_branch.kind, StmtKind::Block(b) if matches!(b[0].kind, StmtKind::Return(None)))
        ));
        assert!(matches!(body[1].kind, StmtKind::Return(Some(_))));
        assert!(matches!(statements("{ return }")[0].kind, StmtKind::Block(ref b) if matches!(b[0].kind, StmtKind::Return(None))));
    }

    #[test]
    fn test_increment_statements() {
        let body = statements("a ++ ; -- b ;");
        assert!(matches!(&body[0].kind, StmtKind::IncDec(inc) if inc.increment && inc.postfix));
        assert!(matches!(&body[1].kind, StmtKind::IncDec(inc) if !inc.increment && !inc.postfix));
    }

    #[test]
    fn test_recovery_reports_each_statement() {
        let errors = parse_errors("x = ; if y then z = ) ; w = 1 ;");
        assert_eq!(errors, ["Unexpected token in expression.", "Unexpected token in expression."]);
    }

    #[test]
    fn test_semantic_errors() {
        assert_eq!(parse_errors("id = 3 ;"), ["Attempt to set a read-only variable."]);
        assert_eq!(parse_errors("show_message ( 1 , 2 ) ;"), ["Function show_message expects 1 arguments, got 2."]);
        assert_eq!(parse_errors("var x ;"), ["Redeclaration of builtin variable."]);
        assert_eq!(
            parse_errors("var show_message ;"),
            ["Variable name show_message cannot be used; a function or script already has the name."]
        );
        assert_eq!(
            parse_errors("case 1 : a = 1 ;"),
            ["Case and default labels must appear directly inside a switch statement."]
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(parse_errors("enum e { a } ;")[0], "Enums are not currently supported.");
        assert_eq!(parse_errors("a + 1 ;"), ["Expected assignment operator."]);
        assert_eq!(parse_errors("x = { } ;"), ["Unsupported syntax."]);
        assert_eq!(
            parse_errors("f ( 1 2 ) ;"),
            ["Expected ',' or ')' after argument in function call."]
        );
        assert_eq!(
            parse_errors("x = [ 1 2 ] ;"),
            ["Expected ',' or ']' after value in inline array."]
        );
    }

    #[test]
    fn test_string_indices_need_a_map() {
        assert_eq!(
            parse_errors("a [ \"k\" ] = 1 ;"),
            ["Strings cannot be used for array indices, unless in a map accessor."]
        );
        let body = statements("m [? \"k\" ] = 1 ;");
        assert!(matches!(
            &body[0].kind,
            StmtKind::Assign { target, .. }
                if matches!(&target.kind, ExprKind::SingleVariable(v) if v.index.as_ref().is_some_and(|i| i.accessor == Accessor::Map))
        ));
    }

    #[test]
    fn test_diagnostics_carry_locations() {
        let errors = parse_with("a = 1 ;\nid = 2 ;", ParseOptions::default()).expect_err("Parsing should fail");
        assert_eq!(errors[0].location, Some(Location::new(2, 1)));
        assert_eq!(errors[0].kind, DiagnosticKind::Semantic);
    }
}
