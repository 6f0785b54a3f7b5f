//! gmlc compiler: tokens -> stack-machine assembly.
//!
//! [`Compiler`] runs the whole pipeline for one script: preprocessing and
//! parsing, optimization (or accessor lowering alone when optimization is
//! off) and assembly writing. All mutable state lives in values created per
//! call, so a single `Compiler` can serve any number of threads.

mod builder;
mod context;
mod expr;
mod variable;
pub mod writer;

use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use gmlc_asm::Assembly;
use gmlc_parser::ParseOptions;
use gmlc_syntax::error::{Error, Result};
use gmlc_syntax::{Diagnostic, Registrar, SymbolTable, Token};

pub use writer::{Writer, Written, RETURN_TEMP};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Run the optimizer. Accessors are lowered either way.
    pub optimize: bool,
    /// Accept GameMaker Studio 2 syntax.
    pub gms2: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { optimize: true, gms2: true }
    }
}

impl CompileOptions {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| Error::Json { what: "compile options", source })
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions { gms2: self.gms2 }
    }
}

#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// `None` when parsing failed; otherwise possibly partial.
    pub assembly: Option<Assembly>,
    pub diagnostics: Vec<Diagnostic>,
    pub argument_count: usize,
    /// Declared locals in slot order.
    pub locals: Vec<String>,
}

impl CompileOutput {
    pub fn succeeded(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The assembly as text, one line per instruction.
    pub fn text(&self) -> Option<String> {
        self.assembly.as_ref().map(|asm| asm.to_string())
    }
}

pub struct Compiler<'a> {
    symbols: &'a dyn SymbolTable,
    options: CompileOptions,
}

impl<'a> Compiler<'a> {
    pub fn new(symbols: &'a dyn SymbolTable, options: CompileOptions) -> Self {
        Self { symbols, options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn compile(&self, tokens: Vec<Token>) -> CompileOutput {
        self.run(tokens, None)
    }

    /// Like [`compile`](Self::compile), notifying `registrar` about the user
    /// variables, functions and locals the script touches.
    pub fn compile_with(&self, tokens: Vec<Token>, registrar: &mut dyn Registrar) -> CompileOutput {
        self.run(tokens, Some(registrar))
    }

    fn run(&self, tokens: Vec<Token>, registrar: Option<&mut dyn Registrar>) -> CompileOutput {
        let span = info_span!("compile", tokens = tokens.len(), optimize = self.options.optimize);
        let _enter = span.enter();

        let parsed = match gmlc_parser::parse(tokens, self.symbols, &self.options.parse_options()) {
            Ok(parsed) => parsed,
            Err(diagnostics) => {
                debug!(diagnostics = diagnostics.len(), "parse failed");
                return CompileOutput { assembly: None, diagnostics, argument_count: 0, locals: Vec::new() };
            }
        };

        let (root, mut diagnostics) = if self.options.optimize {
            gmlc_optimizer::optimize(&parsed.root, self.symbols)
        } else {
            gmlc_optimizer::desugar(&parsed.root, self.symbols)
        };

        let mut writer = Writer::new(self.symbols).with_declarations(parsed.locals, parsed.globals);
        if let Some(registrar) = registrar {
            writer = writer.with_registrar(registrar);
        }
        let written = writer.write(&root);
        diagnostics.extend(written.diagnostics);
        debug!(diagnostics = diagnostics.len(), locals = written.locals.len(), "compiled script");

        CompileOutput {
            assembly: Some(written.assembly),
            diagnostics,
            argument_count: parsed.argument_count,
            locals: written.locals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmlc_syntax::notation::read_words;
    use gmlc_syntax::{BuiltinTable, Scope, SymbolLog};

    fn compile_src(src: &str, options: CompileOptions) -> CompileOutput {
        let symbols = BuiltinTable::standard();
        let tokens = read_words(src).expect("Reading tokens should succeed");
        Compiler::new(&symbols, options).compile(tokens)
    }

    fn lines(src: &str) -> Vec<String> {
        let out = compile_src(src, CompileOptions::default());
        assert!(out.succeeded(), "unexpected diagnostics: {:?}", out.diagnostics);
        out.assembly.expect("assembly").to_lines()
    }

    fn messages(src: &str) -> Vec<String> {
        compile_src(src, CompileOptions::default()).diagnostics.into_iter().map(|d| d.message).collect()
    }

    #[test]
    fn test_constants_fold_before_writing() {
        assert_eq!(lines("a = 1 + 2 ;"), [".localvar 0 arguments", "pushi.e 3", "pop.v.i self.a"]);
    }

    #[test]
    fn test_no_optimize_keeps_arithmetic() {
        let options = CompileOptions { optimize: false, ..CompileOptions::default() };
        let out = compile_src("a = 1 + 2 ;", options);
        assert!(out.succeeded());
        assert_eq!(
            out.assembly.expect("assembly").to_lines(),
            [".localvar 0 arguments", "pushi.e 1", "pushi.e 2", "add.i.i", "pop.v.i self.a"]
        );
    }

    #[test]
    fn test_while_names_only_targeted_labels() {
        assert_eq!(
            lines("while ( x < 3 ) { x += 1 ; }"),
            [
                ".localvar 0 arguments",
                "l_0: push.v self.x",
                "pushi.e 3",
                "cmp.i.v LT",
                "bf func_end",
                "push.v self.x",
                "pushi.e 1",
                "add.i.v",
                "pop.v.v self.x",
                "b l_0",
            ]
        );
    }

    #[test]
    fn test_repeat_keeps_counter_on_stack() {
        assert_eq!(
            lines("repeat ( 3 ) { a = 1 ; }"),
            [
                ".localvar 0 arguments",
                "pushi.e 3",
                "dup.i 0",
                "push.i 0",
                "cmp.i.i LTE",
                "bt l_1",
                "l_0: pushi.e 1",
                "pop.v.i self.a",
                "push.i 1",
                "sub.i.i",
                "dup.i 0",
                "conv.i.b",
                "bt l_0",
                "l_1: popz.i",
            ]
        );
    }

    #[test]
    fn test_return_inside_with_unwinds_before_ret() {
        assert_eq!(
            lines("with ( 100 ) { return 5 ; }"),
            [
                ".localvar 0 arguments",
                ".localvar 1 $$$$temp$$$$ 1",
                "pushi.e 100",
                "pushenv l_1",
                "l_0: pushi.e 5",
                "conv.i.v",
                "pop.v.v local.$$$$temp$$$$",
                "popenv [drop]",
                "push.v local.$$$$temp$$$$",
                "ret.v",
                "l_1: popenv l_0",
            ]
        );
    }

    #[test]
    fn test_compound_array_assignment_duplicates_address() {
        assert_eq!(
            lines("a [ 0 ] += 2 ;"),
            [
                ".localvar 0 arguments",
                "pushi.e -1",
                "pushi.e 0",
                "dup.i 1",
                "push.v [array]a",
                "pushi.e 2",
                "add.i.v",
                "pop.i.v [array]a",
            ]
        );
    }

    #[test]
    fn test_chain_store_converts_head() {
        assert_eq!(
            lines("a . b = 1 ;"),
            [".localvar 0 arguments", "pushi.e 1", "push.v self.a", "conv.v.i", "pop.v.i [stacktop]b"]
        );
    }

    #[test]
    fn test_increment_statement() {
        assert_eq!(
            lines("a ++ ;"),
            [".localvar 0 arguments", "push.v self.a", "push.e 1", "add.i.v", "pop.v.v self.a"]
        );
    }

    #[test]
    fn test_and_branches_to_a_shared_false() {
        assert_eq!(
            lines("a = b && c ;"),
            [
                ".localvar 0 arguments",
                "push.v self.b",
                "conv.v.b",
                "bf l_0",
                "push.v self.c",
                "conv.v.b",
                "b l_1",
                "l_0: push.e 0",
                "l_1: pop.v.b self.a",
            ]
        );
    }

    #[test]
    fn test_or_branches_to_a_shared_true() {
        assert_eq!(
            lines("a = b || c ;"),
            [
                ".localvar 0 arguments",
                "push.v self.b",
                "conv.v.b",
                "bt l_0",
                "push.v self.c",
                "conv.v.b",
                "b l_1",
                "l_0: push.e 1",
                "l_1: pop.v.b self.a",
            ]
        );
    }

    #[test]
    fn test_conditional_converts_both_branches() {
        assert_eq!(
            lines("a = b ? 1 : 2 ;"),
            [
                ".localvar 0 arguments",
                "push.v self.b",
                "conv.v.b",
                "bf l_0",
                "pushi.e 1",
                "conv.i.v",
                "b l_1",
                "l_0: pushi.e 2",
                "conv.i.v",
                "l_1: pop.v.v self.a",
            ]
        );
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(
            lines("a = ! b ;"),
            [".localvar 0 arguments", "push.v self.b", "conv.v.b", "not.b", "pop.v.b self.a"]
        );
        assert_eq!(
            lines("a = ~ b ;"),
            [".localvar 0 arguments", "push.v self.b", "conv.v.i", "not.i", "pop.v.i self.a"]
        );
        assert_eq!(lines("a = - b ;"), [".localvar 0 arguments", "push.v self.b", "neg.v", "pop.v.v self.a"]);
    }

    #[test]
    fn test_negating_strings_is_reported() {
        assert_eq!(messages("a = ! \"x\" ;"), ["Cannot logically negate a string."]);
        assert_eq!(messages("a = ~ \"x\" ;"), ["Cannot bitwise negate a string."]);
        assert_eq!(messages("a = - \"x\" ;"), ["Cannot negate a string."]);
    }

    #[test]
    fn test_call_pushes_arguments_last_to_first() {
        assert_eq!(
            lines("foo ( a , 2 ) ;"),
            [
                ".localvar 0 arguments",
                "pushi.e 2",
                "conv.i.v",
                "push.v self.a",
                "call.i foo(argc=2)",
                "popz.v",
            ]
        );
    }

    #[test]
    fn test_constants_pick_the_narrowest_push() {
        assert_eq!(lines("a = 7 ;"), [".localvar 0 arguments", "pushi.e 7", "pop.v.i self.a"]);
        assert_eq!(lines("a = 40000 ;"), [".localvar 0 arguments", "push.i 40000", "pop.v.i self.a"]);
        assert_eq!(lines("a = 5000000000 ;"), [".localvar 0 arguments", "push.l 5000000000", "pop.v.l self.a"]);
        assert_eq!(lines("a = 2.5 ;"), [".localvar 0 arguments", "push.d 2.5", "pop.v.d self.a"]);
        assert_eq!(lines("a = 1e300 ;"), [".localvar 0 arguments", "push.d 1E+300", "pop.v.d self.a"]);
        assert_eq!(lines("a = \"hi\" ;"), [".localvar 0 arguments", "push.s \"hi\"", "pop.v.s self.a"]);
    }

    #[test]
    fn test_break_in_a_loop_inside_a_switch_leaves_the_loop() {
        assert_eq!(
            lines("switch ( a ) { case 1 : while ( x ) { break ; } break ; }"),
            [
                ".localvar 0 arguments",
                "push.v self.a",
                "dup.v 0",
                "pushi.e 1",
                "cmp.i.v EQ",
                "bt l_0",
                "b l_2",
                "l_0: push.v self.x",
                "conv.v.b",
                "bf l_1",
                "b l_1",
                "b l_0",
                "l_1: b l_2",
                "l_2: popz.v",
            ]
        );
    }

    #[test]
    fn test_locals_are_declared_in_order() {
        let out = compile_src("var i , j ; i = 1 ; j = i ;", CompileOptions::default());
        assert!(out.succeeded());
        assert_eq!(out.locals, ["i", "j"]);
        let asm = out.assembly.expect("assembly").to_lines();
        assert_eq!(asm[1], ".localvar 1 i 1");
        assert_eq!(asm[2], ".localvar 2 j 2");
        assert!(asm.contains(&"pushloc.v local.i".to_string()));
        assert!(asm.contains(&"pop.v.v local.j".to_string()));
    }

    #[test]
    fn test_break_outside_loop_is_reported() {
        let out = compile_src("break ;", CompileOptions::default());
        assert!(!out.succeeded());
        assert_eq!(out.diagnostics[0].message, "Break statement placed outside of any loops.");
        let asm = out.assembly.expect("assembly");
        assert_eq!(asm.comments().collect::<Vec<_>>(), ["Break statement placed outside of any loops."]);
    }

    #[test]
    fn test_duplicate_case_reports_both_locations() {
        let messages = messages("switch ( a ) { case 1 : b = 1 ; break ; case 1 : break ; }");
        assert_eq!(messages, ["Found duplicate case statement.", "First occurrence:"]);
    }

    #[test]
    fn test_division_by_constant_zero() {
        let out = compile_src("a = 5 / 0 ;", CompileOptions::default());
        assert!(!out.succeeded());
        assert!(out.assembly.is_some());
        assert_eq!(out.diagnostics[0].message, "Division by zero.");
    }

    #[test]
    fn test_parse_failure_has_no_assembly() {
        let out = compile_src("a = ;", CompileOptions::default());
        assert!(out.assembly.is_none());
        assert!(!out.diagnostics.is_empty());
    }

    #[test]
    fn test_registrar_sees_user_symbols() {
        let symbols = BuiltinTable::standard();
        let tokens = read_words("var i ; i = foo ( bar ) ; global . g = 1 ; score = 2 ;").expect("tokens");
        let mut log = SymbolLog::default();
        let out = Compiler::new(&symbols, CompileOptions::default()).compile_with(tokens, &mut log);
        assert!(out.succeeded(), "unexpected diagnostics: {:?}", out.diagnostics);
        assert_eq!(log.functions, ["foo"]);
        assert_eq!(
            log.variables,
            [("bar".to_string(), Scope::Own, false), ("g".to_string(), Scope::Global, false)]
        );
        assert_eq!(log.locals, ["i"]);
    }

    #[test]
    fn test_recompiling_is_independent() {
        let first = lines("while ( x < 3 ) { x += 1 ; }");
        let _ = compile_src("switch ( a ) { case 1 : break ; }", CompileOptions::default());
        assert_eq!(lines("while ( x < 3 ) { x += 1 ; }"), first);
    }

    #[test]
    fn test_parallel_compiles_share_one_table() {
        let symbols = BuiltinTable::standard();
        let compiler = Compiler::new(&symbols, CompileOptions::default());
        let src = "var i ; for ( i = 0 ; i < 10 ; i ++ ) { if ( i == 5 ) continue ; a [ i ] = i * 2 ; }";
        let expected = compiler.compile(read_words(src).expect("tokens")).text();

        let results: Vec<Option<String>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| compiler.compile(read_words(src).expect("tokens")).text()))
                .collect();
            handles.into_iter().map(|h| h.join().expect("compile thread")).collect()
        });
        for result in results {
            assert_eq!(result, expected);
        }
    }

    #[test]
    fn test_options_from_json() {
        let options = CompileOptions::from_json(r#"{ "optimize": false }"#).expect("options");
        assert_eq!(options, CompileOptions { optimize: false, gms2: true });
        assert!(CompileOptions::from_json("[").is_err());
    }
}
