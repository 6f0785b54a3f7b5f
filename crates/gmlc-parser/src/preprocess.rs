//! Token reclassification ahead of parsing.
//!
//! Identifiers become function, constant or variable references and
//! literals get their constant value attached, so the parser only ever
//! looks at one token to decide what it is holding.

use gmlc_syntax::{Constant, Diagnostic, Scope, SymbolTable, Token, TokenKind};

/// Highest `argumentN` a script may reference.
const MAX_ARGUMENTS: usize = 16;

#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub tokens: Vec<Token>,
    /// One past the highest `argumentN` referenced.
    pub argument_count: usize,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn preprocess(mut tokens: Vec<Token>, symbols: &dyn SymbolTable) -> Preprocessed {
    if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
        tokens.push(Token::bare(TokenKind::Eof));
    }

    let mut argument_count = 0;
    let mut diagnostics = Vec::new();

    for i in 0..tokens.len() {
        let next = tokens.get(i + 1).map(|t| t.kind);
        let tok = &mut tokens[i];
        match tok.kind {
            TokenKind::Identifier if next == Some(TokenKind::OpenParen) => {
                tok.kind = TokenKind::ProcFunction;
            }
            TokenKind::Identifier => {
                if let Some(value) = symbols.constant(tok.text()) {
                    tok.kind = TokenKind::ProcConstant;
                    tok.constant = Some(Constant::number(value));
                } else {
                    tok.kind = TokenKind::ProcVariable;
                    if symbols.variable(tok.text()).is_some() {
                        tok.scope = Some(Scope::Own);
                    }
                    if let Some(n) = argument_index(tok.text()) {
                        argument_count = argument_count.max(n + 1);
                    }
                }
            }
            TokenKind::Number => {
                let constant = match parse_number(tok.text()) {
                    Ok(c) => c,
                    Err(msg) => {
                        diagnostics.push(Diagnostic::semantic(msg, tok.location));
                        Constant::number(0.0)
                    }
                };
                tok.kind = TokenKind::ProcConstant;
                tok.constant = Some(constant);
            }
            TokenKind::String => {
                tok.kind = TokenKind::ProcConstant;
                tok.constant = Some(Constant::String(tok.text().to_string()));
            }
            _ => {}
        }
    }

    Preprocessed { tokens, argument_count, diagnostics }
}

fn argument_index(name: &str) -> Option<usize> {
    let digits = name.strip_prefix("argument")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|n| *n < MAX_ARGUMENTS)
}

/// Parses a numeric literal. Hex literals (`$ff`, `0xff`) that do not fit
/// in an i32 become Int64 constants.
fn parse_number(text: &str) -> Result<Constant, &'static str> {
    if let Some(hex) = text.strip_prefix('$').or_else(|| text.strip_prefix("0x")) {
        let value = u64::from_str_radix(hex, 16).map_err(|_| "Invalid hex number format.")? as i64;
        return Ok(if i32::try_from(value).is_ok() {
            Constant::number(value as f64)
        } else {
            Constant::Int64(value)
        });
    }
    text.parse::<f64>()
        .map(Constant::number)
        .map_err(|_| "Invalid double number format.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmlc_syntax::notation::read_words;
    use gmlc_syntax::BuiltinTable;

    fn run(src: &str) -> Preprocessed {
        preprocess(read_words(src).unwrap(), &BuiltinTable::standard())
    }

    #[test]
    fn identifiers_are_reclassified() {
        let out = run("foo ( ) pi score mine");
        let kinds: Vec<_> = out.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [
                TokenKind::ProcFunction,
                TokenKind::OpenParen,
                TokenKind::CloseParen,
                TokenKind::ProcConstant,
                TokenKind::ProcVariable,
                TokenKind::ProcVariable,
                TokenKind::Eof
            ]
        );
        assert_eq!(out.tokens[4].scope, Some(Scope::Own));
        assert_eq!(out.tokens[5].scope, None);
    }

    #[test]
    fn hex_literals_pick_a_width() {
        let out = run("$ff 0x100000000 1.5");
        assert_eq!(out.tokens[0].constant, Some(Constant::number(255.0)));
        assert_eq!(out.tokens[1].constant, Some(Constant::Int64(0x1_0000_0000)));
        assert_eq!(out.tokens[2].constant, Some(Constant::number(1.5)));
    }

    #[test]
    fn bad_numbers_are_reported() {
        let out = run("1.2.3 $zz");
        let messages: Vec<_> = out.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["Invalid double number format.", "Invalid hex number format."]);
    }

    #[test]
    fn argument_count_tracks_highest_reference() {
        assert_eq!(run("argument0 argument3 argument1").argument_count, 4);
        assert_eq!(run("argument16 arguments").argument_count, 0);
    }

    #[test]
    fn eof_is_appended_once() {
        let out = preprocess(vec![Token::new(TokenKind::Identifier, "a")], &BuiltinTable::standard());
        assert_eq!(out.tokens.len(), 2);
        assert_eq!(out.tokens[1].kind, TokenKind::Eof);
    }
}
