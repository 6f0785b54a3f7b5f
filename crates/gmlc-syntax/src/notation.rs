//! Token interchange formats.
//!
//! The compiler consumes tokens, not source text. These readers turn a
//! stored token stream back into [`Token`]s:
//!
//! - [`read_json`]: a JSON array of serialized tokens.
//! - [`read_words`]: one token per whitespace-separated word. Keywords and
//!   operators are spelled as in GML, numbers and identifiers as themselves,
//!   and strings are double-quoted (they may contain spaces but no escapes).
//!
//! ```rust
//! use gmlc_syntax::notation::read_words;
//! use gmlc_syntax::TokenKind;
//!
//! let tokens = read_words("x += \"a b\" ;").unwrap();
//! let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
//! assert_eq!(
//!     kinds,
//!     [TokenKind::Identifier, TokenKind::AssignPlus, TokenKind::String, TokenKind::EndStatement, TokenKind::Eof]
//! );
//! assert_eq!(tokens[2].text.as_deref(), Some("a b"));
//! ```

use crate::error::{Error, Result};
use crate::token::{Location, Token, TokenKind};

pub fn read_json(text: &str) -> Result<Vec<Token>> {
    let mut tokens: Vec<Token> =
        serde_json::from_str(text).map_err(|source| Error::Json { what: "token stream", source })?;
    if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
        tokens.push(Token::bare(TokenKind::Eof));
    }
    Ok(tokens)
}

pub fn read_words(src: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();
    let (mut line, mut col) = (1usize, 1usize);

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
            continue;
        }

        let start = Location::new(line, col);
        if c == '"' {
            chars.next();
            col += 1;
            let mut text = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '\n' {
                    line += 1;
                    col = 1;
                } else {
                    col += 1;
                }
                if ch == '"' {
                    closed = true;
                    break;
                }
                text.push(ch);
            }
            if !closed {
                return Err(Error::UnterminatedString { line: start.line, column: start.column });
            }
            tokens.push(Token::new(TokenKind::String, text).at(start));
            continue;
        }

        let mut word = String::new();
        while let Some(&ch) = chars.peek() {
            if ch.is_whitespace() {
                break;
            }
            word.push(ch);
            chars.next();
            col += 1;
        }
        let kind = classify(&word).ok_or_else(|| Error::UnknownWord {
            word: word.clone(),
            line: start.line,
            column: start.column,
        })?;
        tokens.push(Token::new(kind, word).at(start));
    }

    tokens.push(Token::bare(TokenKind::Eof).at(Location::new(line, col)));
    Ok(tokens)
}

fn classify(word: &str) -> Option<TokenKind> {
    use TokenKind::*;
    let kind = match word {
        "{" | "begin" => OpenBlock,
        "}" | "end" => CloseBlock,
        "(" => OpenParen,
        ")" => CloseParen,
        "[" => OpenArray,
        "[?" => OpenArrayMap,
        "[|" => OpenArrayList,
        "[#" => OpenArrayGrid,
        "[@" => OpenArrayBaseArray,
        "]" => CloseArray,
        "," => Comma,
        "." => Dot,
        ":" => Colon,
        ";" => EndStatement,
        "?" => Conditional,
        "var" => KeywordVar,
        "globalvar" => KeywordGlobalVar,
        "if" => KeywordIf,
        "then" => KeywordThen,
        "else" => KeywordElse,
        "while" => KeywordWhile,
        "do" => KeywordDo,
        "until" => KeywordUntil,
        "repeat" => KeywordRepeat,
        "for" => KeywordFor,
        "switch" => KeywordSwitch,
        "case" => KeywordCase,
        "default" => KeywordDefault,
        "with" => KeywordWith,
        "break" => KeywordBreak,
        "continue" => KeywordContinue,
        "return" => KeywordReturn,
        "exit" => KeywordExit,
        "struct" => KeywordStruct,
        "enum" => Enum,
        "=" => Assign,
        "+=" => AssignPlus,
        "-=" => AssignMinus,
        "*=" => AssignTimes,
        "/=" => AssignDivide,
        "%=" => AssignMod,
        "&=" => AssignAnd,
        "|=" => AssignOr,
        "^=" => AssignXor,
        "&&" | "and" => LogicalAnd,
        "||" | "or" => LogicalOr,
        "^^" | "xor" => LogicalXor,
        "!" | "not" => Not,
        "~" => BitwiseNegate,
        "&" => BitwiseAnd,
        "|" => BitwiseOr,
        "^" => BitwiseXor,
        "<<" => BitwiseShiftLeft,
        ">>" => BitwiseShiftRight,
        "==" => CompareEqual,
        "!=" | "<>" => CompareNotEqual,
        "<" => CompareLess,
        "<=" => CompareLessEqual,
        ">" => CompareGreater,
        ">=" => CompareGreaterEqual,
        "+" => Plus,
        "-" => Minus,
        "*" => Times,
        "/" => Divide,
        "div" => Div,
        "%" | "mod" => Mod,
        "++" => Increment,
        "--" => Decrement,
        _ => return classify_literal(word),
    };
    Some(kind)
}

fn classify_literal(word: &str) -> Option<TokenKind> {
    let first = word.chars().next()?;
    if first.is_ascii_digit() || first == '$' || (first == '.' && word.len() > 1) {
        return Some(TokenKind::Number);
    }
    if (first.is_alphabetic() || first == '_') && word.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Some(TokenKind::Identifier);
    }
    None
}
