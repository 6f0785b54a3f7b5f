//! Token definitions shared by the token sources and the parser.
//!
//! gmlc does not lex GML source itself. An external lexer (or one of the
//! interchange formats in [`crate::notation`] and [`crate::Token`]'s serde
//! representation) hands over a flat stream of tokens. The parser's
//! preprocessing step then reclassifies identifiers and literals into the
//! `Proc*` kinds, attaching resolved scopes and constant values.
//!
//! # Examples
//!
//! ```rust
//! use gmlc_syntax::{Location, Token, TokenKind};
//!
//! let ident = Token::new(TokenKind::Identifier, "score").at(Location::new(1, 1));
//! assert_eq!(ident.text.as_deref(), Some("score"));
//! assert!(TokenKind::KeywordWhile.is_keyword());
//! assert!(!TokenKind::Plus.is_keyword());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constant::Constant;
use crate::scope::Scope;

/// Grammar symbols produced by the lexer and by token preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// End of the token stream. Always the last token the parser sees.
    Eof,
    /// A token the lexer could not classify.
    Error,

    // === Punctuation ===
    /// `{` or `begin`
    OpenBlock,
    /// `}` or `end`
    CloseBlock,
    OpenParen,
    CloseParen,
    /// `[`
    OpenArray,
    /// `[?` map accessor
    OpenArrayMap,
    /// `[|` list accessor
    OpenArrayList,
    /// `[#` grid accessor
    OpenArrayGrid,
    /// `[@` base-array accessor
    OpenArrayBaseArray,
    CloseArray,
    Comma,
    Dot,
    Colon,
    /// `;`
    EndStatement,
    /// `?` of the conditional operator
    Conditional,

    // === Keywords ===
    KeywordVar,
    KeywordGlobalVar,
    KeywordIf,
    KeywordThen,
    KeywordElse,
    KeywordWhile,
    KeywordDo,
    KeywordUntil,
    KeywordRepeat,
    KeywordFor,
    KeywordSwitch,
    KeywordCase,
    KeywordDefault,
    KeywordWith,
    KeywordBreak,
    KeywordContinue,
    KeywordReturn,
    KeywordExit,
    KeywordStruct,
    /// `enum`. Recognized only so it can be rejected with a clear message.
    Enum,

    // === Assignment ===
    Assign,
    AssignPlus,
    AssignMinus,
    AssignTimes,
    AssignDivide,
    AssignMod,
    AssignAnd,
    AssignOr,
    AssignXor,

    // === Operators ===
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    Not,
    BitwiseNegate,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseShiftLeft,
    BitwiseShiftRight,
    CompareEqual,
    CompareNotEqual,
    CompareLess,
    CompareLessEqual,
    CompareGreater,
    CompareGreaterEqual,
    Plus,
    Minus,
    Times,
    Divide,
    /// Integer division (`div`)
    Div,
    /// Remainder (`mod` or `%`)
    Mod,
    Increment,
    Decrement,

    // === Lexer literals ===
    Identifier,
    Number,
    String,

    // === Produced by preprocessing ===
    /// An identifier immediately followed by `(`.
    ProcFunction,
    /// A builtin or user variable, optionally with a resolved scope.
    ProcVariable,
    /// A literal or named constant with its value attached.
    ProcConstant,
}

impl TokenKind {
    /// Keywords that may start a statement. Error recovery stops on these.
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            KeywordBreak
                | KeywordCase
                | KeywordContinue
                | KeywordDefault
                | KeywordDo
                | KeywordElse
                | KeywordExit
                | KeywordFor
                | KeywordGlobalVar
                | KeywordIf
                | KeywordRepeat
                | KeywordReturn
                | KeywordStruct
                | KeywordSwitch
                | KeywordThen
                | KeywordUntil
                | KeywordVar
                | KeywordWhile
                | KeywordWith
        )
    }

    pub fn is_accessor_open(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            OpenArray | OpenArrayMap | OpenArrayList | OpenArrayGrid | OpenArrayBaseArray
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A token as handed to the parser.
///
/// `scope` and `constant` are only filled in by preprocessing; a lexer
/// leaves them empty and serialized token files usually omit them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip)]
    pub scope: Option<Scope>,
    #[serde(skip)]
    pub constant: Option<Constant>,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self { kind, text: Some(text.into()), location: None, scope: None, constant: None }
    }

    /// A token without literal text, such as punctuation or `Eof`.
    pub fn bare(kind: TokenKind) -> Self {
        Self { kind, text: None, location: None, scope: None, constant: None }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// The literal text, or an empty string for bare tokens.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}
