//! Errors for the tooling around the compiler core.
//!
//! The compiler itself reports problems in user code as
//! [`Diagnostic`](crate::Diagnostic)s. The [`Error`] type here covers the
//! things that stop a tool from even starting a compile: unreadable files,
//! malformed token or symbol-table documents, unknown token notation.
//!
//! ```rust
//! use gmlc_syntax::error::Error;
//! use gmlc_syntax::notation::read_words;
//!
//! let err = read_words("x = 1 @ 2 ;").unwrap_err();
//! assert!(matches!(err, Error::UnknownWord { ref word, .. } if word == "@"));
//! ```

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {what}: {source}")]
    Json {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown token `{word}` at line {line}, column {column}")]
    UnknownWord { word: String, line: usize, column: usize },

    #[error("unterminated string starting at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

