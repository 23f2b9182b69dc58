//! PDF Parser Module
//!
//! Reconstructs an object graph from the bytes of an existing PDF file:
//! header, indirect objects, cross-reference tables and streams, object
//! streams and the trailer chain, with fallback recovery for damaged files.

pub mod content;
pub mod cursor;
pub mod document;
pub mod filters;
pub mod header;
pub mod lexer;
pub mod object_stream;
pub mod objects;
pub mod xref;
pub mod xref_stream;

#[cfg(test)]
pub(crate) mod test_helpers;

use crate::context::Context;

pub use self::cursor::{ByteCursor, Position};
pub use self::document::DocumentParser;
pub use self::header::PdfVersion;
pub use self::objects::ObjectParser;
pub use self::xref::{XRefEntry, XRefTable};

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// PDF Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty file")]
    EmptyFile,

    #[error("Invalid PDF header")]
    InvalidHeader,

    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    #[error("Syntax error at offset {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Unexpected token at offset {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Missing required key: {0}")]
    MissingKey(String),

    #[error("Invalid xref table")]
    InvalidXRef,

    #[error("Invalid trailer")]
    InvalidTrailer,

    #[error("No document catalog could be found")]
    MissingRoot,

    #[error("Stream decode error: {0}")]
    StreamDecodeError(String),

    #[error("Stream starting at offset {0} has no matching endstream")]
    MissingEndstream(usize),

    #[error("Nesting deeper than {0} levels")]
    MaxDepthExceeded(usize),
}

impl ParseError {
    /// Byte offset the error points at, when it has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            ParseError::SyntaxError { position, .. }
            | ParseError::UnexpectedToken { position, .. } => Some(*position),
            ParseError::MissingEndstream(offset) => Some(*offset),
            _ => None,
        }
    }
}

/// Parsing options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Abort on the first object that fails to parse instead of storing an
    /// [`crate::objects::Object::Invalid`] placeholder.
    pub strict: bool,
    /// Maximum nesting of arrays and dictionaries.
    pub max_depth: usize,
    /// Objects parsed between two calls of the yield hook.
    pub objects_per_tick: usize,
    /// Byte budget for each recovery scan (stream end search, garbage skip).
    pub max_recovery_scan: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::lenient()
    }
}

impl ParseOptions {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::lenient()
        }
    }

    pub fn lenient() -> Self {
        Self {
            strict: false,
            max_depth: 500,
            objects_per_tick: 100,
            max_recovery_scan: 64 * 1024 * 1024,
        }
    }
}

/// Parses a complete document with default (lenient) options.
pub fn parse_document(bytes: &[u8]) -> ParseResult<Context> {
    DocumentParser::new(bytes, ParseOptions::default()).parse()
}

/// Parses a complete document with explicit options.
pub fn parse_document_with_options(bytes: &[u8], options: ParseOptions) -> ParseResult<Context> {
    DocumentParser::new(bytes, options).parse()
}
