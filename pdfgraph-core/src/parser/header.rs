//! PDF Header Parser
//!
//! Parses PDF header and version according to ISO 32000-1 Section 7.5.2

use super::cursor::ByteCursor;
use super::lexer::{self, read_unsigned};
use super::{ParseError, ParseResult};

/// Producers sometimes prepend junk before `%PDF-`; this is how far we look.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// PDF Version information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    /// Create a new PDF version
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Check if this version is supported
    pub fn is_supported(&self) -> bool {
        matches!((self.major, self.minor), (1, 0..=7) | (2, 0))
    }
}

impl Default for PdfVersion {
    fn default() -> Self {
        Self::new(1, 7)
    }
}

impl std::fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// PDF Header information
#[derive(Debug, Clone, PartialEq)]
pub struct PdfHeader {
    pub version: PdfVersion,
    /// Offset of the `%` of `%PDF-`.
    pub offset: usize,
    pub has_binary_marker: bool,
}

impl PdfHeader {
    /// Parses the version line and leaves the cursor after any comment lines
    /// that follow it (the binary marker among them).
    pub fn parse(cursor: &mut ByteCursor<'_>) -> ParseResult<Self> {
        if cursor.is_empty() {
            return Err(ParseError::EmptyFile);
        }
        let window = cursor.len().min(HEADER_SEARCH_WINDOW);
        let offset = cursor
            .find_from(b"%PDF-", 0)
            .filter(|&offset| offset < window)
            .ok_or(ParseError::InvalidHeader)?;
        cursor.move_to(offset + b"%PDF-".len());

        let major = read_unsigned(cursor).ok_or(ParseError::InvalidHeader)?;
        if !cursor.eat(b".") {
            return Err(ParseError::InvalidHeader);
        }
        let minor = read_unsigned(cursor).ok_or(ParseError::InvalidHeader)?;
        let version = PdfVersion::new(
            u8::try_from(major).map_err(|_| ParseError::InvalidHeader)?,
            u8::try_from(minor).map_err(|_| ParseError::InvalidHeader)?,
        );
        if !version.is_supported() {
            tracing::warn!("PDF version {version} is not a known version, parsing anyway");
        }

        lexer::skip_line(cursor);
        let has_binary_marker = Self::skip_header_comments(cursor);

        Ok(PdfHeader {
            version,
            offset,
            has_binary_marker,
        })
    }

    /// Skips comment lines after the version line. Producers disagree on the
    /// exact shape of the binary marker, so any comment containing a byte
    /// >= 128 counts.
    fn skip_header_comments(cursor: &mut ByteCursor<'_>) -> bool {
        let mut has_binary_marker = false;
        loop {
            lexer::skip_whitespace(cursor);
            if cursor.peek() != Some(b'%') {
                break;
            }
            let start = cursor.offset();
            lexer::skip_comment(cursor);
            if cursor.slice(start, cursor.offset()).iter().any(|&b| b >= 128) {
                has_binary_marker = true;
            }
        }
        has_binary_marker
    }
}
