//! Positional reader over the raw bytes of a file.

use super::ParseError;

/// Location of a byte, for diagnostics. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// Saved cursor state, restored with [`ByteCursor::restore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn done(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    pub fn move_to(&mut self, offset: usize) {
        self.offset = offset.min(self.bytes.len());
    }

    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.offset).copied()
    }

    pub fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.offset + ahead).copied()
    }

    pub fn next(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.offset += 1;
        Some(byte)
    }

    pub fn advance(&mut self, count: usize) {
        self.move_to(self.offset.saturating_add(count));
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.offset)
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.offset = checkpoint.0;
    }

    /// Bytes from the current offset to the end.
    pub fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.offset.min(self.bytes.len())..]
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        let end = end.min(self.bytes.len());
        &self.bytes[start.min(end)..end]
    }

    /// True when the bytes at the current offset equal `keyword`.
    pub fn matches(&self, keyword: &[u8]) -> bool {
        self.remaining().starts_with(keyword)
    }

    /// Consumes `keyword` if it is next.
    pub fn eat(&mut self, keyword: &[u8]) -> bool {
        if self.matches(keyword) {
            self.offset += keyword.len();
            true
        } else {
            false
        }
    }

    /// Offset of the next occurrence of `needle` at or after `from`.
    pub fn find_from(&self, needle: &[u8], from: usize) -> Option<usize> {
        if needle.is_empty() || from >= self.bytes.len() {
            return None;
        }
        self.bytes[from..]
            .windows(needle.len())
            .position(|window| window == needle)
            .map(|pos| pos + from)
    }

    /// Offset of the last occurrence of `needle` that starts before `before`.
    pub fn rfind_before(&self, needle: &[u8], before: usize) -> Option<usize> {
        let end = before.min(self.bytes.len());
        if needle.is_empty() || needle.len() > end {
            return None;
        }
        self.bytes[..end]
            .windows(needle.len())
            .rposition(|window| window == needle)
    }

    /// Line and column of the current offset. This walks the input from the
    /// start, so it is meant for reporting, not for the parse loop.
    pub fn position(&self) -> Position {
        self.position_of(self.offset)
    }

    pub fn position_of(&self, offset: usize) -> Position {
        let offset = offset.min(self.bytes.len());
        let mut line = 1;
        let mut line_start = 0;
        let mut i = 0;
        while i < offset {
            match self.bytes[i] {
                b'\n' => {
                    line += 1;
                    line_start = i + 1;
                }
                b'\r' if self.bytes.get(i + 1) != Some(&b'\n') => {
                    line += 1;
                    line_start = i + 1;
                }
                _ => {}
            }
            i += 1;
        }
        Position {
            offset,
            line,
            column: offset - line_start + 1,
        }
    }

    /// Syntax error located at the current offset. Only the offset is
    /// recorded; [`ByteCursor::position_of`] recovers line and column.
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::SyntaxError {
            position: self.offset,
            message: message.into(),
        }
    }
}
