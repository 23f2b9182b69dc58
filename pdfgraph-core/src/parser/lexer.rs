//! PDF Lexer
//!
//! Token-level readers over a [`ByteCursor`], following ISO 32000-1 Section 7.2.
//! The object parser drives these directly; there is no token buffer, so
//! backtracking is a cursor checkpoint.

use super::cursor::ByteCursor;
use super::ParseResult;

/// Numeric token
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Real(f64),
}

pub fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

pub fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

pub fn is_regular(byte: u8) -> bool {
    !is_whitespace(byte) && !is_delimiter(byte)
}

/// Skip whitespace and return the number of bytes skipped
pub fn skip_whitespace(cursor: &mut ByteCursor<'_>) -> usize {
    let start = cursor.offset();
    while cursor.peek().is_some_and(is_whitespace) {
        cursor.advance(1);
    }
    cursor.offset() - start
}

/// Skips one `%` comment up to (not including) the end of line.
pub fn skip_comment(cursor: &mut ByteCursor<'_>) -> bool {
    if cursor.peek() != Some(b'%') {
        return false;
    }
    while let Some(byte) = cursor.peek() {
        if byte == b'\n' || byte == b'\r' {
            break;
        }
        cursor.advance(1);
    }
    true
}

pub fn skip_whitespace_and_comments(cursor: &mut ByteCursor<'_>) {
    loop {
        skip_whitespace(cursor);
        if !skip_comment(cursor) {
            break;
        }
    }
}

/// Consumes one end-of-line marker (`\r\n`, `\n` or `\r`).
pub fn skip_eol(cursor: &mut ByteCursor<'_>) -> bool {
    cursor.eat(b"\r\n") || cursor.eat(b"\n") || cursor.eat(b"\r")
}

/// Moves to the start of the next line.
pub fn skip_line(cursor: &mut ByteCursor<'_>) {
    while let Some(byte) = cursor.peek() {
        if byte == b'\n' || byte == b'\r' {
            break;
        }
        cursor.advance(1);
    }
    skip_eol(cursor);
}

/// `bytes` without leading and trailing whitespace.
pub fn trim_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|&b| !is_whitespace(b))
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|&b| !is_whitespace(b))
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// Reads a run of regular characters, e.g. a keyword such as `obj` or `R`.
pub fn read_keyword<'a>(cursor: &mut ByteCursor<'a>) -> &'a [u8] {
    let start = cursor.offset();
    while cursor.peek().is_some_and(is_regular) {
        cursor.advance(1);
    }
    cursor.slice(start, cursor.offset())
}

/// True if `keyword` is next and is not the prefix of a longer word.
pub fn at_keyword(cursor: &ByteCursor<'_>, keyword: &[u8]) -> bool {
    cursor.matches(keyword)
        && cursor
            .peek_at(keyword.len())
            .map_or(true, |next| !is_regular(next))
}

/// Read an unsigned decimal integer made of digits only.
pub fn read_unsigned(cursor: &mut ByteCursor<'_>) -> Option<u64> {
    let start = cursor.offset();
    let mut value: u64 = 0;
    while let Some(byte @ b'0'..=b'9') = cursor.peek() {
        value = value.checked_mul(10)?.checked_add((byte - b'0') as u64)?;
        cursor.advance(1);
    }
    (cursor.offset() > start).then_some(value)
}

/// Read a number (integer or real)
pub fn read_number(cursor: &mut ByteCursor<'_>) -> ParseResult<Number> {
    let start = cursor.offset();
    let mut text = String::new();
    let mut has_dot = false;
    let mut has_digit = false;

    while let Some(byte @ (b'+' | b'-')) = cursor.peek() {
        // Repeated signs ("--5") show up in the wild; the last one wins.
        text.clear();
        if byte == b'-' {
            text.push('-');
        }
        cursor.advance(1);
    }

    while let Some(byte) = cursor.peek() {
        match byte {
            b'0'..=b'9' => {
                has_digit = true;
                text.push(byte as char);
            }
            b'.' if !has_dot => {
                has_dot = true;
                text.push('.');
            }
            _ => break,
        }
        cursor.advance(1);
    }

    if !has_digit {
        cursor.move_to(start);
        return Err(cursor.error("Expected a number"));
    }

    if !has_dot {
        if let Ok(value) = text.parse::<i64>() {
            return Ok(Number::Integer(value));
        }
    }
    text.parse::<f64>()
        .map(Number::Real)
        .map_err(|_| cursor.error(format!("Invalid number: {text}")))
}

/// Read a name object (e.g., /Type). Bytes decoded from `#xx` escapes are
/// mapped one-to-one onto chars U+0000..U+00FF.
pub fn read_name(cursor: &mut ByteCursor<'_>) -> ParseResult<String> {
    if cursor.next() != Some(b'/') {
        return Err(cursor.error("Expected '/' to start a name"));
    }
    let mut name = String::new();

    while let Some(byte) = cursor.peek() {
        if !is_regular(byte) {
            break;
        }
        cursor.advance(1);

        // Handle hex codes in names (e.g., /A#20B means /A B)
        if byte == b'#' {
            let high = cursor.peek().and_then(hex_digit_value);
            let low = cursor.peek_at(1).and_then(hex_digit_value);
            if let (Some(high), Some(low)) = (high, low) {
                cursor.advance(2);
                name.push(((high << 4) | low) as char);
                continue;
            }
        }
        name.push(byte as char);
    }

    Ok(name)
}

/// Read a literal string (parentheses)
pub fn read_literal_string(cursor: &mut ByteCursor<'_>) -> ParseResult<Vec<u8>> {
    let start = cursor.offset();
    if cursor.next() != Some(b'(') {
        return Err(cursor.error("Expected '(' to start a string"));
    }
    let mut string = Vec::new();
    let mut paren_depth = 1;

    while paren_depth > 0 {
        let Some(byte) = cursor.next() else {
            cursor.move_to(start);
            return Err(cursor.error("Unterminated string"));
        };

        match byte {
            b'\\' => {
                let Some(escaped) = cursor.next() else {
                    continue;
                };
                match escaped {
                    b'n' => string.push(b'\n'),
                    b'r' => string.push(b'\r'),
                    b't' => string.push(b'\t'),
                    b'b' => string.push(b'\x08'),
                    b'f' => string.push(b'\x0C'),
                    b'0'..=b'7' => {
                        // Octal escape sequence
                        let mut value = (escaped - b'0') as u32;
                        for _ in 0..2 {
                            match cursor.peek() {
                                Some(next @ b'0'..=b'7') => {
                                    cursor.advance(1);
                                    value = value * 8 + (next - b'0') as u32;
                                }
                                _ => break,
                            }
                        }
                        string.push((value & 0xFF) as u8);
                    }
                    // Line continuation
                    b'\r' => {
                        cursor.eat(b"\n");
                    }
                    b'\n' => {}
                    // \( \) \\ and unknown escapes keep the character
                    other => string.push(other),
                }
            }
            b'(' => {
                paren_depth += 1;
                string.push(byte);
            }
            b')' => {
                paren_depth -= 1;
                if paren_depth > 0 {
                    string.push(byte);
                }
            }
            _ => string.push(byte),
        }
    }

    Ok(string)
}

/// Read a hexadecimal string `<...>`; an odd digit count is padded with 0.
pub fn read_hex_string(cursor: &mut ByteCursor<'_>) -> ParseResult<Vec<u8>> {
    let start = cursor.offset();
    if cursor.next() != Some(b'<') {
        return Err(cursor.error("Expected '<' to start a hex string"));
    }
    let mut bytes = Vec::new();
    let mut pending: Option<u8> = None;

    loop {
        let Some(byte) = cursor.next() else {
            cursor.move_to(start);
            return Err(cursor.error("Unterminated hex string"));
        };
        if byte == b'>' {
            break;
        }
        if is_whitespace(byte) {
            continue;
        }
        let Some(value) = hex_digit_value(byte) else {
            return Err(cursor.error("Invalid character in hex string"));
        };
        match pending.take() {
            Some(high) => bytes.push((high << 4) | value),
            None => pending = Some(value),
        }
    }

    if let Some(high) = pending {
        bytes.push(high << 4);
    }
    Ok(bytes)
}

/// Get value of hex digit
pub fn hex_digit_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}
