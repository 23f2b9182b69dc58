//! PDF Object Parser
//!
//! Recursive-descent translation of bytes into [`Object`] values according
//! to ISO 32000-1 Section 7.3.

use super::cursor::ByteCursor;
use super::lexer::{self, Number};
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId, Stream};

/// Resolves an indirect `/Length` while a stream is being parsed.
pub type LengthResolver<'a> = dyn Fn(ObjectId) -> Option<i64> + 'a;

pub struct ObjectParser<'a> {
    cursor: ByteCursor<'a>,
    options: ParseOptions,
    depth: usize,
    allow_references: bool,
    length_resolver: Option<&'a LengthResolver<'a>>,
}

impl<'a> ObjectParser<'a> {
    pub fn new(bytes: &'a [u8], options: ParseOptions) -> Self {
        Self {
            cursor: ByteCursor::new(bytes),
            options,
            depth: 0,
            allow_references: true,
            length_resolver: None,
        }
    }

    /// Parser positioned at `offset`.
    pub fn at(bytes: &'a [u8], offset: usize, options: ParseOptions) -> Self {
        let mut parser = Self::new(bytes, options);
        parser.cursor.move_to(offset);
        parser
    }

    pub fn with_length_resolver(mut self, resolver: &'a LengthResolver<'a>) -> Self {
        self.length_resolver = Some(resolver);
        self
    }

    /// Content streams have no indirect references; `1 0 R` is never special there.
    pub(crate) fn without_references(mut self) -> Self {
        self.allow_references = false;
        self
    }

    pub fn cursor(&self) -> &ByteCursor<'a> {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut ByteCursor<'a> {
        &mut self.cursor
    }

    pub fn offset(&self) -> usize {
        self.cursor.offset()
    }

    /// Repositions the parser for a new top-level object.
    pub fn move_to(&mut self, offset: usize) {
        self.cursor.move_to(offset);
        self.depth = 0;
    }

    /// Parse the next direct object.
    pub fn parse_object(&mut self) -> ParseResult<Object> {
        lexer::skip_whitespace_and_comments(&mut self.cursor);

        let Some(byte) = self.cursor.peek() else {
            return Err(self.cursor.error("Unexpected end of input"));
        };

        match byte {
            b'/' => Ok(Object::Name(lexer::read_name(&mut self.cursor)?)),
            b'(' => Ok(Object::String(lexer::read_literal_string(&mut self.cursor)?)),
            b'<' if self.cursor.peek_at(1) == Some(b'<') => self.parse_dict_or_stream(),
            b'<' => Ok(Object::HexString(lexer::read_hex_string(&mut self.cursor)?)),
            b'[' => self.parse_array(),
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.parse_number_or_ref(),
            _ if lexer::at_keyword(&self.cursor, b"true") => {
                self.cursor.advance(4);
                Ok(Object::Boolean(true))
            }
            _ if lexer::at_keyword(&self.cursor, b"false") => {
                self.cursor.advance(5);
                Ok(Object::Boolean(false))
            }
            _ if lexer::at_keyword(&self.cursor, b"null") => {
                self.cursor.advance(4);
                Ok(Object::Null)
            }
            _ => {
                let position = self.cursor.offset();
                let found = lexer::read_keyword(&mut self.cursor);
                let found = if found.is_empty() {
                    self.cursor.advance(1);
                    format!("'{}'", byte as char)
                } else {
                    String::from_utf8_lossy(found).into_owned()
                };
                Err(ParseError::UnexpectedToken {
                    position,
                    expected: "object".to_string(),
                    found,
                })
            }
        }
    }

    /// Reads `<n> <g> obj`, restoring the cursor if the header is not there.
    pub fn parse_indirect_header(&mut self) -> Option<ObjectId> {
        let checkpoint = self.cursor.checkpoint();
        let header = self.read_indirect_header();
        if header.is_none() {
            self.cursor.restore(checkpoint);
        }
        header
    }

    fn read_indirect_header(&mut self) -> Option<ObjectId> {
        lexer::skip_whitespace_and_comments(&mut self.cursor);
        let number = lexer::read_unsigned(&mut self.cursor)?;
        if lexer::skip_whitespace(&mut self.cursor) == 0 {
            return None;
        }
        let generation = lexer::read_unsigned(&mut self.cursor)?;
        lexer::skip_whitespace(&mut self.cursor);
        if !lexer::at_keyword(&self.cursor, b"obj") {
            return None;
        }
        self.cursor.advance(3);
        Some(ObjectId::new(
            u32::try_from(number).ok()?,
            u16::try_from(generation).ok()?,
        ))
    }

    /// Parses `<n> <g> obj <object> endobj`. A missing `endobj` is tolerated.
    pub fn parse_indirect_object(&mut self) -> ParseResult<(ObjectId, Object)> {
        self.depth = 0;
        let Some(id) = self.parse_indirect_header() else {
            lexer::skip_whitespace_and_comments(&mut self.cursor);
            return Err(self.cursor.error("Expected indirect object header"));
        };

        lexer::skip_whitespace_and_comments(&mut self.cursor);
        let object = if lexer::at_keyword(&self.cursor, b"endobj") {
            Object::Null
        } else {
            self.parse_object()?
        };

        lexer::skip_whitespace_and_comments(&mut self.cursor);
        if lexer::at_keyword(&self.cursor, b"endobj") {
            self.cursor.advance(b"endobj".len());
        } else {
            tracing::debug!("Object {id} is missing its endobj keyword");
        }
        Ok((id, object))
    }

    /// Moves past the next `endobj` and returns the bytes skipped over.
    pub fn skip_to_endobj(&mut self) -> ParseResult<&'a [u8]> {
        let start = self.cursor.offset();
        let limit = start.saturating_add(self.options.max_recovery_scan);
        match self.cursor.find_from(b"endobj", start) {
            Some(end) if end <= limit => {
                self.cursor.move_to(end + b"endobj".len());
                Ok(self.cursor.slice(start, end))
            }
            _ => Err(self.cursor.error("No endobj found")),
        }
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(ParseError::MaxDepthExceeded(self.options.max_depth));
        }
        Ok(())
    }

    fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn parse_number_or_ref(&mut self) -> ParseResult<Object> {
        let number = lexer::read_number(&mut self.cursor)?;
        let value = match number {
            Number::Integer(value) => value,
            Number::Real(value) => return Ok(Object::Real(value)),
        };

        if self.allow_references && value >= 0 {
            let after_number = self.cursor.checkpoint();
            if let Some(id) = self.try_reference_tail(value) {
                return Ok(Object::Reference(id));
            }
            self.cursor.restore(after_number);
        }
        Ok(Object::Integer(value))
    }

    /// After an integer, looks for `<generation> R`.
    fn try_reference_tail(&mut self, number: i64) -> Option<ObjectId> {
        if lexer::skip_whitespace(&mut self.cursor) == 0 {
            return None;
        }
        let generation = lexer::read_unsigned(&mut self.cursor)?;
        if self.cursor.peek().is_some_and(lexer::is_regular) {
            return None;
        }
        lexer::skip_whitespace(&mut self.cursor);
        if !lexer::at_keyword(&self.cursor, b"R") {
            return None;
        }
        self.cursor.advance(1);
        Some(ObjectId::new(
            u32::try_from(number).ok()?,
            u16::try_from(generation).ok()?,
        ))
    }

    fn parse_array(&mut self) -> ParseResult<Object> {
        self.enter()?;
        self.cursor.advance(1);
        let mut items = Vec::new();

        loop {
            lexer::skip_whitespace_and_comments(&mut self.cursor);
            match self.cursor.peek() {
                Some(b']') => {
                    self.cursor.advance(1);
                    break;
                }
                None => return Err(self.cursor.error("Unterminated array")),
                Some(_) => items.push(self.parse_object()?),
            }
        }

        self.exit();
        Ok(Object::Array(items))
    }

    fn parse_dictionary(&mut self) -> ParseResult<Dictionary> {
        self.enter()?;
        self.cursor.advance(2);
        let mut dict = Dictionary::new();

        loop {
            lexer::skip_whitespace_and_comments(&mut self.cursor);
            if self.cursor.eat(b">>") {
                break;
            }
            match self.cursor.peek() {
                None => return Err(self.cursor.error("Unterminated dictionary")),
                Some(b'/') => {}
                Some(_) => {
                    let position = self.cursor.offset();
                    let found = String::from_utf8_lossy(lexer::read_keyword(&mut self.cursor))
                        .into_owned();
                    return Err(ParseError::UnexpectedToken {
                        position,
                        expected: "dictionary key".to_string(),
                        found,
                    });
                }
            }

            let key = lexer::read_name(&mut self.cursor)?;
            lexer::skip_whitespace_and_comments(&mut self.cursor);
            // A key directly followed by `>>` has no value.
            let value = if self.cursor.matches(b">>") {
                Object::Null
            } else {
                self.parse_object()?
            };
            dict.set(key, value);
        }

        self.exit();
        Ok(dict)
    }

    fn parse_dict_or_stream(&mut self) -> ParseResult<Object> {
        let dict = self.parse_dictionary()?;

        let after_dict = self.cursor.checkpoint();
        lexer::skip_whitespace_and_comments(&mut self.cursor);
        if !lexer::at_keyword(&self.cursor, b"stream") {
            self.cursor.restore(after_dict);
            return Ok(Object::Dictionary(dict));
        }
        self.cursor.advance(b"stream".len());

        // Accepted: "stream\r\n", "stream\n", "stream\r", and any of them
        // preceded by stray spaces.
        while self.cursor.peek() == Some(b' ') {
            self.cursor.advance(1);
        }
        lexer::skip_eol(&mut self.cursor);
        let start = self.cursor.offset();

        let data = match self.declared_length(&dict) {
            Some(length) => match self.stream_end_from_length(start, length) {
                Some(end) => self.cursor.slice(start, end),
                None => {
                    tracing::warn!(
                        "Stream at offset {start} has a stale /Length {length}, scanning for endstream"
                    );
                    self.scan_for_stream_end(start)?
                }
            },
            None => self.scan_for_stream_end(start)?,
        };

        Ok(Object::Stream(Stream::new(dict, data.to_vec())))
    }

    fn declared_length(&self, dict: &Dictionary) -> Option<usize> {
        let length = match dict.get("Length")? {
            Object::Integer(length) => *length,
            Object::Reference(id) => self.length_resolver.and_then(|resolve| resolve(*id))?,
            _ => return None,
        };
        usize::try_from(length).ok()
    }

    /// Trusts `length` only if `endstream` follows the payload. On success the
    /// cursor is left after `endstream`.
    fn stream_end_from_length(&mut self, start: usize, length: usize) -> Option<usize> {
        let end = start.checked_add(length)?;
        if end > self.cursor.len() {
            return None;
        }
        let checkpoint = self.cursor.checkpoint();
        self.cursor.move_to(end);
        lexer::skip_whitespace(&mut self.cursor);
        if lexer::at_keyword(&self.cursor, b"endstream") {
            self.cursor.advance(b"endstream".len());
            Some(end)
        } else {
            self.cursor.restore(checkpoint);
            None
        }
    }

    /// Finds the payload end by balancing nested `stream`/`endstream`
    /// keywords. The end-of-line before `endstream` is not part of the data.
    fn scan_for_stream_end(&mut self, start: usize) -> ParseResult<&'a [u8]> {
        let bytes = self.cursor.bytes();
        let limit = bytes
            .len()
            .min(start.saturating_add(self.options.max_recovery_scan));
        let mut nesting = 1usize;
        let mut i = start;

        while i < limit {
            let rest = &bytes[i..];
            if rest.starts_with(b"endstream") {
                nesting -= 1;
                if nesting == 0 {
                    let mut end = i;
                    if end > start && bytes[end - 1] == b'\n' {
                        end -= 1;
                    }
                    if end > start && bytes[end - 1] == b'\r' {
                        end -= 1;
                    }
                    self.cursor.move_to(i + b"endstream".len());
                    return Ok(&bytes[start..end]);
                }
                i += b"endstream".len();
            } else if rest.starts_with(b"stream") {
                nesting += 1;
                i += b"stream".len();
            } else {
                i += 1;
            }
        }

        Err(ParseError::MissingEndstream(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::DictKind;

    fn parse(input: &[u8]) -> Object {
        ObjectParser::new(input, ParseOptions::default())
            .parse_object()
            .unwrap()
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse(b"null"), Object::Null);
        assert_eq!(parse(b"true"), Object::Boolean(true));
        assert_eq!(parse(b"  false "), Object::Boolean(false));
        assert_eq!(parse(b"42"), Object::Integer(42));
        assert_eq!(parse(b"-3.5"), Object::Real(-3.5));
        assert_eq!(parse(b"/Name"), Object::name("Name"));
        assert_eq!(parse(b"(text)"), Object::string("text"));
        assert_eq!(parse(b"<414243>"), Object::HexString(b"ABC".to_vec()));
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(parse(b"12 0 R"), Object::Reference(ObjectId::new(12, 0)));
        assert_eq!(
            parse(b"12\n3\rR"),
            Object::Reference(ObjectId::new(12, 3))
        );
    }

    #[test]
    fn test_number_backtracking() {
        let mut parser = ObjectParser::new(b"[1 2 3 0 R 4 5]", ParseOptions::default());
        let array = parser.parse_object().unwrap();
        assert_eq!(
            array,
            Object::Array(vec![
                Object::Integer(1),
                Object::Integer(2),
                Object::Reference(ObjectId::new(3, 0)),
                Object::Integer(4),
                Object::Integer(5),
            ])
        );
    }

    #[test]
    fn test_number_followed_by_real_is_not_reference() {
        let mut parser = ObjectParser::new(b"1 0.5 R", ParseOptions::default());
        assert_eq!(parser.parse_object().unwrap(), Object::Integer(1));
        assert_eq!(parser.parse_object().unwrap(), Object::Real(0.5));
    }

    #[test]
    fn test_number_followed_by_other_keyword() {
        let mut parser = ObjectParser::new(b"1 0 RG", ParseOptions::default());
        assert_eq!(parser.parse_object().unwrap(), Object::Integer(1));
        assert_eq!(parser.parse_object().unwrap(), Object::Integer(0));
    }

    #[test]
    fn test_parse_dictionary_classifies() {
        let object = parse(b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>");
        let dict = object.as_dict().unwrap();
        assert_eq!(dict.kind(), DictKind::Page);
        assert_eq!(dict.get_reference("Parent"), Some(ObjectId::new(2, 0)));
        assert_eq!(dict.get("MediaBox").unwrap().as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_parse_nested_dictionary_without_spaces() {
        let object = parse(b"<</A<</B[1/C]>>/D(x)>>");
        let dict = object.as_dict().unwrap();
        let inner = dict.get_dict("A").unwrap();
        assert_eq!(
            inner.get("B").unwrap(),
            &Object::Array(vec![Object::Integer(1), Object::name("C")])
        );
        assert_eq!(dict.get("D"), Some(&Object::string("x")));
    }

    #[test]
    fn test_dictionary_key_without_value() {
        let object = parse(b"<< /A 1 /B >>");
        assert_eq!(object.as_dict().unwrap().get("B"), Some(&Object::Null));
    }

    #[test]
    fn test_parse_stream_with_length() {
        let object = parse(b"<< /Length 5 >>\nstream\r\nHello\nendstream");
        let stream = object.as_stream().unwrap();
        assert_eq!(stream.raw_data(), Some(&b"Hello"[..]));
    }

    #[test]
    fn test_stream_eol_variants() {
        for input in [
            &b"<< /Length 3 >> stream\nabc\nendstream"[..],
            &b"<< /Length 3 >> stream\rabc\rendstream"[..],
            &b"<< /Length 3 >> stream  \r\nabc endstream"[..],
            &b"<< /Length 3 >>stream\r\nabcendstream"[..],
        ] {
            let object = parse(input);
            assert_eq!(
                object.as_stream().unwrap().raw_data(),
                Some(&b"abc"[..]),
                "{}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn test_stream_with_wrong_length_falls_back() {
        let input = b"<< /Length 2 >>\nstream\nHello, world\nendstream\nendobj";
        let mut parser = ObjectParser::new(input, ParseOptions::default());
        let object = parser.parse_object().unwrap();
        assert_eq!(
            object.as_stream().unwrap().raw_data(),
            Some(&b"Hello, world"[..])
        );
        lexer::skip_whitespace(parser.cursor_mut());
        assert!(parser.cursor().matches(b"endobj"));
    }

    #[test]
    fn test_stream_length_too_long_falls_back() {
        let object = parse(b"<< /Length 500 >>\nstream\nabc\r\nendstream");
        assert_eq!(object.as_stream().unwrap().raw_data(), Some(&b"abc"[..]));
    }

    #[test]
    fn test_stream_fallback_tracks_nesting() {
        let input = b"<< >>\nstream\ninner stream\nx\nendstream tail\nendstream";
        let object = parse(input);
        assert_eq!(
            object.as_stream().unwrap().raw_data(),
            Some(&b"inner stream\nx\nendstream tail"[..])
        );
    }

    #[test]
    fn test_stream_without_endstream_fails() {
        let mut parser = ObjectParser::new(b"<< /Length 3 >>\nstream\nabc", ParseOptions::default());
        assert!(matches!(
            parser.parse_object(),
            Err(ParseError::MissingEndstream(_))
        ));
    }

    #[test]
    fn test_indirect_length_resolver() {
        let resolver = |id: ObjectId| (id == ObjectId::new(9, 0)).then_some(4);
        let input = b"<< /Length 9 0 R >>\nstream\nabcd\nendstream";
        let mut parser =
            ObjectParser::new(input, ParseOptions::default()).with_length_resolver(&resolver);
        let object = parser.parse_object().unwrap();
        assert_eq!(object.as_stream().unwrap().raw_data(), Some(&b"abcd"[..]));
    }

    #[test]
    fn test_parse_indirect_object() {
        let input = b"7 0 obj\n<< /Type /Catalog >>\nendobj\n";
        let mut parser = ObjectParser::new(input, ParseOptions::default());
        let (id, object) = parser.parse_indirect_object().unwrap();
        assert_eq!(id, ObjectId::new(7, 0));
        assert_eq!(object.as_dict().unwrap().kind(), DictKind::Catalog);
        assert_eq!(parser.offset(), input.len() - 1);
    }

    #[test]
    fn test_parse_empty_indirect_object() {
        let mut parser = ObjectParser::new(b"3 0 obj endobj", ParseOptions::default());
        let (_, object) = parser.parse_indirect_object().unwrap();
        assert_eq!(object, Object::Null);
    }

    #[test]
    fn test_indirect_header_restores_on_failure() {
        let mut parser = ObjectParser::new(b"12 0 R", ParseOptions::default());
        assert!(parser.parse_indirect_header().is_none());
        assert_eq!(parser.offset(), 0);
    }

    #[test]
    fn test_skip_to_endobj() {
        let mut parser = ObjectParser::new(b"<< /Broken ] >> endobj 2 0 obj", ParseOptions::default());
        let raw = parser.skip_to_endobj().unwrap();
        assert_eq!(raw, b"<< /Broken ] >> ");
        lexer::skip_whitespace(parser.cursor_mut());
        assert!(parser.cursor().matches(b"2 0 obj"));
    }

    #[test]
    fn test_unexpected_token() {
        let mut parser = ObjectParser::new(b"  endobj", ParseOptions::default());
        match parser.parse_object() {
            Err(ParseError::UnexpectedToken {
                position, found, ..
            }) => {
                assert_eq!(position, 2);
                assert_eq!(found, "endobj");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_max_depth() {
        let options = ParseOptions {
            max_depth: 3,
            ..ParseOptions::default()
        };
        let mut parser = ObjectParser::new(b"[[[[1]]]]", options);
        assert!(matches!(
            parser.parse_object(),
            Err(ParseError::MaxDepthExceeded(3))
        ));

        let mut parser = ObjectParser::new(b"[[[1]]]", options);
        assert!(parser.parse_object().is_ok());
    }

    #[test]
    fn test_comments_between_tokens() {
        let object = parse(b"[1 % one\n 2 % two\n]");
        assert_eq!(
            object,
            Object::Array(vec![Object::Integer(1), Object::Integer(2)])
        );
    }
}
