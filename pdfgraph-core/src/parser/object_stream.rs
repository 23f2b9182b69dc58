//! Object stream unpacking (ISO 32000-1 Section 7.5.7)
//!
//! An `/ObjStm` payload starts with `N` pairs of `objNum offset`, followed at
//! `/First` by the concatenated object bodies. Offsets are relative to
//! `/First`.

use super::lexer;
use super::objects::ObjectParser;
use super::{filters, ParseError, ParseOptions, ParseResult};
use crate::objects::{Object, ObjectId, Stream};

/// Decoded members of one object stream, in stored order.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectStreamContents {
    pub objects: Vec<(ObjectId, Object)>,
}

impl ObjectStreamContents {
    /// Member at position `index`, checked against the expected object number.
    pub fn get(&self, index: usize, number: u32) -> Option<&Object> {
        self.objects
            .get(index)
            .filter(|(id, _)| id.number() == number)
            .or_else(|| self.objects.iter().find(|(id, _)| id.number() == number))
            .map(|(_, object)| object)
    }
}

/// Unpacks every member of an object stream. Members are always generation 0.
pub fn parse_object_stream(stream: &Stream, options: ParseOptions) -> ParseResult<ObjectStreamContents> {
    let dict = stream.dict();
    let count = dict
        .get_integer("N")
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| ParseError::MissingKey("N".to_string()))?;
    let first = dict
        .get_integer("First")
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| ParseError::MissingKey("First".to_string()))?;

    let raw = stream
        .raw_data()
        .ok_or_else(|| ParseError::StreamDecodeError("Object stream has no payload".to_string()))?;
    let data = filters::decode_stream(raw, dict)?;

    let mut parser = ObjectParser::new(&data, options);
    let mut header = Vec::with_capacity(count.min(4096));
    for _ in 0..count {
        let cursor = parser.cursor_mut();
        lexer::skip_whitespace_and_comments(cursor);
        let number = lexer::read_unsigned(cursor);
        lexer::skip_whitespace(cursor);
        let offset = lexer::read_unsigned(cursor);
        match number.zip(offset) {
            Some((number, offset)) => header.push((
                u32::try_from(number).map_err(|_| ParseError::InvalidXRef)?,
                usize::try_from(offset).map_err(|_| ParseError::InvalidXRef)?,
            )),
            None => {
                tracing::warn!(
                    "Object stream header lists {} of {count} members",
                    header.len()
                );
                break;
            }
        }
    }

    let mut objects = Vec::with_capacity(header.len());
    for (index, &(number, offset)) in header.iter().enumerate() {
        let start = first.saturating_add(offset).min(data.len());
        parser.move_to(start);
        let object = match parser.parse_object() {
            Ok(object) => object,
            Err(err) if options.strict => return Err(err),
            Err(err) => {
                // The body runs up to the next member, or to the end of the payload.
                let end = header
                    .get(index + 1)
                    .map(|&(_, next)| first.saturating_add(next).min(data.len()))
                    .filter(|&end| end > start)
                    .unwrap_or(data.len());
                tracing::warn!("Member {number} of an object stream could not be parsed ({err}), keeping it as invalid");
                Object::Invalid(lexer::trim_whitespace(&data[start..end]).to_vec())
            }
        };
        objects.push((ObjectId::new(number, 0), object));
    }

    Ok(ObjectStreamContents { objects })
}
