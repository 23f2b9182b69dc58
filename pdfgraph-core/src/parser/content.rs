//! PDF Content Stream Parser
//!
//! Splits a decoded content stream into [`Operator`]s. Operands are ordinary
//! objects; everything else made of regular characters is an operator keyword.

use super::lexer;
use super::objects::ObjectParser;
use super::{ParseOptions, ParseResult};
use crate::objects::{Dictionary, Object, Operator};

/// Parse a content stream into its operators.
pub fn parse_operators(data: &[u8]) -> ParseResult<Vec<Operator>> {
    let mut parser = ObjectParser::new(data, ParseOptions::default()).without_references();
    let mut operators = Vec::new();
    let mut operands = Vec::new();

    loop {
        lexer::skip_whitespace_and_comments(parser.cursor_mut());
        let Some(byte) = parser.cursor().peek() else {
            break;
        };

        if is_operator_start(byte)
            && !lexer::at_keyword(parser.cursor(), b"true")
            && !lexer::at_keyword(parser.cursor(), b"false")
            && !lexer::at_keyword(parser.cursor(), b"null")
        {
            let keyword = lexer::read_keyword(parser.cursor_mut());
            let name = String::from_utf8_lossy(keyword).into_owned();
            if name == "BI" {
                operators.push(parse_inline_image(&mut parser)?);
                operands.clear();
            } else {
                operators.push(Operator::new(name, std::mem::take(&mut operands)));
            }
        } else {
            operands.push(parser.parse_object()?);
        }
    }

    if !operands.is_empty() {
        tracing::debug!(
            "Content stream ends with {} dangling operands",
            operands.len()
        );
    }
    Ok(operators)
}

fn is_operator_start(byte: u8) -> bool {
    lexer::is_regular(byte) && !matches!(byte, b'+' | b'-' | b'.' | b'0'..=b'9')
}

/// Reads the body of `BI <dict entries> ID <data> EI`, the `BI` already consumed.
fn parse_inline_image(parser: &mut ObjectParser<'_>) -> ParseResult<Operator> {
    let mut dict = Dictionary::new();
    loop {
        lexer::skip_whitespace_and_comments(parser.cursor_mut());
        if lexer::at_keyword(parser.cursor(), b"ID") {
            parser.cursor_mut().advance(2);
            break;
        }
        if parser.cursor().done() {
            return Err(parser.cursor().error("Inline image without ID"));
        }
        let key = match parser.parse_object()? {
            Object::Name(key) => key,
            other => {
                return Err(parser
                    .cursor()
                    .error(format!("Inline image key must be a name, found {}", other.kind())))
            }
        };
        let value = parser.parse_object()?;
        dict.set(key, value);
    }

    // A single whitespace byte separates ID from the data.
    if parser.cursor().peek().is_some_and(lexer::is_whitespace) {
        parser.cursor_mut().advance(1);
    }
    let start = parser.offset();
    let bytes = parser.cursor().bytes();

    let mut search = start;
    let end = loop {
        let Some(found) = parser.cursor().find_from(b"EI", search) else {
            return Err(parser.cursor().error("Inline image without EI"));
        };
        let before_ok = found == start || lexer::is_whitespace(bytes[found - 1]);
        let after_ok = bytes.get(found + 2).map_or(true, |&b| !lexer::is_regular(b));
        if before_ok && after_ok {
            break found;
        }
        search = found + 2;
    };

    let mut data_end = end;
    if data_end > start && lexer::is_whitespace(bytes[data_end - 1]) {
        data_end -= 1;
    }
    let data = bytes[start..data_end].to_vec();
    parser.move_to(end + 2);
    Ok(Operator::inline_image(dict, data))
}
