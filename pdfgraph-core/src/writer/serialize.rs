//! Byte representation of objects (ISO 32000-1 Section 7.3).
//!
//! Direct objects serialize infallibly. Streams can only be written as the
//! body of an indirect object, where encoding (and compression) may fail.

use crate::error::Result;
use crate::objects::{Dictionary, Object, ObjectId, Operator};

/// Appends the direct representation of `object`. A stream in direct
/// position is not valid PDF; only its dictionary is written.
pub fn write_object(out: &mut Vec<u8>, object: &Object) {
    match object {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(f) => out.extend_from_slice(format_real(*f).as_bytes()),
        Object::String(s) => write_literal_string(out, s),
        Object::HexString(s) => write_hex_string(out, s),
        Object::Name(n) => write_name(out, n),
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_object(out, item);
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => write_dictionary(out, dict),
        Object::Stream(stream) => {
            tracing::debug!("Stream in direct position, writing its dictionary only");
            write_dictionary(out, stream.dict());
        }
        Object::Reference(id) => {
            out.extend_from_slice(format!("{} {} R", id.number(), id.generation()).as_bytes())
        }
        Object::Invalid(raw) => out.extend_from_slice(raw),
    }
}

pub fn object_to_bytes(object: &Object) -> Vec<u8> {
    let mut out = Vec::new();
    write_object(&mut out, object);
    out
}

/// `n g obj\n<body>\nendobj\n`. Stream bodies get a recomputed `/Length`;
/// `compress` governs lazily encoded operator streams.
pub fn indirect_object_to_bytes(id: ObjectId, object: &Object, compress: bool) -> Result<Vec<u8>> {
    let mut out = format!("{} {} obj\n", id.number(), id.generation()).into_bytes();
    match object {
        Object::Stream(stream) => {
            let (dict, data) = stream.encoded_with(compress)?;
            write_dictionary(&mut out, &dict);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(&data);
            out.extend_from_slice(b"\nendstream");
        }
        other => write_object(&mut out, other),
    }
    out.extend_from_slice(b"\nendobj\n");
    Ok(out)
}

pub fn write_dictionary(out: &mut Vec<u8>, dict: &Dictionary) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict {
        out.push(b'\n');
        write_name(out, key);
        out.push(b' ');
        write_object(out, value);
    }
    out.extend_from_slice(b"\n>>");
}

/// Reals with at most six decimals and no trailing zeros. Non-finite values
/// have no PDF syntax and are written as 0.
pub fn format_real(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let formatted = format!("{value:.6}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

fn write_literal_string(out: &mut Vec<u8>, data: &[u8]) {
    out.push(b'(');
    for &byte in data {
        match byte {
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x0c => out.extend_from_slice(b"\\f"),
            _ => out.push(byte),
        }
    }
    out.push(b')');
}

fn write_hex_string(out: &mut Vec<u8>, data: &[u8]) {
    out.push(b'<');
    for byte in data {
        out.extend_from_slice(format!("{byte:02X}").as_bytes());
    }
    out.push(b'>');
}

/// Characters at or below U+00FF stand for one byte each (the parser maps
/// `#xx` escapes that way); anything above is written as escaped UTF-8.
fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    let mut utf8 = [0u8; 4];
    for ch in name.chars() {
        match u8::try_from(u32::from(ch)) {
            Ok(byte) => write_name_byte(out, byte),
            Err(_) => {
                for &byte in ch.encode_utf8(&mut utf8).as_bytes() {
                    write_name_byte(out, byte);
                }
            }
        }
    }
}

fn write_name_byte(out: &mut Vec<u8>, byte: u8) {
    if is_plain_name_byte(byte) {
        out.push(byte);
    } else {
        out.extend_from_slice(format!("#{byte:02X}").as_bytes());
    }
}

fn is_plain_name_byte(byte: u8) -> bool {
    matches!(byte, b'!'..=b'~')
        && !matches!(
            byte,
            b'#' | b'%' | b'(' | b')' | b'/' | b'<' | b'>' | b'[' | b']' | b'{' | b'}'
        )
}

/// Content-stream text: operands separated by spaces, one operator per line.
pub fn operators_to_bytes(operators: &[Operator]) -> Vec<u8> {
    let mut out = Vec::new();
    for operator in operators {
        if operator.is_inline_image() {
            write_inline_image(&mut out, operator);
            continue;
        }
        for operand in &operator.operands {
            write_object(&mut out, operand);
            out.push(b' ');
        }
        out.extend_from_slice(operator.operator.as_bytes());
        out.push(b'\n');
    }
    out
}

fn write_inline_image(out: &mut Vec<u8>, operator: &Operator) {
    out.extend_from_slice(b"BI");
    if let Some(dict) = operator.operands.first().and_then(Object::as_dict) {
        for (key, value) in dict {
            out.push(b' ');
            write_name(out, key);
            out.push(b' ');
            write_object(out, value);
        }
    }
    out.extend_from_slice(b" ID ");
    if let Some(data) = operator.operands.get(1).and_then(Object::as_bytes) {
        out.extend_from_slice(data);
    }
    out.extend_from_slice(b"\nEI\n");
}
