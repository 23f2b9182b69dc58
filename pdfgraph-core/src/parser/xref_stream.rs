//! Cross-reference stream support for PDF 1.5+
//!
//! Decodes streams of type `/XRef` according to ISO 32000-1:2008
//! Section 7.5.8: fixed-width big-endian fields per `/W`, covering the
//! object-number ranges listed in `/Index`.

use super::filters;
use super::xref::{XRefEntry, XRefTable};
use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Stream};

/// Field widths from `/W`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldWidths(pub [usize; 3]);

impl FieldWidths {
    pub fn row_length(&self) -> usize {
        self.0.iter().sum()
    }
}

/// Decoded layout of an xref stream.
#[derive(Debug, Clone, PartialEq)]
pub struct XRefStreamLayout {
    pub widths: FieldWidths,
    /// Pairs of (first object number, count)
    pub index: Vec<(u32, u32)>,
}

impl XRefStreamLayout {
    pub fn from_dict(dict: &Dictionary) -> ParseResult<Self> {
        let widths = dict
            .get("W")
            .and_then(|obj| obj.as_array())
            .ok_or_else(|| ParseError::MissingKey("W".to_string()))?
            .iter()
            .map(|obj| {
                obj.as_integer()
                    .and_then(|n| usize::try_from(n).ok())
                    .filter(|&n| n <= 8)
                    .ok_or_else(|| ParseError::StreamDecodeError("Invalid width in W array".to_string()))
            })
            .collect::<ParseResult<Vec<_>>>()?;
        let widths: [usize; 3] = widths.try_into().map_err(|w: Vec<usize>| {
            ParseError::StreamDecodeError(format!(
                "W array must have 3 elements, found {}",
                w.len()
            ))
        })?;

        let index = match dict.get("Index").and_then(|obj| obj.as_array()) {
            Some(array) => array
                .chunks_exact(2)
                .map(|pair| {
                    let first = pair[0].as_integer().and_then(|n| u32::try_from(n).ok());
                    let count = pair[1].as_integer().and_then(|n| u32::try_from(n).ok());
                    first.zip(count).ok_or_else(|| {
                        ParseError::StreamDecodeError("Invalid Index entry".to_string())
                    })
                })
                .collect::<ParseResult<Vec<_>>>()?,
            None => {
                let size = dict
                    .get_integer("Size")
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| ParseError::MissingKey("Size".to_string()))?;
                vec![(0, size)]
            }
        };

        Ok(Self {
            widths: FieldWidths(widths),
            index,
        })
    }
}

/// Decode the entries of an xref stream.
pub fn parse_xref_stream(stream: &Stream) -> ParseResult<XRefTable> {
    let layout = XRefStreamLayout::from_dict(stream.dict())?;
    let data = match stream.raw_data() {
        Some(raw) => filters::decode_stream(raw, stream.dict())?,
        None => return Err(ParseError::InvalidXRef),
    };
    decode_entries(&data, &layout)
}

fn decode_entries(data: &[u8], layout: &XRefStreamLayout) -> ParseResult<XRefTable> {
    let [w_type, w_second, w_third] = layout.widths.0;
    let row_length = layout.widths.row_length();
    if row_length == 0 {
        return Err(ParseError::StreamDecodeError("Empty W array".to_string()));
    }

    let mut table = XRefTable::new();
    let mut rows = data.chunks_exact(row_length);

    'ranges: for &(first, count) in &layout.index {
        for number in first..first.saturating_add(count) {
            let Some(row) = rows.next() else {
                tracing::warn!("Xref stream data ends before object {number}");
                break 'ranges;
            };
            let (type_field, rest) = row.split_at(w_type);
            let (second_field, third_field) = rest.split_at(w_second);
            debug_assert_eq!(third_field.len(), w_third);

            // A zero-width type field means type 1.
            let entry_type = if w_type == 0 { 1 } else { read_field(type_field) };
            let second = read_field(second_field);
            let third = read_field(third_field);

            let entry = match entry_type {
                0 => XRefEntry::Free {
                    next_free: second as u32,
                    generation: third as u16,
                },
                1 => XRefEntry::InUse {
                    offset: second,
                    generation: third as u16,
                },
                2 => XRefEntry::Compressed {
                    stream_number: second as u32,
                    index: third as u32,
                },
                // Unknown entry types are references to the null object.
                _ => continue,
            };
            table.insert_if_absent(number, entry);
        }
    }

    Ok(table)
}

/// Big-endian unsigned field.
pub fn read_field(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | byte as u64)
}
