//! PDF Stream Filters
//!
//! Handles decompression and decoding of PDF streams according to ISO 32000-1 Section 7.4

use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object};
use flate2::read::ZlibDecoder;
use std::io::Read;

/// Supported PDF filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// ASCII hex decode
    ASCIIHexDecode,

    /// ASCII 85 decode
    ASCII85Decode,

    /// Flate decode (zlib/deflate compression)
    FlateDecode,
}

impl Filter {
    /// Parse filter from name, including the abbreviations used in inline images
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ASCIIHexDecode" | "AHx" => Some(Filter::ASCIIHexDecode),
            "ASCII85Decode" | "A85" => Some(Filter::ASCII85Decode),
            "FlateDecode" | "Fl" => Some(Filter::FlateDecode),
            _ => None,
        }
    }
}

/// Largest `/Colors` a predictor row may declare.
const MAX_COLORS: i64 = 32;

/// Predictor parameters from `/DecodeParms`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Predictor {
    predictor: i64,
    colors: usize,
    bits_per_component: usize,
    columns: usize,
}

impl Predictor {
    /// `None` when no prediction was applied to the data.
    fn from_params(params: Option<&Dictionary>) -> ParseResult<Option<Self>> {
        let get = |key: &str, default: i64| {
            params
                .and_then(|p| p.get_integer(key))
                .unwrap_or(default)
        };
        let predictor = get("Predictor", 1);
        if predictor == 1 {
            return Ok(None);
        }
        let bits_per_component = match get("BitsPerComponent", 8) {
            bits @ (1 | 2 | 4 | 8 | 16) => bits as usize,
            other => {
                return Err(ParseError::StreamDecodeError(format!(
                    "Invalid /BitsPerComponent {other}"
                )))
            }
        };
        let columns = usize::try_from(get("Columns", 1).max(1)).map_err(|_| {
            ParseError::StreamDecodeError("/Columns does not fit in memory".to_string())
        })?;
        Ok(Some(Self {
            predictor,
            colors: get("Colors", 1).clamp(1, MAX_COLORS) as usize,
            bits_per_component,
            columns,
        }))
    }

    fn bytes_per_pixel(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8)
    }

    fn row_length(&self) -> ParseResult<usize> {
        (self.colors * self.bits_per_component)
            .checked_mul(self.columns)
            .map(|bits| bits.div_ceil(8))
            .ok_or_else(|| {
                ParseError::StreamDecodeError(format!(
                    "Predictor row of {} columns overflows",
                    self.columns
                ))
            })
    }
}

/// Decode stream data according to specified filters
pub fn decode_stream(data: &[u8], dict: &Dictionary) -> ParseResult<Vec<u8>> {
    let filters: Vec<&str> = match dict.get("Filter") {
        None | Some(Object::Null) => return Ok(data.to_vec()),
        Some(Object::Name(name)) => vec![name.as_str()],
        Some(Object::Array(array)) => array
            .iter()
            .map(|obj| {
                obj.as_name().ok_or_else(|| {
                    ParseError::StreamDecodeError("Invalid filter in array".to_string())
                })
            })
            .collect::<ParseResult<_>>()?,
        Some(_) => {
            return Err(ParseError::StreamDecodeError(
                "Invalid Filter type".to_string(),
            ))
        }
    };

    let params: Vec<Option<&Dictionary>> = match dict.get("DecodeParms") {
        Some(Object::Dictionary(params)) => vec![Some(params)],
        Some(Object::Array(array)) => array
            .iter()
            .map(|obj| match obj {
                Object::Dictionary(params) => Some(params),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    // Apply filters in order
    let mut result = data.to_vec();
    for (index, filter_name) in filters.into_iter().enumerate() {
        let filter = Filter::from_name(filter_name).ok_or_else(|| {
            ParseError::StreamDecodeError(format!("Unsupported filter: {filter_name}"))
        })?;
        let params = params.get(index).copied().flatten();
        result = apply_filter(&result, filter, params)?;
    }

    Ok(result)
}

/// Apply a single filter to data
fn apply_filter(data: &[u8], filter: Filter, params: Option<&Dictionary>) -> ParseResult<Vec<u8>> {
    match filter {
        Filter::FlateDecode => {
            let inflated = decode_flate(data)?;
            match Predictor::from_params(params)? {
                Some(predictor) => apply_predictor(inflated, predictor),
                None => Ok(inflated),
            }
        }
        Filter::ASCIIHexDecode => decode_ascii_hex(data),
        Filter::ASCII85Decode => decode_ascii85(data),
    }
}

/// Decode FlateDecode (zlib/deflate) compressed data
fn decode_flate(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut result = Vec::new();
    match decoder.read_to_end(&mut result) {
        Ok(_) => Ok(result),
        // Truncated streams are common; keep what was inflated.
        Err(_) if !result.is_empty() => {
            tracing::warn!("Flate stream is truncated, keeping {} bytes", result.len());
            Ok(result)
        }
        Err(e) => Err(ParseError::StreamDecodeError(format!(
            "Flate decode error: {e}"
        ))),
    }
}

fn apply_predictor(data: Vec<u8>, predictor: Predictor) -> ParseResult<Vec<u8>> {
    // A row wider than the whole payload only comes from forged parameters.
    let row_length = predictor.row_length()?;
    if row_length > data.len() {
        return Err(ParseError::StreamDecodeError(format!(
            "Predictor row of {row_length} bytes exceeds the {} decoded bytes",
            data.len()
        )));
    }
    match predictor.predictor {
        2 => decode_tiff_predictor(data, predictor),
        10..=15 => decode_png_predictor(&data, predictor),
        other => Err(ParseError::StreamDecodeError(format!(
            "Unsupported predictor: {other}"
        ))),
    }
}

/// TIFF predictor 2, implemented for 8-bit components.
fn decode_tiff_predictor(mut data: Vec<u8>, predictor: Predictor) -> ParseResult<Vec<u8>> {
    if predictor.bits_per_component != 8 {
        return Ok(data);
    }
    let row_length = predictor.row_length()?;
    let bpp = predictor.bytes_per_pixel();
    for row in data.chunks_mut(row_length) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }
    Ok(data)
}

/// PNG predictors: every row starts with its own filter-type byte.
fn decode_png_predictor(data: &[u8], predictor: Predictor) -> ParseResult<Vec<u8>> {
    let row_length = predictor.row_length()?;
    let bpp = predictor.bytes_per_pixel();
    let mut output = Vec::with_capacity(data.len());
    let mut previous = vec![0u8; row_length];

    for chunk in data.chunks(row_length + 1) {
        let Some((&filter_type, encoded)) = chunk.split_first() else {
            break;
        };
        let mut row = vec![0u8; row_length];
        row[..encoded.len()].copy_from_slice(encoded);

        for i in 0..row_length {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = previous[i];
            let up_left = if i >= bpp { previous[i - bpp] } else { 0 };
            row[i] = match filter_type {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, up_left)),
                other => {
                    return Err(ParseError::StreamDecodeError(format!(
                        "Invalid PNG filter type: {other}"
                    )))
                }
            };
        }

        output.extend_from_slice(&row[..encoded.len()]);
        previous = row;
    }

    Ok(output)
}

fn paeth(left: u8, up: u8, up_left: u8) -> u8 {
    let p = left as i16 + up as i16 - up_left as i16;
    let pa = (p - left as i16).abs();
    let pb = (p - up as i16).abs();
    let pc = (p - up_left as i16).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        up
    } else {
        up_left
    }
}

/// Decode ASCIIHexDecode data
fn decode_ascii_hex(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut result = Vec::new();
    let mut pending: Option<u8> = None;

    for &byte in data {
        if byte == b'>' {
            break;
        }
        if byte.is_ascii_whitespace() {
            continue;
        }
        let value = hex_digit_value(byte).ok_or_else(|| {
            ParseError::StreamDecodeError(format!("Invalid hex digit: {}", byte as char))
        })?;
        match pending.take() {
            Some(high) => result.push((high << 4) | value),
            None => pending = Some(value),
        }
    }

    // Odd number of digits, pad with 0
    if let Some(high) = pending {
        result.push(high << 4);
    }
    Ok(result)
}

/// Get value of hex digit
fn hex_digit_value(ch: u8) -> Option<u8> {
    super::lexer::hex_digit_value(ch)
}

/// Decode ASCII85Decode data
fn decode_ascii85(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut result = Vec::new();
    let mut group: Vec<u8> = Vec::with_capacity(5);

    let data = data.strip_prefix(b"<~").unwrap_or(data);
    let mut chars = data.iter().copied().filter(|b| !b.is_ascii_whitespace());

    while let Some(c) = chars.next() {
        match c {
            b'~' => {
                // Check for end marker ~>
                if chars.next() == Some(b'>') {
                    break;
                }
                return Err(ParseError::StreamDecodeError(
                    "Invalid ASCII85 end marker".to_string(),
                ));
            }
            // Special case: 'z' represents four zero bytes
            b'z' if group.is_empty() => result.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group.push(c);
                if group.len() == 5 {
                    result.extend_from_slice(&ascii85_group_value(&group).to_be_bytes());
                    group.clear();
                }
            }
            _ => {
                return Err(ParseError::StreamDecodeError(format!(
                    "Invalid ASCII85 character: {}",
                    c as char
                )));
            }
        }
    }

    // Handle incomplete final group
    if !group.is_empty() {
        let original_len = group.len();
        group.resize(5, b'u');
        let bytes = ascii85_group_value(&group).to_be_bytes();
        result.extend_from_slice(&bytes[..original_len - 1]);
    }

    Ok(result)
}

fn ascii85_group_value(group: &[u8]) -> u32 {
    group
        .iter()
        .fold(0u32, |acc, &ch| acc.wrapping_mul(85).wrapping_add((ch - b'!') as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression;

    #[test]
    fn test_ascii_hex_decode() {
        assert_eq!(decode_ascii_hex(b"48656C6C6F>").unwrap(), b"Hello");
        assert_eq!(decode_ascii_hex(b"48 65 6C 6C 6F>").unwrap(), b"Hello");
        // Odd number of digits
        assert_eq!(decode_ascii_hex(b"48656C6C6>").unwrap(), b"Hell`");
        assert!(decode_ascii_hex(b"4G>").is_err());
    }

    #[test]
    fn test_ascii85_decode() {
        assert_eq!(decode_ascii85(b"87cURD]j7BEbo80~>").unwrap(), b"Hello world!");
        assert_eq!(decode_ascii85(b"<~87cURD]j7BEbo80~>").unwrap(), b"Hello world!");
        // Special case for zeros
        assert_eq!(decode_ascii85(b"z~>").unwrap(), &[0, 0, 0, 0]);
        assert!(decode_ascii85(b"abc~x").is_err());
    }

    #[test]
    fn test_filter_from_name() {
        assert_eq!(Filter::from_name("FlateDecode"), Some(Filter::FlateDecode));
        assert_eq!(Filter::from_name("Fl"), Some(Filter::FlateDecode));
        assert_eq!(Filter::from_name("AHx"), Some(Filter::ASCIIHexDecode));
        assert_eq!(Filter::from_name("DCTDecode"), None);
    }

    #[test]
    fn test_decode_without_filter() {
        let dict = Dictionary::new();
        assert_eq!(decode_stream(b"raw", &dict).unwrap(), b"raw");
    }

    #[test]
    fn test_decode_flate() {
        let compressed = compression::compress(b"stream payload").unwrap();
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::name("FlateDecode"));
        assert_eq!(decode_stream(&compressed, &dict).unwrap(), b"stream payload");
    }

    #[test]
    fn test_decode_filter_chain() {
        // ASCIIHex of the zlib bytes, then flate
        let compressed = compression::compress(b"chained").unwrap();
        let hex: String = compressed.iter().map(|b| format!("{b:02X}")).collect();
        let mut dict = Dictionary::new();
        dict.set(
            "Filter",
            Object::Array(vec![
                Object::name("ASCIIHexDecode"),
                Object::name("FlateDecode"),
            ]),
        );
        let decoded = decode_stream(format!("{hex}>").as_bytes(), &dict).unwrap();
        assert_eq!(decoded, b"chained");
    }

    #[test]
    fn test_unsupported_filter() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::name("JBIG2Decode"));
        assert!(matches!(
            decode_stream(b"", &dict),
            Err(ParseError::StreamDecodeError(_))
        ));
    }

    #[test]
    fn test_png_up_predictor() {
        // Two rows of 3 columns, filter type 2 (Up)
        let rows = [2u8, 1, 2, 3, 2, 1, 1, 1];
        let predictor = Predictor {
            predictor: 12,
            colors: 1,
            bits_per_component: 8,
            columns: 3,
        };
        let decoded = decode_png_predictor(&rows, predictor).unwrap();
        assert_eq!(decoded, vec![1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn test_png_sub_and_paeth_predictor() {
        let rows = [1u8, 5, 1, 1, 4, 0, 0, 0];
        let predictor = Predictor {
            predictor: 15,
            colors: 1,
            bits_per_component: 8,
            columns: 3,
        };
        let decoded = decode_png_predictor(&rows, predictor).unwrap();
        assert_eq!(decoded, vec![5, 6, 7, 5, 6, 7]);
    }

    #[test]
    fn test_flate_with_predictor_params() {
        let rows = [2u8, 0, 0, 10, 2, 0, 0, 1];
        let compressed = compression::compress(&rows).unwrap();
        let mut params = Dictionary::new();
        params.set("Predictor", 12);
        params.set("Columns", 3);
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::name("FlateDecode"));
        dict.set("DecodeParms", params);

        let decoded = decode_stream(&compressed, &dict).unwrap();
        assert_eq!(decoded, vec![0, 0, 10, 0, 0, 11]);
    }

    #[test]
    fn test_tiff_predictor() {
        let predictor = Predictor {
            predictor: 2,
            colors: 1,
            bits_per_component: 8,
            columns: 4,
        };
        let decoded = decode_tiff_predictor(vec![1, 1, 1, 1], predictor).unwrap();
        assert_eq!(decoded, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_hostile_predictor_params_are_rejected() {
        let compressed = compression::compress(&[2u8, 0, 0, 10]).unwrap();
        for (columns, colors, bits) in [
            (4_611_686_018_427_387_904i64, 4i64, 8i64),
            (1_099_511_627_776, 4, 8),
            (i64::MAX, 1_000_000, 16),
            (3, 1, 7),
        ] {
            let mut params = Dictionary::new();
            params.set("Predictor", 12);
            params.set("Columns", columns);
            params.set("Colors", colors);
            params.set("BitsPerComponent", bits);
            let mut dict = Dictionary::new();
            dict.set("Filter", Object::name("FlateDecode"));
            dict.set("DecodeParms", params);
            assert!(matches!(
                decode_stream(&compressed, &dict),
                Err(ParseError::StreamDecodeError(_))
            ));
        }
    }

    #[test]
    fn test_odd_bits_ignored_without_predictor() {
        let compressed = compression::compress(b"plain").unwrap();
        let mut params = Dictionary::new();
        params.set("BitsPerComponent", 7);
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::name("FlateDecode"));
        dict.set("DecodeParms", params);
        assert_eq!(decode_stream(&compressed, &dict).unwrap(), b"plain");
    }
}
