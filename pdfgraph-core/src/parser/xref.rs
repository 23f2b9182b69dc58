//! Cross-reference model and classic `xref` table parsing (ISO 32000-1 Section 7.5.4)

use super::cursor::ByteCursor;
use super::lexer;
use super::objects::ObjectParser;
use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Where an object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Deleted object; `next_free` links the free list.
    Free { next_free: u32, generation: u16 },
    /// Uncompressed object at a byte offset in the file.
    InUse { offset: u64, generation: u16 },
    /// Object packed at `index` inside object stream `stream_number`.
    Compressed { stream_number: u32, index: u32 },
}

impl XRefEntry {
    pub fn generation(&self) -> u16 {
        match self {
            XRefEntry::Free { generation, .. } | XRefEntry::InUse { generation, .. } => {
                *generation
            }
            XRefEntry::Compressed { .. } => 0,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, XRefEntry::Free { .. })
    }
}

/// Object number to location, kept in ascending object-number order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XRefTable {
    entries: BTreeMap<u32, XRefEntry>,
}

impl XRefTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, number: u32, entry: XRefEntry) {
        self.entries.insert(number, entry);
    }

    /// Inserts unless `number` already has an entry. Returns whether it did.
    pub fn insert_if_absent(&mut self, number: u32, entry: XRefEntry) -> bool {
        match self.entries.entry(number) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Fills gaps and free slots from a section of the same revision (the
    /// `/XRefStm` of a hybrid file).
    pub fn overlay_hybrid(&mut self, stream_section: &XRefTable) {
        for (&number, &entry) in &stream_section.entries {
            match self.entries.get(&number) {
                Some(existing) if !existing.is_free() => {}
                _ => {
                    self.entries.insert(number, entry);
                }
            }
        }
    }

    /// Merges an older revision: entries already present stay, since newer wins.
    pub fn merge_older(&mut self, older: &XRefTable) {
        for (&number, &entry) in &older.entries {
            self.insert_if_absent(number, entry);
        }
    }

    pub fn get(&self, number: u32) -> Option<&XRefEntry> {
        self.entries.get(&number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ascending by object number.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &XRefEntry)> {
        self.entries.iter().map(|(number, entry)| (*number, entry))
    }
}

/// Offset announced by the last `startxref` in the file.
pub fn find_startxref(bytes: &[u8]) -> Option<usize> {
    let mut cursor = ByteCursor::new(bytes);
    let position = cursor.rfind_before(b"startxref", bytes.len())?;
    cursor.move_to(position + b"startxref".len());
    lexer::skip_whitespace_and_comments(&mut cursor);
    lexer::read_unsigned(&mut cursor).and_then(|offset| usize::try_from(offset).ok())
}

/// Parses `xref` subsections followed by `trailer <<...>>`, with the parser
/// positioned at the `xref` keyword.
pub fn parse_classic_section(parser: &mut ObjectParser<'_>) -> ParseResult<(XRefTable, Dictionary)> {
    let cursor = parser.cursor_mut();
    lexer::skip_whitespace_and_comments(cursor);
    if !lexer::at_keyword(cursor, b"xref") {
        return Err(ParseError::InvalidXRef);
    }
    cursor.advance(b"xref".len());

    let mut table = XRefTable::new();
    loop {
        lexer::skip_whitespace_and_comments(cursor);
        if lexer::at_keyword(cursor, b"trailer") {
            cursor.advance(b"trailer".len());
            break;
        }
        let first = read_u32(cursor)?;
        lexer::skip_whitespace(cursor);
        let count = read_u32(cursor)?;

        for number in first..first.saturating_add(count) {
            let entry = parse_xref_record(cursor)?;
            table.insert_if_absent(number, entry);
        }
    }

    match parser.parse_object()? {
        Object::Dictionary(trailer) => Ok((table, trailer)),
        _ => Err(ParseError::InvalidTrailer),
    }
}

fn read_u32(cursor: &mut ByteCursor<'_>) -> ParseResult<u32> {
    lexer::read_unsigned(cursor)
        .and_then(|value| u32::try_from(value).ok())
        .ok_or(ParseError::InvalidXRef)
}

/// One `oooooooooo ggggg n` record. Records are read by token rather than by
/// width so 19- and 21-byte variants also work.
fn parse_xref_record(cursor: &mut ByteCursor<'_>) -> ParseResult<XRefEntry> {
    lexer::skip_whitespace(cursor);
    let offset = lexer::read_unsigned(cursor).ok_or(ParseError::InvalidXRef)?;
    lexer::skip_whitespace(cursor);
    let generation = lexer::read_unsigned(cursor).ok_or(ParseError::InvalidXRef)?;
    let generation = u16::try_from(generation).unwrap_or(u16::MAX);
    lexer::skip_whitespace(cursor);

    match cursor.next() {
        Some(b'n') => Ok(XRefEntry::InUse { offset, generation }),
        Some(b'f') => Ok(XRefEntry::Free {
            next_free: u32::try_from(offset).unwrap_or(0),
            generation,
        }),
        _ => Err(ParseError::InvalidXRef),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseOptions;

    fn parse(input: &[u8]) -> ParseResult<(XRefTable, Dictionary)> {
        let mut parser = ObjectParser::new(input, ParseOptions::default());
        parse_classic_section(&mut parser)
    }

    #[test]
    fn test_parse_single_subsection() {
        let input = b"xref\n0 3\n0000000000 65535 f \n0000000015 00000 n \n0000000079 00000 n \ntrailer\n<< /Size 3 /Root 1 0 R >>";
        let (table, trailer) = parse(input).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.get(0),
            Some(&XRefEntry::Free {
                next_free: 0,
                generation: 65535
            })
        );
        assert_eq!(
            table.get(2),
            Some(&XRefEntry::InUse {
                offset: 79,
                generation: 0
            })
        );
        assert_eq!(trailer.get_integer("Size"), Some(3));
    }

    #[test]
    fn test_parse_multiple_subsections() {
        let input = b"xref\r\n0 1\r\n0000000000 65535 f\r\n4 2\r\n0000000100 00000 n\r\n0000000200 00001 n\r\ntrailer<</Size 6>>";
        let (table, _) = parse(input).unwrap();
        let numbers: Vec<u32> = table.iter().map(|(n, _)| n).collect();
        assert_eq!(numbers, vec![0, 4, 5]);
        assert_eq!(table.get(5).unwrap().generation(), 1);
    }

    #[test]
    fn test_invalid_record() {
        let input = b"xref\n0 1\n0000000000 65535 x \ntrailer\n<<>>";
        assert!(matches!(parse(input), Err(ParseError::InvalidXRef)));
    }

    #[test]
    fn test_trailer_must_be_dictionary() {
        let input = b"xref\n0 0\ntrailer\n[1 2]";
        assert!(matches!(parse(input), Err(ParseError::InvalidTrailer)));
    }

    #[test]
    fn test_find_startxref_uses_last() {
        let input = b"startxref\n10\n%%EOF\nmore\nstartxref\r\n  1234\r\n%%EOF";
        assert_eq!(find_startxref(input), Some(1234));
        assert_eq!(find_startxref(b"no marker"), None);
    }

    #[test]
    fn test_merge_older_keeps_newer() {
        let mut newer = XRefTable::new();
        newer.insert(
            1,
            XRefEntry::InUse {
                offset: 500,
                generation: 0,
            },
        );
        let mut older = XRefTable::new();
        older.insert(
            1,
            XRefEntry::InUse {
                offset: 10,
                generation: 0,
            },
        );
        older.insert(
            2,
            XRefEntry::InUse {
                offset: 20,
                generation: 0,
            },
        );
        newer.merge_older(&older);
        assert_eq!(
            newer.get(1),
            Some(&XRefEntry::InUse {
                offset: 500,
                generation: 0
            })
        );
        assert_eq!(newer.len(), 2);
    }

    #[test]
    fn test_overlay_hybrid_fills_free_slots() {
        let mut table = XRefTable::new();
        table.insert(
            3,
            XRefEntry::Free {
                next_free: 0,
                generation: 0,
            },
        );
        table.insert(
            4,
            XRefEntry::InUse {
                offset: 9,
                generation: 0,
            },
        );
        let mut stream = XRefTable::new();
        stream.insert(
            3,
            XRefEntry::Compressed {
                stream_number: 8,
                index: 0,
            },
        );
        stream.insert(
            4,
            XRefEntry::Compressed {
                stream_number: 8,
                index: 1,
            },
        );
        table.overlay_hybrid(&stream);
        assert!(matches!(table.get(3), Some(XRefEntry::Compressed { .. })));
        assert!(matches!(table.get(4), Some(XRefEntry::InUse { .. })));
    }
}
