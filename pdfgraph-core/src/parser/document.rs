//! PDF Document Parser
//!
//! Drives the object parser across a whole file. The primary path follows
//! `startxref` through every revision's cross-reference section (classic
//! tables, xref streams and hybrid `/XRefStm` files) with the newest entry
//! for each object number winning. Objects whose offsets are wrong are
//! located by a sequential scan, which also serves as the full fallback when
//! no usable cross-reference data exists.

use super::cursor::ByteCursor;
use super::header::PdfHeader;
use super::object_stream::parse_object_stream;
use super::objects::ObjectParser;
use super::xref::{self, XRefEntry, XRefTable};
use super::xref_stream::parse_xref_stream;
use super::{lexer, ParseError, ParseOptions, ParseResult};
use crate::budget::WorkBudget;
use crate::context::{Context, TrailerInfo};
use crate::objects::{Dictionary, Object, ObjectId};
use std::collections::{BTreeMap, HashSet};

/// An object as found in the file.
#[derive(Debug, Clone)]
struct Located {
    object: Object,
    /// Offset of the object, or of its object stream when compressed.
    offset: usize,
}

type LocatedObjects = BTreeMap<ObjectId, Located>;

/// Single-use document loader. [`DocumentParser::parse`] consumes it.
pub struct DocumentParser<'a> {
    bytes: &'a [u8],
    options: ParseOptions,
    budget: WorkBudget<'a>,
    header_offset: usize,
    body_start: usize,
}

impl<'a> DocumentParser<'a> {
    pub fn new(bytes: &'a [u8], options: ParseOptions) -> Self {
        Self {
            bytes,
            options,
            budget: WorkBudget::new(options.objects_per_tick),
            header_offset: 0,
            body_start: 0,
        }
    }

    /// Installs a hook that runs every `objects_per_tick` loaded objects.
    pub fn with_yield_hook(mut self, hook: impl FnMut(usize) + 'a) -> Self {
        self.budget.set_hook(Box::new(hook));
        self
    }

    pub fn parse(mut self) -> ParseResult<Context> {
        let mut cursor = ByteCursor::new(self.bytes);
        let header = PdfHeader::parse(&mut cursor)?;
        self.header_offset = header.offset;
        self.body_start = cursor.offset();
        tracing::debug!(
            "Parsing PDF {} ({} bytes, binary marker: {})",
            header.version,
            self.bytes.len(),
            header.has_binary_marker
        );

        let (mut objects, mut trailer, mut scanned) = match self.read_xref_chain() {
            Ok((table, trailer)) if !table.is_empty() => {
                (self.load_from_xref(&table)?, trailer, false)
            }
            Ok(_) => {
                tracing::warn!("Cross-reference data is empty, scanning the file for objects");
                let (objects, trailer) = self.scan_document()?;
                (objects, trailer, true)
            }
            Err(err) => {
                tracing::warn!("Cross-reference data unusable ({err}), scanning the file for objects");
                let (objects, trailer) = self.scan_document()?;
                (objects, trailer, true)
            }
        };

        let root = loop {
            match resolve_root(trailer.get_reference("Root"), &objects) {
                Ok(root) => break root,
                Err(err) if scanned => return Err(err),
                Err(_) => {
                    tracing::warn!("No catalog reachable through cross-reference data, rescanning");
                    let (rescanned, rescanned_trailer) = self.scan_document()?;
                    objects = rescanned;
                    trailer = merge_trailers(rescanned_trailer, &trailer);
                    scanned = true;
                }
            }
        };

        let mut context = Context::new();
        context.set_version(header.version);
        for (id, located) in objects {
            context.assign(id, located.object);
        }
        *context.trailer_info_mut() = TrailerInfo {
            root: Some(root),
            encrypt: trailer.get("Encrypt").cloned(),
            info: trailer.get("Info").cloned(),
            id: trailer.get("ID").cloned(),
        };
        tracing::debug!(
            "Loaded {} objects, root {root}, {} yield ticks",
            context.object_count(),
            self.budget.ticks()
        );
        Ok(context)
    }

    /// Follows `startxref` and the `/Prev` chain. Entries and trailer keys
    /// from newer revisions shadow older ones.
    fn read_xref_chain(&self) -> ParseResult<(XRefTable, Dictionary)> {
        let start = xref::find_startxref(self.bytes).ok_or(ParseError::InvalidXRef)?;
        let mut table = XRefTable::new();
        let mut trailer = Dictionary::new();
        let mut visited = HashSet::new();
        let mut next = Some(start);

        while let Some(offset) = next {
            if !visited.insert(offset) {
                tracing::warn!("Cross-reference chain loops back to offset {offset}");
                break;
            }
            let (section, section_trailer) = self.read_xref_section(offset)?;
            table.merge_older(&section);
            next = section_trailer
                .get_integer("Prev")
                .and_then(|prev| usize::try_from(prev).ok());
            trailer = merge_trailers(trailer, &section_trailer);
        }

        tracing::debug!(
            "Read {} cross-reference entries from {} revision(s)",
            table.len(),
            visited.len()
        );
        Ok((table, trailer))
    }

    /// Reads the section at `offset`, retrying relative to the header when
    /// the file has bytes in front of `%PDF-`.
    fn read_xref_section(&self, offset: usize) -> ParseResult<(XRefTable, Dictionary)> {
        match self.read_xref_section_at(offset) {
            Err(err) if self.header_offset > 0 => self
                .read_xref_section_at(offset + self.header_offset)
                .map_err(|_| err),
            result => result,
        }
    }

    fn read_xref_section_at(&self, offset: usize) -> ParseResult<(XRefTable, Dictionary)> {
        if offset >= self.bytes.len() {
            return Err(ParseError::InvalidXRef);
        }
        let mut parser = ObjectParser::at(self.bytes, offset, self.options);
        lexer::skip_whitespace_and_comments(parser.cursor_mut());

        if lexer::at_keyword(parser.cursor(), b"xref") {
            let (mut table, trailer) = xref::parse_classic_section(&mut parser)?;
            if let Some(stream_offset) = trailer
                .get_integer("XRefStm")
                .and_then(|offset| usize::try_from(offset).ok())
            {
                match self.read_xref_stream_at(stream_offset) {
                    Ok((stream_table, _)) => table.overlay_hybrid(&stream_table),
                    Err(err) => tracing::warn!("Ignoring unreadable /XRefStm at {stream_offset}: {err}"),
                }
            }
            return Ok((table, trailer));
        }

        self.read_xref_stream_at(offset)
    }

    fn read_xref_stream_at(&self, offset: usize) -> ParseResult<(XRefTable, Dictionary)> {
        let mut parser = ObjectParser::at(self.bytes, offset, self.options);
        let (_, object) = parser.parse_indirect_object()?;
        match object {
            Object::Stream(stream) if stream.dict().has_type("XRef") => {
                let table = parse_xref_stream(&stream)?;
                Ok((table, stream.dict().clone()))
            }
            _ => Err(ParseError::InvalidXRef),
        }
    }

    fn load_from_xref(&mut self, table: &XRefTable) -> ParseResult<LocatedObjects> {
        let bytes = self.bytes;
        let options = self.options;
        let resolve_length = |id: ObjectId| -> Option<i64> {
            match table.get(id.number())? {
                XRefEntry::InUse { offset, .. } => {
                    let offset = usize::try_from(*offset).ok()?;
                    let mut parser = ObjectParser::at(bytes, offset, options);
                    parser.parse_indirect_object().ok()?.1.as_integer()
                }
                _ => None,
            }
        };

        let mut objects = LocatedObjects::new();
        let mut compressed: BTreeMap<u32, Vec<(u32, u32)>> = BTreeMap::new();
        let mut misplaced = Vec::new();

        for (number, entry) in table.iter() {
            if number == 0 {
                continue;
            }
            match *entry {
                XRefEntry::Free { .. } => {}
                XRefEntry::InUse { offset, .. } => {
                    let Some(offset) = usize::try_from(offset)
                        .ok()
                        .filter(|&offset| offset < bytes.len())
                    else {
                        misplaced.push(number);
                        continue;
                    };
                    let mut parser =
                        ObjectParser::at(bytes, offset, options).with_length_resolver(&resolve_length);
                    match read_block(&mut parser, options.strict)? {
                        Some((id, object)) if id.number() == number => {
                            objects.insert(id, Located { object, offset });
                            self.budget.spend();
                        }
                        _ => misplaced.push(number),
                    }
                }
                XRefEntry::Compressed {
                    stream_number,
                    index,
                } => compressed
                    .entry(stream_number)
                    .or_default()
                    .push((number, index)),
            }
        }

        if !misplaced.is_empty() {
            tracing::warn!(
                "{} cross-reference offsets do not point at their objects, scanning for them",
                misplaced.len()
            );
            let (scanned, _) = self.scan_document()?;
            for number in misplaced {
                let newest = scanned
                    .range(ObjectId::new(number, 0)..=ObjectId::new(number, u16::MAX))
                    .max_by_key(|(_, located)| located.offset);
                match newest {
                    Some((id, located)) => {
                        objects.insert(*id, located.clone());
                    }
                    None => tracing::warn!("Object {number} is listed but could not be found"),
                }
            }
        }

        for (stream_number, members) in compressed {
            self.load_compressed(&mut objects, stream_number, &members)?;
        }

        objects.retain(|_, located| !is_container(&located.object));
        Ok(objects)
    }

    /// Unpacks the listed `(object number, index)` members of one object stream.
    fn load_compressed(
        &mut self,
        objects: &mut LocatedObjects,
        stream_number: u32,
        members: &[(u32, u32)],
    ) -> ParseResult<()> {
        let container = objects
            .range(ObjectId::new(stream_number, 0)..=ObjectId::new(stream_number, u16::MAX))
            .next()
            .map(|(_, located)| located.clone());
        let Some(Located {
            object: Object::Stream(stream),
            offset,
        }) = container
        else {
            tracing::warn!("Object stream {stream_number} is missing, dropping {} objects", members.len());
            return Ok(());
        };

        let contents = match parse_object_stream(&stream, self.options) {
            Ok(contents) => contents,
            Err(err) if self.options.strict => return Err(err),
            Err(err) => {
                tracing::warn!("Object stream {stream_number} is unreadable: {err}");
                return Ok(());
            }
        };

        for &(number, index) in members {
            match contents.get(index as usize, number) {
                Some(object) => {
                    objects.insert(
                        ObjectId::new(number, 0),
                        Located {
                            object: object.clone(),
                            offset,
                        },
                    );
                    self.budget.spend();
                }
                None => tracing::warn!("Object {number} is not in object stream {stream_number}"),
            }
        }
        Ok(())
    }

    /// Reads every `n g obj ... endobj` block from the start of the body,
    /// skipping whatever garbage lies between them. Later definitions win.
    /// Trailers found along the way are merged, newer keys shadowing older.
    fn scan_document(&mut self) -> ParseResult<(LocatedObjects, Dictionary)> {
        let options = self.options;
        let mut parser = ObjectParser::at(self.bytes, self.body_start, options);
        let mut objects = LocatedObjects::new();
        let mut trailer = Dictionary::new();
        let mut garbage = 0usize;

        loop {
            lexer::skip_whitespace_and_comments(parser.cursor_mut());
            if parser.cursor().done() {
                break;
            }
            let start = parser.offset();

            if lexer::at_keyword(parser.cursor(), b"xref") {
                match xref::parse_classic_section(&mut parser) {
                    Ok((_, section_trailer)) => {
                        trailer = merge_trailers(section_trailer, &trailer);
                    }
                    Err(err) => {
                        tracing::debug!("Skipping broken xref section at {start}: {err}");
                        parser.move_to(start + b"xref".len());
                    }
                }
                continue;
            }
            if lexer::at_keyword(parser.cursor(), b"trailer") {
                parser.cursor_mut().advance(b"trailer".len());
                if let Ok(Object::Dictionary(dict)) = parser.parse_object() {
                    trailer = merge_trailers(dict, &trailer);
                }
                continue;
            }
            if lexer::at_keyword(parser.cursor(), b"startxref") {
                let cursor = parser.cursor_mut();
                cursor.advance(b"startxref".len());
                lexer::skip_whitespace(cursor);
                lexer::read_unsigned(cursor);
                continue;
            }

            if let Some((id, object)) = read_block(&mut parser, options.strict)? {
                if let Object::Stream(stream) = &object {
                    if stream.dict().has_type("XRef") {
                        trailer = merge_trailers(stream.dict().clone(), &trailer);
                    }
                }
                if !insert_newest(&mut objects, id, Located { object, offset: start }) {
                    tracing::debug!("Ignoring object {id} at offset {start}, a newer generation is loaded");
                }
                self.budget.spend();
                garbage = 0;
                continue;
            }

            let cursor = parser.cursor_mut();
            if lexer::read_keyword(cursor).is_empty() {
                cursor.advance(1);
            }
            garbage += parser.offset() - start;
            if garbage > options.max_recovery_scan {
                tracing::warn!("Giving up after {garbage} bytes without an object at offset {start}");
                break;
            }
        }

        self.unpack_scanned_object_streams(&mut objects)?;
        objects.retain(|_, located| !is_container(&located.object));
        tracing::debug!("Scan recovered {} objects", objects.len());
        Ok((objects, trailer))
    }

    /// Members of scanned object streams fill gaps, and replace loose
    /// definitions that appear earlier in the file.
    fn unpack_scanned_object_streams(&mut self, objects: &mut LocatedObjects) -> ParseResult<()> {
        let containers: Vec<(ObjectId, Located)> = objects
            .iter()
            .filter(|(_, located)| {
                matches!(&located.object, Object::Stream(stream) if stream.dict().has_type("ObjStm"))
            })
            .map(|(id, located)| (*id, located.clone()))
            .collect();

        for (id, located) in containers {
            let Object::Stream(stream) = &located.object else {
                continue;
            };
            let contents = match parse_object_stream(stream, self.options) {
                Ok(contents) => contents,
                Err(err) if self.options.strict => return Err(err),
                Err(err) => {
                    tracing::warn!("Object stream {id} is unreadable: {err}");
                    continue;
                }
            };
            for (member, object) in contents.objects {
                let unpacked = Located {
                    object,
                    offset: located.offset,
                };
                if insert_newest(objects, member, unpacked) {
                    self.budget.spend();
                }
            }
        }
        Ok(())
    }
}

/// Parses the block at the parser position. `Ok(None)` means no object
/// header is there. In lenient mode a body that fails to parse becomes
/// [`Object::Invalid`] holding its raw bytes.
fn read_block(
    parser: &mut ObjectParser<'_>,
    strict: bool,
) -> ParseResult<Option<(ObjectId, Object)>> {
    let start = parser.offset();
    let Some(id) = parser.parse_indirect_header() else {
        return Ok(None);
    };
    parser.move_to(start);

    match parser.parse_indirect_object() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(err) if strict => Err(err),
        Err(err) => {
            tracing::warn!("Object {id} could not be parsed ({err}), keeping it as invalid");
            parser.move_to(start);
            parser.parse_indirect_header();
            let body_start = parser.offset();
            let raw = match parser.skip_to_endobj() {
                Ok(raw) => lexer::trim_whitespace(raw).to_vec(),
                Err(_) => {
                    parser.move_to(body_start);
                    Vec::new()
                }
            };
            Ok(Some((id, Object::Invalid(raw))))
        }
    }
}

/// Keeps one live generation per object number: the highest generation
/// wins, then the later offset. Returns false if `id` lost.
fn insert_newest(objects: &mut LocatedObjects, id: ObjectId, located: Located) -> bool {
    let current = objects
        .range(ObjectId::new(id.number(), 0)..=ObjectId::new(id.number(), u16::MAX))
        .next()
        .map(|(current, existing)| (*current, existing.offset));
    if let Some((current, offset)) = current {
        if (current.generation(), offset) > (id.generation(), located.offset) {
            return false;
        }
        objects.remove(&current);
    }
    objects.insert(id, located);
    true
}


/// `newer` keeps its entries; keys only `older` has are added.
fn merge_trailers(mut newer: Dictionary, older: &Dictionary) -> Dictionary {
    for (key, value) in older {
        if !newer.contains_key(key) {
            newer.set(key.clone(), value.clone());
        }
    }
    newer
}

/// Object streams and xref streams are file structure, not document content.
fn is_container(object: &Object) -> bool {
    matches!(object, Object::Stream(stream)
        if stream.dict().has_type("ObjStm") || stream.dict().has_type("XRef"))
}

/// The declared root when it is a dictionary, otherwise the catalog that
/// appears latest in the file (the newest revision's). Ties go to the larger
/// object number.
fn resolve_root(declared: Option<ObjectId>, objects: &LocatedObjects) -> ParseResult<ObjectId> {
    if let Some(root) = declared {
        if matches!(
            objects.get(&root),
            Some(Located {
                object: Object::Dictionary(_),
                ..
            })
        ) {
            return Ok(root);
        }
        tracing::warn!("Declared /Root {root} is missing or not a dictionary, searching for a catalog");
    } else {
        tracing::warn!("Trailer has no /Root, searching for a catalog");
    }

    objects
        .iter()
        .filter(|(_, located)| {
            matches!(&located.object, Object::Dictionary(dict) if dict.has_type("Catalog"))
        })
        .max_by_key(|(id, located)| (located.offset, id.number()))
        .map(|(id, _)| *id)
        .ok_or(ParseError::MissingRoot)
}
