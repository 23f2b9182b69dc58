//! PDF writing functionality
//!
//! Turns a [`Context`] into file bytes. Every object body is rendered
//! first, then a forward pass assigns byte offsets, and only then are the
//! header, bodies, cross-reference data and trailer emitted.

mod object_stream;
pub mod serialize;
mod xref;
mod xref_stream;

pub use object_stream::ObjectStreamBuilder;
pub use xref::XRefSectionBuilder;
pub use xref_stream::XRefStreamBuilder;

use crate::budget::WorkBudget;
use crate::context::{Context, TrailerInfo};
use crate::error::Result;
use crate::objects::{Dictionary, Object, ObjectId};
use crate::parser::xref::XRefEntry;
use crate::parser::PdfVersion;
use std::fs;
use std::path::Path;

/// Binary marker comment written after the version line.
const BINARY_MARKER: &[u8] = b"%\xE2\xE3\xCF\xD3\n";

/// Configuration for PDF writer
#[derive(Debug, Clone, PartialEq)]
pub struct WriterConfig {
    /// Pack eligible objects into object streams and index them with an
    /// xref stream instead of a classic table.
    pub use_object_streams: bool,
    pub objects_per_stream: usize,
    /// Objects serialized between two calls of the yield hook.
    pub objects_per_tick: usize,
    /// Flate-encode content streams and the object and xref streams the
    /// writer creates.
    pub compress_streams: bool,
    /// Header version; the context's version when unset.
    pub version: Option<PdfVersion>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            use_object_streams: false,
            objects_per_stream: 50,
            objects_per_tick: 50,
            compress_streams: true,
            version: None,
        }
    }
}

impl WriterConfig {
    pub fn with_object_streams(mut self, enabled: bool) -> Self {
        self.use_object_streams = enabled;
        self
    }

    pub fn with_objects_per_stream(mut self, count: usize) -> Self {
        self.objects_per_stream = count.max(1);
        self
    }

    pub fn with_objects_per_tick(mut self, count: usize) -> Self {
        self.objects_per_tick = count.max(1);
        self
    }

    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress_streams = enabled;
        self
    }

    pub fn with_version(mut self, version: PdfVersion) -> Self {
        self.version = Some(version);
        self
    }
}

/// One rendered `n g obj ... endobj` block.
struct Chunk {
    id: ObjectId,
    bytes: Vec<u8>,
}

pub struct PdfWriter<'a> {
    config: WriterConfig,
    budget: WorkBudget<'a>,
}

impl<'a> PdfWriter<'a> {
    pub fn new(config: WriterConfig) -> Self {
        let budget = WorkBudget::new(config.objects_per_tick);
        Self { config, budget }
    }

    /// Installs a hook that runs every `objects_per_tick` serialized objects.
    pub fn with_yield_hook(mut self, hook: impl FnMut(usize) + 'a) -> Self {
        self.budget.set_hook(Box::new(hook));
        self
    }

    pub fn write(&mut self, context: &Context) -> Result<Vec<u8>> {
        let version = self.config.version.unwrap_or_else(|| context.version());
        let mut header = format!("%PDF-{version}\n").into_bytes();
        header.extend_from_slice(BINARY_MARKER);

        let trailer = trailer_dictionary(context.trailer_info());
        let bytes = if self.config.use_object_streams {
            self.write_with_object_streams(context, header, &trailer)?
        } else {
            self.write_classic(context, header, &trailer)?
        };

        tracing::debug!(
            "Wrote {} objects in {} bytes ({} yield ticks)",
            context.object_count(),
            bytes.len(),
            self.budget.ticks()
        );
        Ok(bytes)
    }

    fn write_classic(
        &mut self,
        context: &Context,
        header: Vec<u8>,
        trailer: &Dictionary,
    ) -> Result<Vec<u8>> {
        let mut chunks = Vec::with_capacity(context.object_count());
        for (id, object) in context.enumerate_indirect_objects() {
            chunks.push(self.render(id, object)?);
        }

        let (offsets, xref_offset) = assign_offsets(header.len(), &chunks);

        let mut section = XRefSectionBuilder::new();
        section.add_free(0, 0, 65535);
        for (chunk, offset) in chunks.iter().zip(&offsets) {
            section.add_in_use(chunk.id.number(), *offset as u64, chunk.id.generation());
        }

        let mut trailer = trailer.clone();
        trailer.set("Size", section.size() as i64);
        let mut tail = section.render();
        tail.extend_from_slice(b"trailer\n");
        serialize::write_dictionary(&mut tail, &trailer);
        tail.extend_from_slice(format!("\nstartxref\n{xref_offset}\n%%EOF\n").as_bytes());

        Ok(emit(header, &chunks, &tail, xref_offset))
    }

    fn write_with_object_streams(
        &mut self,
        context: &Context,
        header: Vec<u8>,
        trailer: &Dictionary,
    ) -> Result<Vec<u8>> {
        let encrypt = context
            .trailer_info()
            .encrypt
            .as_ref()
            .and_then(Object::as_reference);

        let mut loose = Vec::new();
        let mut packs: Vec<ObjectStreamBuilder> = Vec::new();
        for (id, object) in context.enumerate_indirect_objects() {
            let must_stay_loose = matches!(object, Object::Stream(_) | Object::Invalid(_))
                || Some(id) == encrypt
                || id.generation() != 0;
            if must_stay_loose {
                loose.push(self.render(id, object)?);
                continue;
            }
            match packs.last_mut() {
                Some(pack) if pack.len() < self.config.objects_per_stream => pack.add(id, object),
                _ => {
                    let mut pack = ObjectStreamBuilder::new();
                    pack.add(id, object);
                    packs.push(pack);
                }
            }
            self.budget.spend();
        }

        // Object streams, then the xref stream, take the numbers after the
        // largest one in use.
        let mut next_number = context.largest_object_number() + 1;
        let mut entries: Vec<(u32, XRefEntry)> = Vec::new();
        let mut chunks = loose;
        for pack in &packs {
            let stream_id = ObjectId::new(next_number, 0);
            next_number += 1;
            for (index, member) in pack.ids().enumerate() {
                entries.push((
                    member.number(),
                    XRefEntry::Compressed {
                        stream_number: stream_id.number(),
                        index: index as u32,
                    },
                ));
            }
            let stream = pack.to_stream(self.config.compress_streams)?;
            chunks.push(Chunk {
                id: stream_id,
                bytes: serialize::indirect_object_to_bytes(
                    stream_id,
                    &Object::Stream(stream),
                    self.config.compress_streams,
                )?,
            });
        }
        let xref_id = ObjectId::new(next_number, 0);

        let (offsets, xref_offset) = assign_offsets(header.len(), &chunks);
        for (chunk, offset) in chunks.iter().zip(&offsets) {
            entries.push((
                chunk.id.number(),
                XRefEntry::InUse {
                    offset: *offset as u64,
                    generation: chunk.id.generation(),
                },
            ));
        }
        entries.push((
            xref_id.number(),
            XRefEntry::InUse {
                offset: xref_offset as u64,
                generation: 0,
            },
        ));
        entries.push((
            0,
            XRefEntry::Free {
                next_free: 0,
                generation: 65535,
            },
        ));
        entries.sort_by_key(|(number, _)| *number);

        let mut builder = XRefStreamBuilder::new();
        for (number, entry) in entries {
            builder.add(number, entry);
        }
        let xref_stream = builder.to_stream(trailer, self.config.compress_streams)?;
        let mut tail = serialize::indirect_object_to_bytes(
            xref_id,
            &Object::Stream(xref_stream),
            self.config.compress_streams,
        )?;
        tail.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());

        tracing::debug!(
            "Packed objects into {} object streams, {} loose",
            packs.len(),
            chunks.len() - packs.len()
        );
        Ok(emit(header, &chunks, &tail, xref_offset))
    }

    fn render(&mut self, id: ObjectId, object: &Object) -> Result<Chunk> {
        tracing::trace!("Serializing object {id}");
        let bytes = serialize::indirect_object_to_bytes(id, object, self.config.compress_streams)?;
        self.budget.spend();
        Ok(Chunk { id, bytes })
    }
}

/// Offsets of every chunk after the header, and the offset just past them.
fn assign_offsets(start: usize, chunks: &[Chunk]) -> (Vec<usize>, usize) {
    let mut offset = start;
    let offsets = chunks
        .iter()
        .map(|chunk| {
            let this = offset;
            offset += chunk.bytes.len();
            this
        })
        .collect();
    (offsets, offset)
}

fn emit(header: Vec<u8>, chunks: &[Chunk], tail: &[u8], xref_offset: usize) -> Vec<u8> {
    let total = xref_offset + tail.len();
    let mut out = header;
    out.reserve_exact(total.saturating_sub(out.len()));
    for chunk in chunks {
        out.extend_from_slice(&chunk.bytes);
    }
    assert_eq!(out.len(), xref_offset, "object offsets diverged from emitted bytes");
    out.extend_from_slice(tail);
    assert_eq!(out.len(), total, "computed file size diverged from emitted bytes");
    out
}

fn trailer_dictionary(info: &TrailerInfo) -> Dictionary {
    let mut trailer = Dictionary::new();
    match info.root {
        Some(root) => trailer.set("Root", Object::Reference(root)),
        None => tracing::warn!("Writing a document without a /Root catalog"),
    }
    for (key, value) in [
        ("Encrypt", &info.encrypt),
        ("Info", &info.info),
        ("ID", &info.id),
    ] {
        if let Some(value) = value {
            trailer.set(key, value.clone());
        }
    }
    trailer
}

/// Serializes `context` to PDF bytes.
pub fn save(context: &Context, config: &WriterConfig) -> Result<Vec<u8>> {
    PdfWriter::new(config.clone()).write(context)
}

pub fn save_to_file(context: &Context, path: impl AsRef<Path>, config: &WriterConfig) -> Result<()> {
    let bytes = save(context, config)?;
    fs::write(path, bytes)?;
    Ok(())
}
