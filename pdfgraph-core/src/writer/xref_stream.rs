//! XRef stream writer for PDF 1.5+
//!
//! Writes cross-reference streams according to ISO 32000-1:2008
//! Section 7.5.8.

use crate::compression;
use crate::error::Result;
use crate::objects::{Dictionary, Object, Stream};
use crate::parser::xref::XRefEntry;
use std::cell::OnceCell;

/// Collects entries in ascending object-number order and encodes them with
/// the narrowest field widths that fit.
#[derive(Debug, Clone, Default)]
pub struct XRefStreamBuilder {
    entries: Vec<(u32, XRefEntry)>,
    widths: OnceCell<[usize; 3]>,
}

impl XRefStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, number: u32, entry: XRefEntry) {
        assert!(
            self.entries.last().map_or(true, |(last, _)| number > *last),
            "xref stream entries must be added in ascending order"
        );
        self.entries.push((number, entry));
        // Widths depend on every entry, including ones added later.
        self.widths = OnceCell::new();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `/W`: one byte for the type, then the minimum width of each column.
    pub fn widths(&self) -> [usize; 3] {
        *self.widths.get_or_init(|| {
            let (second, third) = self
                .entries
                .iter()
                .map(|(_, entry)| fields(entry))
                .fold((0, 0), |(second, third), (_, f2, f3)| {
                    (second.max(f2), third.max(f3))
                });
            [1, bytes_needed(second), bytes_needed(third)]
        })
    }

    /// `/Index`: pairs of `first count` for each run of consecutive numbers.
    pub fn index(&self) -> Vec<(u32, u32)> {
        let mut runs: Vec<(u32, u32)> = Vec::new();
        for (number, _) in &self.entries {
            match runs.last_mut() {
                Some((first, count)) if *first + *count == *number => *count += 1,
                _ => runs.push((*number, 1)),
            }
        }
        runs
    }

    /// Size of the table: one past the highest object number.
    pub fn size(&self) -> u32 {
        self.entries.last().map_or(0, |(number, _)| number + 1)
    }

    pub fn encode_entries(&self) -> Vec<u8> {
        let widths = self.widths();
        let mut data = Vec::with_capacity(self.entries.len() * widths.iter().sum::<usize>());
        for (_, entry) in &self.entries {
            let (kind, second, third) = fields(entry);
            write_field(&mut data, kind, widths[0]);
            write_field(&mut data, second, widths[1]);
            write_field(&mut data, third, widths[2]);
        }
        data
    }

    /// The xref stream object. `trailer` supplies `/Root`, `/Info` and the
    /// other document-level keys.
    pub fn to_stream(&self, trailer: &Dictionary, compress: bool) -> Result<Stream> {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("XRef"));
        dict.set("Size", self.size() as i64);
        dict.set(
            "W",
            Object::Array(self.widths().iter().map(|&w| Object::from(w)).collect()),
        );
        dict.set(
            "Index",
            Object::Array(
                self.index()
                    .into_iter()
                    .flat_map(|(first, count)| [Object::from(first as i64), Object::from(count as i64)])
                    .collect(),
            ),
        );
        for (key, value) in trailer {
            dict.set(key.clone(), value.clone());
        }

        let data = self.encode_entries();
        if compress {
            dict.set("Filter", Object::name("FlateDecode"));
            Ok(Stream::new(dict, compression::compress(&data)?))
        } else {
            Ok(Stream::new(dict, data))
        }
    }
}

fn fields(entry: &XRefEntry) -> (u64, u64, u64) {
    match *entry {
        XRefEntry::Free {
            next_free,
            generation,
        } => (0, next_free as u64, generation as u64),
        XRefEntry::InUse { offset, generation } => (1, offset, generation as u64),
        XRefEntry::Compressed {
            stream_number,
            index,
        } => (2, stream_number as u64, index as u64),
    }
}

/// Minimum bytes needed to represent a value; zero needs none.
fn bytes_needed(value: u64) -> usize {
    if value == 0 {
        0
    } else {
        ((value.ilog2() / 8) + 1) as usize
    }
}

fn write_field(data: &mut Vec<u8>, value: u64, width: usize) {
    for i in (0..width).rev() {
        data.push(((value >> (i * 8)) & 0xFF) as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::xref_stream::parse_xref_stream;

    #[test]
    fn test_bytes_needed() {
        assert_eq!(bytes_needed(0), 0);
        assert_eq!(bytes_needed(255), 1);
        assert_eq!(bytes_needed(256), 2);
        assert_eq!(bytes_needed(65535), 2);
        assert_eq!(bytes_needed(65536), 3);
        assert_eq!(bytes_needed(16777216), 4);
    }

    #[test]
    fn test_widths_invalidate_on_add() {
        let mut builder = XRefStreamBuilder::new();
        builder.add(
            1,
            XRefEntry::InUse {
                offset: 200,
                generation: 0,
            },
        );
        assert_eq!(builder.widths(), [1, 1, 0]);

        builder.add(
            2,
            XRefEntry::InUse {
                offset: 70000,
                generation: 0,
            },
        );
        assert_eq!(builder.widths(), [1, 3, 0]);

        builder.add(
            3,
            XRefEntry::Compressed {
                stream_number: 9,
                index: 300,
            },
        );
        assert_eq!(builder.widths(), [1, 3, 2]);
    }

    #[test]
    fn test_index_runs() {
        let mut builder = XRefStreamBuilder::new();
        for number in [0, 1, 2, 7, 8, 12] {
            builder.add(
                number,
                XRefEntry::InUse {
                    offset: 10,
                    generation: 0,
                },
            );
        }
        assert_eq!(builder.index(), vec![(0, 3), (7, 2), (12, 1)]);
        assert_eq!(builder.size(), 13);
    }

    #[test]
    fn test_stream_decodes_back() {
        let mut builder = XRefStreamBuilder::new();
        let entries = [
            (
                0,
                XRefEntry::Free {
                    next_free: 0,
                    generation: 65535,
                },
            ),
            (
                1,
                XRefEntry::InUse {
                    offset: 15,
                    generation: 0,
                },
            ),
            (
                2,
                XRefEntry::Compressed {
                    stream_number: 5,
                    index: 0,
                },
            ),
            (
                6,
                XRefEntry::InUse {
                    offset: 4000,
                    generation: 0,
                },
            ),
        ];
        for (number, entry) in entries {
            builder.add(number, entry);
        }
        let mut trailer = Dictionary::new();
        trailer.set("Root", Object::Reference(crate::objects::ObjectId::new(1, 0)));

        let stream = builder.to_stream(&trailer, true).unwrap();
        assert!(stream.dict().has_type("XRef"));
        assert_eq!(stream.dict().get_integer("Size"), Some(7));
        assert!(stream.dict().get_reference("Root").is_some());

        let table = parse_xref_stream(&stream).unwrap();
        for (number, entry) in entries {
            assert_eq!(table.get(number), Some(&entry));
        }
        assert_eq!(table.len(), 4);
    }
}
