//! Object stream packing (ISO 32000-1 Section 7.5.7)

use super::serialize;
use crate::compression;
use crate::error::Result;
use crate::objects::{Dictionary, Object, ObjectId, Stream};

/// Ordered members of one `/ObjStm`, held pre-serialized.
#[derive(Debug, Clone, Default)]
pub struct ObjectStreamBuilder {
    members: Vec<(ObjectId, Vec<u8>)>,
}

impl ObjectStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a direct object. Streams cannot be packed.
    pub fn add(&mut self, id: ObjectId, object: &Object) {
        debug_assert!(!matches!(object, Object::Stream(_)));
        self.members.push((id, serialize::object_to_bytes(object)));
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.members.iter().map(|(id, _)| *id)
    }

    /// The `"objNum offset "` header and the concatenated bodies. Offsets are
    /// cumulative body sizes, so `/First` is the header's length.
    fn layout(&self) -> (Vec<u8>, Vec<u8>) {
        let mut header = Vec::new();
        let mut body = Vec::new();
        for (id, bytes) in &self.members {
            header.extend_from_slice(format!("{} {} ", id.number(), body.len()).as_bytes());
            body.extend_from_slice(bytes);
            body.push(b'\n');
        }
        (header, body)
    }

    pub fn to_stream(&self, compress: bool) -> Result<Stream> {
        let (header, body) = self.layout();
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("ObjStm"));
        dict.set("N", self.members.len());
        dict.set("First", header.len());

        let mut payload = header;
        payload.extend_from_slice(&body);
        if compress {
            dict.set("Filter", Object::name("FlateDecode"));
            payload = compression::compress(&payload)?;
        }
        Ok(Stream::new(dict, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::object_stream::parse_object_stream;
    use crate::parser::ParseOptions;

    #[test]
    fn test_header_and_first() {
        let mut builder = ObjectStreamBuilder::new();
        builder.add(ObjectId::new(3, 0), &Object::Integer(7));
        builder.add(ObjectId::new(4, 0), &Object::name("Hi"));
        let stream = builder.to_stream(false).unwrap();
        assert_eq!(stream.raw_data(), Some(&b"3 0 4 2 7\n/Hi\n"[..]));
        assert_eq!(stream.dict().get_integer("N"), Some(2));
        assert_eq!(stream.dict().get_integer("First"), Some(8));
    }

    #[test]
    fn test_packed_members_unpack() {
        let mut builder = ObjectStreamBuilder::new();
        let mut dict = Dictionary::new();
        dict.set("Kids", Object::Array(vec![Object::Reference(ObjectId::new(9, 0))]));
        let members = vec![
            (ObjectId::new(2, 0), Object::Dictionary(dict)),
            (ObjectId::new(5, 0), Object::string("text (with) parens")),
            (ObjectId::new(6, 0), Object::Real(1.25)),
        ];
        for (id, object) in &members {
            builder.add(*id, object);
        }
        let stream = builder.to_stream(true).unwrap();
        let contents = parse_object_stream(&stream, ParseOptions::default()).unwrap();
        assert_eq!(contents.objects, members);
    }
}
