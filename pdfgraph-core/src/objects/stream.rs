use crate::compression;
use crate::error::Result;
use crate::objects::{Dictionary, Object, Operator};
use crate::parser::{content, filters};
use crate::writer::serialize;

/// Payload of a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamContent {
    /// Bytes exactly as they appear (or will appear) between `stream` and `endstream`.
    Raw(Vec<u8>),
    /// Content-stream operators, serialized only when the stream is written.
    Operators {
        operators: Vec<Operator>,
        encode: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    dict: Dictionary,
    content: StreamContent,
}

impl Stream {
    pub fn new(dict: Dictionary, data: Vec<u8>) -> Self {
        Self {
            dict,
            content: StreamContent::Raw(data),
        }
    }

    /// Content stream whose bytes are produced lazily from `operators`.
    /// With `encode` set the bytes are flate-compressed on output.
    pub fn from_operators(dict: Dictionary, operators: Vec<Operator>, encode: bool) -> Self {
        Self {
            dict,
            content: StreamContent::Operators { operators, encode },
        }
    }

    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    pub fn dict_mut(&mut self) -> &mut Dictionary {
        &mut self.dict
    }

    pub fn content(&self) -> &StreamContent {
        &self.content
    }

    /// Raw bytes, if this stream is not a lazily encoded operator list.
    pub fn raw_data(&self) -> Option<&[u8]> {
        match &self.content {
            StreamContent::Raw(data) => Some(data),
            StreamContent::Operators { .. } => None,
        }
    }

    /// Appends operators to a lazily encoded content stream. Raw streams are
    /// decoded into operators first.
    pub fn push_operators(&mut self, extra: impl IntoIterator<Item = Operator>) -> Result<()> {
        if let StreamContent::Raw(_) = self.content {
            let operators = self.operators()?;
            let encode = self.dict.contains_key("Filter");
            self.dict.remove("Filter");
            self.dict.remove("DecodeParms");
            self.content = StreamContent::Operators { operators, encode };
        }
        if let StreamContent::Operators { operators, .. } = &mut self.content {
            operators.extend(extra);
        }
        Ok(())
    }

    /// Dictionary and bytes as they must be written, with `/Length` recomputed.
    pub fn encoded(&self) -> Result<(Dictionary, Vec<u8>)> {
        self.encoded_with(true)
    }

    /// Like [`Stream::encoded`]; with `allow_compression` unset, operator
    /// streams are written as plain text even when marked for encoding.
    pub fn encoded_with(&self, allow_compression: bool) -> Result<(Dictionary, Vec<u8>)> {
        let mut dict = self.dict.clone();
        let data = match &self.content {
            StreamContent::Raw(data) => data.clone(),
            StreamContent::Operators { operators, encode } => {
                let bytes = serialize::operators_to_bytes(operators);
                if *encode && allow_compression {
                    dict.set("Filter", Object::name("FlateDecode"));
                    compression::compress(&bytes)?
                } else {
                    bytes
                }
            }
        };
        dict.set("Length", data.len());
        Ok((dict, data))
    }

    /// Bytes with every filter in `/Filter` undone.
    pub fn decoded_data(&self) -> Result<Vec<u8>> {
        match &self.content {
            StreamContent::Raw(data) => Ok(filters::decode_stream(data, &self.dict)?),
            StreamContent::Operators { operators, .. } => {
                Ok(serialize::operators_to_bytes(operators))
            }
        }
    }

    /// Content-stream operators, parsing the payload if needed.
    pub fn operators(&self) -> Result<Vec<Operator>> {
        match &self.content {
            StreamContent::Raw(_) => Ok(content::parse_operators(&self.decoded_data()?)?),
            StreamContent::Operators { operators, .. } => Ok(operators.clone()),
        }
    }

    /// Flate-compresses raw bytes in place, prepending `FlateDecode` to any
    /// filters already declared.
    pub fn compress_flate(&mut self) -> Result<()> {
        let data = match &mut self.content {
            StreamContent::Raw(data) => data,
            StreamContent::Operators { encode, .. } => {
                *encode = true;
                return Ok(());
            }
        };

        *data = compression::compress(data)?;
        let flate = Object::name("FlateDecode");
        let filter = match self.dict.remove("Filter") {
            None => flate,
            Some(Object::Array(mut existing)) => {
                existing.insert(0, flate);
                Object::Array(existing)
            }
            Some(single) => Object::Array(vec![flate, single]),
        };
        self.dict.set("Filter", filter);
        self.dict.set("Length", data.len());
        Ok(())
    }
}
