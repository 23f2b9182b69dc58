use crate::objects::{Dictionary, Stream};
use std::fmt;

/// Address of an indirect object.
///
/// Equality and hashing are by value, so two ids built independently from
/// the same components always find the same slot in a [`crate::Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    number: u32,
    generation: u16,
}

impl ObjectId {
    pub fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn generation(&self) -> u16 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// Discriminant of an [`Object`], used by typed lookups and error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Null,
    Boolean,
    Number,
    String,
    HexString,
    Name,
    Array,
    Dictionary,
    Stream,
    Reference,
    Invalid,
}

impl ObjectKind {
    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Null => "Null",
            ObjectKind::Boolean => "Boolean",
            ObjectKind::Number => "Number",
            ObjectKind::String => "String",
            ObjectKind::HexString => "HexString",
            ObjectKind::Name => "Name",
            ObjectKind::Array => "Array",
            ObjectKind::Dictionary => "Dictionary",
            ObjectKind::Stream => "Stream",
            ObjectKind::Reference => "Reference",
            ObjectKind::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    /// Literal string, `(...)` in the file. Bytes are kept undecoded.
    String(Vec<u8>),
    /// Hexadecimal string, `<...>` in the file.
    HexString(Vec<u8>),
    Name(String),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
    /// Raw body of an indirect object that failed to parse in lenient mode.
    Invalid(Vec<u8>),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Null => ObjectKind::Null,
            Object::Boolean(_) => ObjectKind::Boolean,
            Object::Integer(_) | Object::Real(_) => ObjectKind::Number,
            Object::String(_) => ObjectKind::String,
            Object::HexString(_) => ObjectKind::HexString,
            Object::Name(_) => ObjectKind::Name,
            Object::Array(_) => ObjectKind::Array,
            Object::Dictionary(_) => ObjectKind::Dictionary,
            Object::Stream(_) => ObjectKind::Stream,
            Object::Reference(_) => ObjectKind::Reference,
            Object::Invalid(_) => ObjectKind::Invalid,
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Object::Name(name.into())
    }

    pub fn string(text: impl AsRef<[u8]>) -> Self {
        Object::String(text.as_ref().to_vec())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(f) => Some(*f),
            Object::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Bytes of either string flavour.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) | Object::HexString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// The dictionary of a plain dictionary or of a stream.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(stream.dict()),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(stream.dict_mut()),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            Object::Reference(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Object::Boolean(b)
    }
}

impl From<i32> for Object {
    fn from(i: i32) -> Self {
        Object::Integer(i as i64)
    }
}

impl From<i64> for Object {
    fn from(i: i64) -> Self {
        Object::Integer(i)
    }
}

impl From<usize> for Object {
    fn from(i: usize) -> Self {
        Object::Integer(i as i64)
    }
}

impl From<f32> for Object {
    fn from(f: f32) -> Self {
        Object::Real(f as f64)
    }
}

impl From<f64> for Object {
    fn from(f: f64) -> Self {
        Object::Real(f)
    }
}

impl From<ObjectId> for Object {
    fn from(id: ObjectId) -> Self {
        Object::Reference(id)
    }
}

impl From<Vec<Object>> for Object {
    fn from(v: Vec<Object>) -> Self {
        Object::Array(v)
    }
}

impl From<Dictionary> for Object {
    fn from(d: Dictionary) -> Self {
        Object::Dictionary(d)
    }
}

impl From<Stream> for Object {
    fn from(s: Stream) -> Self {
        Object::Stream(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_object_id_equality_is_by_value() {
        let a = ObjectId::new(7, 0);
        let b = ObjectId::new(7, 0);
        assert_eq!(a, b);

        let mut map = HashMap::new();
        map.insert(a, "seven");
        assert_eq!(map.get(&b), Some(&"seven"));
        assert_eq!(map.get(&ObjectId::new(7, 1)), None);
    }

    #[test]
    fn test_object_id_ordering() {
        let mut ids = vec![
            ObjectId::new(10, 0),
            ObjectId::new(2, 1),
            ObjectId::new(2, 0),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                ObjectId::new(2, 0),
                ObjectId::new(2, 1),
                ObjectId::new(10, 0)
            ]
        );
    }

    #[test]
    fn test_object_id_display() {
        assert_eq!(ObjectId::new(42, 3).to_string(), "42 3 R");
    }

    #[test]
    fn test_kind() {
        assert_eq!(Object::Null.kind(), ObjectKind::Null);
        assert_eq!(Object::Integer(1).kind(), ObjectKind::Number);
        assert_eq!(Object::Real(1.5).kind(), ObjectKind::Number);
        assert_eq!(Object::HexString(vec![1]).kind(), ObjectKind::HexString);
        assert_eq!(Object::Invalid(vec![]).kind().name(), "Invalid");
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Object::Boolean(true).as_bool(), Some(true));
        assert_eq!(Object::Integer(42).as_real(), Some(42.0));
        assert_eq!(Object::Real(4.5).as_integer(), None);
        assert_eq!(Object::string("abc").as_bytes(), Some(&b"abc"[..]));
        assert_eq!(Object::HexString(vec![0xff]).as_bytes(), Some(&[0xff][..]));
        assert_eq!(Object::name("Type").as_name(), Some("Type"));
        assert_eq!(
            Object::Reference(ObjectId::new(1, 0)).as_reference(),
            Some(ObjectId::new(1, 0))
        );
        assert!(Object::Null.as_dict().is_none());
    }

    #[test]
    fn test_stream_exposes_dict() {
        let stream = Stream::new(Dictionary::new(), b"data".to_vec());
        let obj = Object::Stream(stream);
        assert!(obj.as_dict().is_some());
        assert!(obj.as_stream().is_some());
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Object::from(3), Object::Integer(3));
        assert_eq!(Object::from(3usize), Object::Integer(3));
        assert_eq!(Object::from(0.5f64), Object::Real(0.5));
        assert_eq!(
            Object::from(ObjectId::new(2, 0)),
            Object::Reference(ObjectId::new(2, 0))
        );
        assert_eq!(
            Object::from(vec![Object::Null]),
            Object::Array(vec![Object::Null])
        );
    }
}
