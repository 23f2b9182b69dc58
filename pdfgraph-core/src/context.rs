//! Indirect-object store for one document session.
//!
//! A [`Context`] owns every indirect object of a document, keyed by
//! [`ObjectId`]. Containers refer to each other through
//! [`Object::Reference`], so cyclic structures such as the page tree are
//! plain map keys rather than language-level reference cycles.

use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId, ObjectKind, Operator, Stream};
use crate::parser::header::PdfVersion;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

const DEFAULT_RNG_SEED: u64 = 1;
const MAX_REFERENCE_HOPS: usize = 32;

/// Document-level entries carried by the trailer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrailerInfo {
    pub root: Option<ObjectId>,
    pub encrypt: Option<Object>,
    pub info: Option<Object>,
    pub id: Option<Object>,
}

/// Plain nested data that [`Context::obj`] turns into PDF objects.
///
/// Strings become names, `None` entries are dropped from dictionaries and
/// become `null` inside arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Absent,
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Name(String),
    Ref(ObjectId),
    Array(Vec<Literal>),
    Dict(Vec<(String, Literal)>),
    Object(Object),
}

impl Literal {
    pub fn dict<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Literal)>,
    {
        Literal::Dict(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn array<T, I>(items: I) -> Self
    where
        T: Into<Literal>,
        I: IntoIterator<Item = T>,
    {
        Literal::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

impl From<i32> for Literal {
    fn from(i: i32) -> Self {
        Literal::Integer(i as i64)
    }
}

impl From<i64> for Literal {
    fn from(i: i64) -> Self {
        Literal::Integer(i)
    }
}

impl From<usize> for Literal {
    fn from(i: usize) -> Self {
        Literal::Integer(i as i64)
    }
}

impl From<f64> for Literal {
    fn from(f: f64) -> Self {
        Literal::Real(f)
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Name(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::Name(s)
    }
}

impl From<ObjectId> for Literal {
    fn from(id: ObjectId) -> Self {
        Literal::Ref(id)
    }
}

impl From<Object> for Literal {
    fn from(obj: Object) -> Self {
        Literal::Object(obj)
    }
}

impl<T: Into<Literal>> From<Vec<T>> for Literal {
    fn from(items: Vec<T>) -> Self {
        Literal::array(items)
    }
}

impl<T: Into<Literal>> From<Option<T>> for Literal {
    fn from(value: Option<T>) -> Self {
        value.map_or(Literal::Absent, Into::into)
    }
}

#[derive(Debug)]
pub struct Context {
    objects: BTreeMap<ObjectId, Object>,
    largest_object_number: u32,
    version: PdfVersion,
    trailer: TrailerInfo,
    push_graphics_state: Option<ObjectId>,
    pop_graphics_state: Option<ObjectId>,
    rng: StdRng,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_RNG_SEED)
    }

    /// Context whose synthetic-name generator starts from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            objects: BTreeMap::new(),
            largest_object_number: 0,
            version: PdfVersion::new(1, 7),
            trailer: TrailerInfo::default(),
            push_graphics_state: None,
            pop_graphics_state: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn version(&self) -> PdfVersion {
        self.version
    }

    pub fn set_version(&mut self, version: PdfVersion) {
        self.version = version;
    }

    pub fn trailer_info(&self) -> &TrailerInfo {
        &self.trailer
    }

    pub fn trailer_info_mut(&mut self) -> &mut TrailerInfo {
        &mut self.trailer
    }

    pub fn largest_object_number(&self) -> u32 {
        self.largest_object_number
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Reserves a fresh object number without storing anything under it.
    pub fn next_ref(&mut self) -> ObjectId {
        self.largest_object_number += 1;
        ObjectId::new(self.largest_object_number, 0)
    }

    pub fn register(&mut self, object: impl Into<Object>) -> ObjectId {
        let id = self.next_ref();
        self.assign(id, object);
        id
    }

    /// Stores `object` under a specific id, replacing any previous occupant.
    /// Only one generation of an object number is live at a time.
    pub fn assign(&mut self, id: ObjectId, object: impl Into<Object>) {
        let stale: Vec<ObjectId> = self
            .objects
            .range(ObjectId::new(id.number(), 0)..=ObjectId::new(id.number(), u16::MAX))
            .map(|(other, _)| *other)
            .filter(|other| *other != id)
            .collect();
        for other in stale {
            tracing::debug!("Object {other} replaced by generation {}", id.generation());
            self.objects.remove(&other);
        }
        self.objects.insert(id, object.into());
        if id.number() > self.largest_object_number {
            self.largest_object_number = id.number();
        }
    }

    pub fn delete(&mut self, id: ObjectId) -> bool {
        self.objects.remove(&id).is_some()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn lookup(&self, id: ObjectId) -> Result<&Object> {
        self.objects.get(&id).ok_or(PdfError::MissingObject(id))
    }

    pub fn lookup_maybe(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn lookup_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.objects.get_mut(&id).ok_or(PdfError::MissingObject(id))
    }

    /// Looks up `id` and checks that the object is one of `kinds`.
    pub fn lookup_as(&self, id: ObjectId, kinds: &[ObjectKind]) -> Result<&Object> {
        let object = self.lookup(id)?;
        check_kind(object, kinds)?;
        Ok(object)
    }

    /// Like [`Context::lookup_as`], but a missing object, a `null` or a kind
    /// mismatch all yield `None`.
    pub fn lookup_maybe_as(&self, id: ObjectId, kinds: &[ObjectKind]) -> Option<&Object> {
        self.objects
            .get(&id)
            .filter(|object| !object.is_null() && kinds.contains(&object.kind()))
    }

    /// Follows references from `object` until a direct value is reached.
    /// Dangling references and over-long chains resolve to `None`.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        let mut current = object;
        for _ in 0..MAX_REFERENCE_HOPS {
            match current {
                Object::Reference(id) => current = self.objects.get(id)?,
                direct => return Some(direct),
            }
        }
        None
    }

    /// Resolves `object` and checks its kind.
    pub fn resolve_as<'a>(&'a self, object: &'a Object, kinds: &[ObjectKind]) -> Result<&'a Object> {
        let resolved = match object {
            Object::Reference(id) => self
                .resolve(object)
                .ok_or(PdfError::MissingObject(*id))?,
            direct => direct,
        };
        check_kind(resolved, kinds)?;
        Ok(resolved)
    }

    pub fn lookup_dict(&self, id: ObjectId) -> Result<&Dictionary> {
        match self.lookup_as(id, &[ObjectKind::Dictionary])? {
            Object::Dictionary(dict) => Ok(dict),
            other => Err(unexpected(other, &[ObjectKind::Dictionary])),
        }
    }

    pub fn lookup_dict_maybe(&self, id: ObjectId) -> Option<&Dictionary> {
        match self.lookup_maybe_as(id, &[ObjectKind::Dictionary])? {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn lookup_dict_mut(&mut self, id: ObjectId) -> Result<&mut Dictionary> {
        match self.lookup_mut(id)? {
            Object::Dictionary(dict) => Ok(dict),
            other => Err(unexpected(other, &[ObjectKind::Dictionary])),
        }
    }

    pub fn lookup_array(&self, id: ObjectId) -> Result<&Vec<Object>> {
        match self.lookup_as(id, &[ObjectKind::Array])? {
            Object::Array(array) => Ok(array),
            other => Err(unexpected(other, &[ObjectKind::Array])),
        }
    }

    pub fn lookup_stream(&self, id: ObjectId) -> Result<&Stream> {
        match self.lookup_as(id, &[ObjectKind::Stream])? {
            Object::Stream(stream) => Ok(stream),
            other => Err(unexpected(other, &[ObjectKind::Stream])),
        }
    }

    /// Builds an object tree from plain data. Nothing is registered.
    pub fn obj(&self, literal: impl Into<Literal>) -> Object {
        build(literal.into())
    }

    /// Builds a dictionary from plain entries. Nothing is registered.
    pub fn dict<K, I>(&self, entries: I) -> Dictionary
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Literal)>,
    {
        let mut dict = Dictionary::new();
        for (key, value) in entries {
            if value != Literal::Absent {
                dict.set(key, build(value));
            }
        }
        dict
    }

    pub fn stream(&self, contents: impl Into<Vec<u8>>, dict: Dictionary) -> Stream {
        Stream::new(dict, contents.into())
    }

    /// Stream whose contents are flate-compressed now, tagged `/Filter /FlateDecode`.
    pub fn flate_stream(&self, contents: impl Into<Vec<u8>>, dict: Dictionary) -> Result<Stream> {
        let mut stream = Stream::new(dict, contents.into());
        stream.compress_flate()?;
        Ok(stream)
    }

    /// Content stream encoded lazily and flate-compressed when written.
    pub fn content_stream(&self, operators: Vec<Operator>, dict: Dictionary) -> Stream {
        Stream::from_operators(dict, operators, true)
    }

    /// Form XObject with a zero `/BBox` and identity `/Matrix` unless `dict`
    /// overrides them.
    pub fn form_xobject(&self, operators: Vec<Operator>, dict: Dictionary) -> Stream {
        let mut form = Dictionary::new();
        form.set(
            "BBox",
            Object::Array(vec![0.into(), 0.into(), 0.into(), 0.into()]),
        );
        form.set(
            "Matrix",
            Object::Array(vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                0.into(),
                0.into(),
            ]),
        );
        for (key, value) in dict {
            form.set(key, value);
        }
        form.set("Type", Object::name("XObject"));
        form.set("Subtype", Object::name("Form"));
        self.content_stream(operators, form)
    }

    /// Shared one-operator `q` stream, registered on first use.
    pub fn push_graphics_state_content_stream(&mut self) -> ObjectId {
        if let Some(id) = self.push_graphics_state {
            return id;
        }
        let stream = self.content_stream(vec![Operator::bare("q")], Dictionary::new());
        let id = self.register(stream);
        self.push_graphics_state = Some(id);
        id
    }

    /// Shared one-operator `Q` stream, registered on first use.
    pub fn pop_graphics_state_content_stream(&mut self) -> ObjectId {
        if let Some(id) = self.pop_graphics_state {
            return id;
        }
        let stream = self.content_stream(vec![Operator::bare("Q")], Dictionary::new());
        let id = self.register(stream);
        self.pop_graphics_state = Some(id);
        id
    }

    /// `prefix-NNNN` with a pseudo-random numeric suffix of `suffix_length` digits.
    pub fn add_random_suffix(&mut self, prefix: &str, suffix_length: u32) -> String {
        let upper = 10u64.saturating_pow(suffix_length.clamp(1, 18));
        let suffix = self.rng.gen_range(0..upper);
        format!("{prefix}-{suffix}")
    }

    /// Reverse lookup by value. Linear in the number of objects.
    pub fn get_object_ref(&self, object: &Object) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, candidate)| *candidate == object)
            .map(|(id, _)| *id)
    }

    /// Every indirect object, ascending by object number.
    pub fn enumerate_indirect_objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects.iter().map(|(id, object)| (*id, object))
    }
}

fn build(literal: Literal) -> Object {
    match literal {
        Literal::Absent | Literal::Null => Object::Null,
        Literal::Bool(b) => Object::Boolean(b),
        Literal::Integer(i) => Object::Integer(i),
        Literal::Real(f) => Object::Real(f),
        Literal::Name(name) => Object::Name(name),
        Literal::Ref(id) => Object::Reference(id),
        Literal::Array(items) => Object::Array(items.into_iter().map(build).collect()),
        Literal::Dict(entries) => {
            let mut dict = Dictionary::with_capacity(entries.len());
            for (key, value) in entries {
                if value != Literal::Absent {
                    dict.set(key, build(value));
                }
            }
            Object::Dictionary(dict)
        }
        Literal::Object(object) => object,
    }
}

fn check_kind(object: &Object, kinds: &[ObjectKind]) -> Result<()> {
    if kinds.is_empty() || kinds.contains(&object.kind()) {
        Ok(())
    } else {
        Err(unexpected(object, kinds))
    }
}

fn unexpected(object: &Object, kinds: &[ObjectKind]) -> PdfError {
    let expected = kinds
        .iter()
        .map(|kind| kind.name())
        .collect::<Vec<_>>()
        .join(" | ");
    PdfError::UnexpectedObjectType {
        expected,
        actual: object.kind().name(),
    }
}
