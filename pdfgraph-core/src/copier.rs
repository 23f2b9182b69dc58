//! Deep copy of object subgraphs from one [`Context`] into another.
//!
//! Direct values are cloned as they are met. Indirect objects are copied
//! once each: the destination number is reserved and memoized when the
//! reference is first seen, and the source value is queued. Queued objects
//! are filled in from a worklist, so neither reference cycles nor long
//! reference chains (outline `/Next` links) recurse.
//!
//! Page leaves get special treatment. The ancestors of a page are never
//! copied, so inheritable attributes are written onto the clone directly
//! and its `/Parent` link is dropped.

use crate::context::Context;
use crate::error::Result;
use crate::objects::{DictKind, Dictionary, Object, ObjectId, Stream, StreamContent};
use crate::structure::{self, inherited_attribute, INHERITABLE_ATTRIBUTES};
use std::collections::HashMap;

pub struct ObjectCopier<'s, 'd> {
    src: &'s Context,
    dest: &'d mut Context,
    memo: HashMap<ObjectId, ObjectId>,
    /// Reserved destinations whose source value has not been copied yet.
    pending: Vec<(ObjectId, ObjectId)>,
}

impl<'s, 'd> ObjectCopier<'s, 'd> {
    pub fn new(src: &'s Context, dest: &'d mut Context) -> Self {
        Self {
            src,
            dest,
            memo: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Copies `object` and everything it references. The returned value
    /// belongs to the destination context; references inside it point at
    /// destination objects.
    pub fn copy(&mut self, object: &Object) -> Object {
        let copied = self.copy_value(object);
        self.drain();
        copied
    }

    /// Copies the indirect object `id`, returning its destination number.
    /// A dangling source reference becomes a destination `null`.
    pub fn copy_ref(&mut self, id: ObjectId) -> ObjectId {
        let target = self.reserve(id);
        self.drain();
        target
    }

    fn reserve(&mut self, id: ObjectId) -> ObjectId {
        if let Some(existing) = self.memo.get(&id) {
            return *existing;
        }
        let target = self.dest.next_ref();
        self.memo.insert(id, target);
        self.pending.push((id, target));
        tracing::trace!("Copying {id} as {target}");
        target
    }

    fn drain(&mut self) {
        let src = self.src;
        while let Some((id, target)) = self.pending.pop() {
            let copied = match src.lookup_maybe(id) {
                Some(object) => self.copy_value(object),
                None => {
                    tracing::warn!("Copy source {id} does not exist, substituting null");
                    Object::Null
                }
            };
            self.dest.assign(target, copied);
        }
    }

    /// Clones direct structure; references are reserved, not followed.
    fn copy_value(&mut self, object: &Object) -> Object {
        match object {
            Object::Reference(id) => Object::Reference(self.reserve(*id)),
            Object::Dictionary(dict) if dict.kind() == DictKind::Page => {
                Object::Dictionary(self.copy_page(dict))
            }
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dict(dict)),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.copy_value(item)).collect())
            }
            Object::Stream(stream) => Object::Stream(self.copy_stream(stream)),
            scalar => scalar.clone(),
        }
    }

    /// Number of distinct source objects copied so far.
    pub fn copied_count(&self) -> usize {
        self.memo.len()
    }

    fn copy_dict(&mut self, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::with_capacity(dict.len());
        for (key, value) in dict {
            copy.set(key.clone(), self.copy_value(value));
        }
        copy
    }

    fn copy_page(&mut self, page: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::with_capacity(page.len() + INHERITABLE_ATTRIBUTES.len());
        for (key, value) in page {
            if key != "Parent" {
                copy.set(key.clone(), self.copy_value(value));
            }
        }
        let src = self.src;
        for key in INHERITABLE_ATTRIBUTES {
            if copy.contains_key(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(src, page, key) {
                copy.set(key, self.copy_value(value));
            }
        }
        copy
    }

    fn copy_stream(&mut self, stream: &Stream) -> Stream {
        let dict = self.copy_dict(stream.dict());
        match stream.content() {
            StreamContent::Raw(data) => Stream::new(dict, data.clone()),
            StreamContent::Operators { operators, encode } => {
                Stream::from_operators(dict, operators.clone(), *encode)
            }
        }
    }
}

/// Copies every page of `src` onto the end of `dest`'s page tree and
/// returns the new page ids. Resources shared between donor pages stay
/// shared in the destination.
pub fn append_pages(src: &Context, dest: &mut Context) -> Result<Vec<ObjectId>> {
    let donor_pages = structure::page_refs(src)?;
    let tree = structure::Catalog::from_context(dest)?.pages(dest)?;

    let copied: Vec<ObjectId> = {
        let mut copier = ObjectCopier::new(src, dest);
        donor_pages.iter().map(|page| copier.copy_ref(*page)).collect()
    };
    for page in &copied {
        tree.push_leaf(dest, *page)?;
    }
    tracing::debug!("Appended {} pages", copied.len());
    Ok(copied)
}
