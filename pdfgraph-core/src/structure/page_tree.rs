//! Page tree navigation and editing (ISO 32000-1 Section 7.7.3)
//!
//! Intermediate `/Pages` nodes carry `/Kids` and a `/Count` of the leaves
//! beneath them; `/Page` leaves point back up through `/Parent`. Every
//! walk carries a visited set, since a damaged file can make the tree cyclic.

use crate::context::Context;
use crate::error::{PdfError, Result};
use crate::objects::{DictKind, Dictionary, Object, ObjectId};
use std::collections::HashSet;

/// Attributes a leaf may inherit from its ancestors.
pub const INHERITABLE_ATTRIBUTES: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Looks `key` up on `dict`, then on each `/Parent` in turn.
pub fn inherited_attribute<'a>(
    context: &'a Context,
    dict: &'a Dictionary,
    key: &str,
) -> Option<&'a Object> {
    let mut current = dict;
    let mut visited = HashSet::new();
    loop {
        if let Some(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get_reference("Parent")?;
        if !visited.insert(parent) {
            tracing::warn!("Page tree cycle through {parent} while looking up /{key}");
            return None;
        }
        current = context.lookup_dict_maybe(parent)?;
    }
}

fn is_node(dict: &Dictionary) -> bool {
    match dict.kind() {
        DictKind::Pages => true,
        DictKind::Page => false,
        _ => dict.contains_key("Kids"),
    }
}

fn kids(dict: &Dictionary) -> Vec<ObjectId> {
    dict.get("Kids")
        .and_then(Object::as_array)
        .map(|kids| kids.iter().filter_map(Object::as_reference).collect())
        .unwrap_or_default()
}

/// Index in a raw `/Kids` array of the `position`-th reference. Kids may
/// hold non-reference junk that [`kids`] skips.
fn reference_slot(kids: &[Object], position: usize) -> Option<usize> {
    kids.iter()
        .enumerate()
        .filter(|(_, kid)| kid.as_reference().is_some())
        .nth(position)
        .map(|(slot, _)| slot)
}

fn node_count(context: &Context, id: ObjectId) -> Result<usize> {
    let dict = context.lookup_dict(id)?;
    if !is_node(dict) {
        return Ok(1);
    }
    Ok(dict
        .get_integer("Count")
        .and_then(|count| usize::try_from(count).ok())
        .unwrap_or(0))
}

fn adjust_count(context: &mut Context, id: ObjectId, delta: i64) -> Result<()> {
    let dict = context.lookup_dict_mut(id)?;
    let count = dict.get_integer("Count").unwrap_or(0);
    dict.set("Count", (count + delta).max(0));
    Ok(())
}

fn enter(visited: &mut HashSet<ObjectId>, id: ObjectId) -> Result<()> {
    if visited.insert(id) {
        Ok(())
    } else {
        Err(PdfError::InvalidStructure(format!(
            "Page tree node {id} is its own ancestor"
        )))
    }
}

/// A `/Pages` node, usually the root one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTree {
    id: ObjectId,
}

impl PageTree {
    pub fn new(id: ObjectId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Number of leaves, as declared by `/Count`.
    pub fn count(&self, context: &Context) -> Result<usize> {
        node_count(context, self.id)
    }

    /// Leaves in document order.
    pub fn leaf_refs(&self, context: &Context) -> Result<Vec<ObjectId>> {
        let mut leaves = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![self.id];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                tracing::warn!("Skipping page tree node {id}, already visited");
                continue;
            }
            let Some(dict) = context.lookup_dict_maybe(id) else {
                tracing::warn!("Page tree entry {id} is missing");
                continue;
            };
            if is_node(dict) {
                stack.extend(kids(dict).into_iter().rev());
            } else {
                leaves.push(id);
            }
        }
        Ok(leaves)
    }

    /// Inserts `leaf` so that it becomes leaf number `index`, setting its
    /// `/Parent` and every `/Count` on the way down.
    pub fn insert_leaf(&self, context: &mut Context, leaf: ObjectId, index: usize) -> Result<()> {
        let count = self.count(context)?;
        if index > count {
            return Err(PdfError::IndexOutOfBounds { index, count });
        }
        insert_into(context, self.id, leaf, index, &mut HashSet::new())
    }

    /// Appends `leaf` after the last leaf.
    pub fn push_leaf(&self, context: &mut Context, leaf: ObjectId) -> Result<()> {
        let count = self.count(context)?;
        self.insert_leaf(context, leaf, count)
    }

    /// Detaches leaf number `index` from the tree and returns it. The leaf
    /// object itself stays in the context.
    pub fn remove_leaf(&self, context: &mut Context, index: usize) -> Result<ObjectId> {
        let count = self.count(context)?;
        if index >= count {
            return Err(PdfError::IndexOutOfBounds { index, count });
        }
        remove_from(context, self.id, index, &mut HashSet::new())
    }
}

fn insert_into(
    context: &mut Context,
    node: ObjectId,
    leaf: ObjectId,
    index: usize,
    visited: &mut HashSet<ObjectId>,
) -> Result<()> {
    enter(visited, node)?;
    let children = kids(context.lookup_dict(node)?);
    let mut remaining = index;
    let mut position = children.len();

    for (i, kid) in children.iter().enumerate() {
        if remaining == 0 {
            position = i;
            break;
        }
        let size = node_count(context, *kid)?;
        let descend = context.lookup_dict(*kid).map(is_node)? && remaining < size;
        if descend {
            insert_into(context, *kid, leaf, remaining, visited)?;
            return adjust_count(context, node, 1);
        }
        remaining -= size.min(remaining);
    }

    let dict = context.lookup_dict_mut(node)?;
    match dict.get_mut("Kids").and_then(Object::as_array_mut) {
        Some(kids) => {
            let slot = reference_slot(kids, position).unwrap_or(kids.len());
            kids.insert(slot, Object::Reference(leaf));
        }
        None => dict.set("Kids", Object::Array(vec![Object::Reference(leaf)])),
    }
    adjust_count(context, node, 1)?;
    context
        .lookup_dict_mut(leaf)?
        .set("Parent", Object::Reference(node));
    Ok(())
}

fn remove_from(
    context: &mut Context,
    node: ObjectId,
    index: usize,
    visited: &mut HashSet<ObjectId>,
) -> Result<ObjectId> {
    enter(visited, node)?;
    let children = kids(context.lookup_dict(node)?);
    let mut remaining = index;

    for (position, kid) in children.into_iter().enumerate() {
        let kid_is_node = context.lookup_dict(kid).map(is_node)?;
        let size = node_count(context, kid)?;
        if kid_is_node {
            if remaining < size {
                let removed = remove_from(context, kid, remaining, visited)?;
                adjust_count(context, node, -1)?;
                return Ok(removed);
            }
            remaining -= size;
        } else if remaining == 0 {
            let dict = context.lookup_dict_mut(node)?;
            if let Some(kids) = dict.get_mut("Kids").and_then(Object::as_array_mut) {
                if let Some(slot) = reference_slot(kids, position) {
                    kids.remove(slot);
                }
            }
            adjust_count(context, node, -1)?;
            return Ok(kid);
        } else {
            remaining -= 1;
        }
    }

    Err(PdfError::InvalidStructure(format!(
        "Page tree node {node} has fewer leaves than its /Count"
    )))
}

/// A `/Page` leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLeaf {
    id: ObjectId,
}

impl PageLeaf {
    pub fn new(id: ObjectId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn inherited<'a>(&self, context: &'a Context, key: &str) -> Result<Option<&'a Object>> {
        let dict = context.lookup_dict(self.id)?;
        Ok(inherited_attribute(context, dict, key))
    }

    /// `[llx lly urx ury]`, following references and inheritance.
    pub fn media_box(&self, context: &Context) -> Result<Option<[f64; 4]>> {
        let Some(value) = self.inherited(context, "MediaBox")? else {
            return Ok(None);
        };
        let Some(items) = context.resolve(value).and_then(Object::as_array) else {
            return Ok(None);
        };
        let numbers: Vec<f64> = items
            .iter()
            .filter_map(|item| context.resolve(item).and_then(Object::as_real))
            .collect();
        Ok(numbers.try_into().ok())
    }

    /// `(width, height)` of the media box.
    pub fn size(&self, context: &Context) -> Result<Option<(f64, f64)>> {
        Ok(self
            .media_box(context)?
            .map(|[llx, lly, urx, ury]| ((urx - llx).abs(), (ury - lly).abs())))
    }

    /// Brackets the page's `/Contents` with the context's shared `q` and `Q`
    /// streams so appended content starts from a clean graphics state.
    pub fn wrap_contents(&self, context: &mut Context) -> Result<()> {
        let push = context.push_graphics_state_content_stream();
        let pop = context.pop_graphics_state_content_stream();

        let dict = context.lookup_dict_mut(self.id)?;
        let existing = match dict.get("Contents") {
            None => return Ok(()),
            Some(Object::Array(items)) => items.clone(),
            Some(single) => vec![single.clone()],
        };
        let already_wrapped = existing.first() == Some(&Object::Reference(push))
            && existing.last() == Some(&Object::Reference(pop));
        if already_wrapped {
            return Ok(());
        }

        let mut wrapped = Vec::with_capacity(existing.len() + 2);
        wrapped.push(Object::Reference(push));
        wrapped.extend(existing);
        wrapped.push(Object::Reference(pop));
        dict.set("Contents", Object::Array(wrapped));
        Ok(())
    }
}
