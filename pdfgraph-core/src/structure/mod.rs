//! Document structure: catalog and page tree on top of a [`Context`].

mod catalog;
mod page_tree;

pub use catalog::Catalog;
pub use page_tree::{inherited_attribute, PageLeaf, PageTree, INHERITABLE_ATTRIBUTES};

use crate::context::{Context, Literal};
use crate::error::Result;
use crate::objects::ObjectId;

/// Creates the catalog and empty page tree of a new document.
pub fn new_document(context: &mut Context) -> Catalog {
    Catalog::create(context)
}

pub fn page_count(context: &Context) -> Result<usize> {
    Catalog::from_context(context)?.pages(context)?.count(context)
}

/// Page leaves in document order.
pub fn page_refs(context: &Context) -> Result<Vec<ObjectId>> {
    Catalog::from_context(context)?.pages(context)?.leaf_refs(context)
}

/// Appends a blank page of the given size (in points) to the document.
pub fn add_page(context: &mut Context, width: f64, height: f64) -> Result<PageLeaf> {
    let pages = Catalog::from_context(context)?.pages(context)?;
    let media_box = [0.0, 0.0, width, height].map(number);
    let page = context.register(context.obj(Literal::dict([
        ("Type", Literal::from("Page")),
        ("MediaBox", Literal::array(media_box)),
    ])));
    pages.push_leaf(context, page)?;
    Ok(PageLeaf::new(page))
}

/// Whole values are stored as integers, which is how they read back.
fn number(value: f64) -> Literal {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Literal::Integer(value as i64)
    } else {
        Literal::Real(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_pages() {
        let mut context = Context::new();
        new_document(&mut context);
        let first = add_page(&mut context, 612.0, 792.0).unwrap();
        let second = add_page(&mut context, 595.0, 842.0).unwrap();

        assert_eq!(page_count(&context).unwrap(), 2);
        assert_eq!(page_refs(&context).unwrap(), vec![first.id(), second.id()]);
        assert_eq!(second.size(&context).unwrap(), Some((595.0, 842.0)));
    }

    #[test]
    fn test_media_box_numbers() {
        let mut context = Context::new();
        new_document(&mut context);
        let page = add_page(&mut context, 612.0, 791.5).unwrap();
        let media_box = context.lookup_dict(page.id()).unwrap().get("MediaBox").cloned();
        assert_eq!(
            media_box,
            Some(crate::objects::Object::Array(vec![
                0.into(),
                0.into(),
                612.into(),
                791.5.into(),
            ]))
        );
    }
}
