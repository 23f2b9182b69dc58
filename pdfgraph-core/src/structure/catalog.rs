//! Document catalog access (ISO 32000-1 Section 7.7.2)

use super::page_tree::PageTree;
use crate::context::{Context, Literal};
use crate::error::{PdfError, Result};
use crate::objects::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Catalog {
    id: ObjectId,
}

impl Catalog {
    /// The catalog named by the trailer's `/Root`.
    pub fn from_context(context: &Context) -> Result<Self> {
        let id = context
            .trailer_info()
            .root
            .ok_or_else(|| PdfError::InvalidStructure("Trailer has no /Root".to_string()))?;
        context.lookup_dict(id)?;
        Ok(Self { id })
    }

    /// Registers an empty catalog with an empty page tree and makes it the
    /// document root.
    pub fn create(context: &mut Context) -> Self {
        let pages = context.register(context.obj(Literal::dict([
            ("Type", Literal::from("Pages")),
            ("Kids", Literal::Array(Vec::new())),
            ("Count", Literal::from(0)),
        ])));
        let id = context.register(context.obj(Literal::dict([
            ("Type", Literal::from("Catalog")),
            ("Pages", Literal::from(pages)),
        ])));
        context.trailer_info_mut().root = Some(id);
        Self { id }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn pages(&self, context: &Context) -> Result<PageTree> {
        let pages = context
            .lookup_dict(self.id)?
            .get_reference("Pages")
            .ok_or_else(|| PdfError::InvalidStructure(format!("Catalog {} has no /Pages", self.id)))?;
        context.lookup_dict(pages)?;
        Ok(PageTree::new(pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_sets_root() {
        let mut context = Context::new();
        let catalog = Catalog::create(&mut context);
        assert_eq!(context.trailer_info().root, Some(catalog.id()));
        assert_eq!(Catalog::from_context(&context).unwrap(), catalog);

        let pages = catalog.pages(&context).unwrap();
        assert_eq!(pages.count(&context).unwrap(), 0);
        assert!(context.lookup_dict(pages.id()).unwrap().has_type("Pages"));
    }

    #[test]
    fn test_missing_root() {
        let context = Context::new();
        assert!(matches!(
            Catalog::from_context(&context),
            Err(PdfError::InvalidStructure(_))
        ));
    }
}
