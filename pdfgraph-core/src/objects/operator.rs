use crate::objects::{Dictionary, Object};

/// One content-stream instruction: operands followed by the operator keyword.
///
/// Inline images (`BI ... ID ... EI`) are carried as a single `BI` operator
/// whose operands are the image dictionary and the raw image bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub operator: String,
    pub operands: Vec<Object>,
}

impl Operator {
    pub fn new(operator: impl Into<String>, operands: Vec<Object>) -> Self {
        Self {
            operator: operator.into(),
            operands,
        }
    }

    /// Operator without operands, e.g. `q` or `BT`.
    pub fn bare(operator: impl Into<String>) -> Self {
        Self::new(operator, Vec::new())
    }

    pub fn inline_image(dict: Dictionary, data: Vec<u8>) -> Self {
        Self::new("BI", vec![Object::Dictionary(dict), Object::String(data)])
    }

    pub fn is_inline_image(&self) -> bool {
        self.operator == "BI"
    }
}
