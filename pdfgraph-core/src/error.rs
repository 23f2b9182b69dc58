use crate::objects::ObjectId;
use crate::parser::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid PDF structure: {0}")]
    InvalidStructure(String),

    #[error("Object {0} does not exist")]
    MissingObject(ObjectId),

    #[error("Unexpected object type: expected {expected}, found {actual}")]
    UnexpectedObjectType {
        expected: String,
        actual: &'static str,
    },

    #[error("Index {index} is out of bounds for a page tree with {count} leaves")]
    IndexOutOfBounds { index: usize, count: usize },

    #[error("Compression error: {0}")]
    CompressionError(String),
}

pub type Result<T> = std::result::Result<T, PdfError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_pdf_error_display() {
        let error = PdfError::InvalidStructure("test message".to_string());
        assert_eq!(error.to_string(), "Invalid PDF structure: test message");
    }

    #[test]
    fn test_missing_object_display() {
        let error = PdfError::MissingObject(ObjectId::new(12, 0));
        assert_eq!(error.to_string(), "Object 12 0 R does not exist");
    }

    #[test]
    fn test_unexpected_type_display() {
        let error = PdfError::UnexpectedObjectType {
            expected: "Dictionary | Stream".to_string(),
            actual: "Array",
        };
        assert_eq!(
            error.to_string(),
            "Unexpected object type: expected Dictionary | Stream, found Array"
        );
    }

    #[test]
    fn test_index_out_of_bounds_display() {
        let error = PdfError::IndexOutOfBounds { index: 4, count: 3 };
        assert_eq!(
            error.to_string(),
            "Index 4 is out of bounds for a page tree with 3 leaves"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = IoError::new(ErrorKind::NotFound, "file not found");
        let pdf_error: PdfError = io_error.into();
        assert!(matches!(pdf_error, PdfError::Io(_)));
        assert!(pdf_error.to_string().contains("file not found"));
    }

    #[test]
    fn test_parse_error_conversion() {
        let pdf_error: PdfError = ParseError::InvalidXRef.into();
        assert!(matches!(pdf_error, PdfError::Parse(ParseError::InvalidXRef)));
        assert_eq!(pdf_error.to_string(), "Parse error: Invalid xref table");
    }
}
