//! # pdfgraph
//!
//! An in-memory PDF object-graph engine: parse arbitrary, possibly damaged
//! PDF files into a mutable graph of indirect objects, edit the graph, copy
//! pages between documents and serialize the result back to bytes.
//!
//! ## Features
//!
//! - **Parsing**: classic xref tables, xref streams, hybrid files, object streams,
//!   incremental updates and a sequential-scan fallback for broken files
//! - **Writing**: classic layout or compact xref-stream layout with object streams
//! - **Copying**: page transplant between documents that keeps shared resources shared
//! - **Page tree**: counting, traversal, insertion and removal of page leaves
//!
//! ## Quick Start
//!
//! ```rust
//! use pdfgraph::{parse_document, save, structure, Context, Dictionary, Object, Operator, WriterConfig};
//!
//! # fn main() -> pdfgraph::Result<()> {
//! let mut context = Context::new();
//! structure::new_document(&mut context);
//! let page = structure::add_page(&mut context, 612.0, 792.0)?;
//!
//! let content = context.content_stream(
//!     vec![
//!         Operator::bare("BT"),
//!         Operator::new("Tf", vec![Object::name("F1"), Object::Integer(24)]),
//!         Operator::new("Tj", vec![Object::string("Hello")]),
//!         Operator::bare("ET"),
//!     ],
//!     Dictionary::new(),
//! );
//! let content = context.register(content);
//! context.lookup_dict_mut(page.id())?.set("Contents", content);
//!
//! let bytes = save(&context, &WriterConfig::default().with_object_streams(true))?;
//! let reparsed = parse_document(&bytes)?;
//! assert_eq!(structure::page_count(&reparsed)?, 1);
//! # Ok(())
//! # }
//! ```

pub mod budget;
pub mod compression;
pub mod context;
pub mod copier;
pub mod error;
pub mod objects;
pub mod parser;
pub mod structure;
pub mod writer;

pub use context::{Context, Literal, TrailerInfo};
pub use copier::{append_pages, ObjectCopier};
pub use error::{PdfError, Result};
pub use objects::{DictKind, Dictionary, Object, ObjectId, ObjectKind, Operator, Stream, StreamContent};
pub use parser::{parse_document, parse_document_with_options, ParseError, ParseOptions, PdfVersion};
pub use writer::{save, save_to_file, PdfWriter, WriterConfig};

/// Current version of pdfgraph
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
