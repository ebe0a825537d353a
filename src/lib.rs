//! Paper Parser Library
//!
//! Extracts the body text of academic papers from PDF files:
//! - `parse_from_file`: parse a PDF on the local filesystem
//! - `parse_from_url`: download a PDF over HTTP(S) and parse it
//!
//! Pages are partitioned into typed layout elements, put into reading order
//! (single- or two-column) and filtered down to body text. Captions, tables,
//! running headers and everything after the references heading are dropped,
//! and the remaining text is grouped into sections starting at `Abstract`.

pub mod assemble;
pub mod config;
pub mod error;
pub mod layout;
pub mod paper;
pub mod parser;
pub mod pdf;
pub mod source;

pub use assemble::{assemble_paper, ABSTRACT};
pub use config::{LayoutConfig, ParserConfig};
pub use error::{Error, Result};
pub use layout::{elements_from_json, Coordinates, Element, ElementType};
pub use paper::{PageText, PaperMetadata, ParsedPaper, Section};
pub use parser::{parse_from_file, parse_from_url, PaperParser};
pub use pdf::{LayoutBackend, PartitionedDocument, PdfiumBackend, PdfiumConfig};
