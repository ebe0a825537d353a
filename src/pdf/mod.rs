//! PDF processing layer
//!
//! A [`LayoutBackend`] turns raw PDF bytes into positioned, typed layout
//! elements. [`PdfiumBackend`] is the default implementation.

mod blocks;
mod pdfium;

use crate::error::Result;
use crate::layout::Element;
use crate::paper::PaperMetadata;

pub use blocks::{
    calculate_dynamic_thresholds, classify_block, group_into_blocks, group_into_lines, CharInfo,
    LineInfo, PdfiumConfig, TextBlock, Thresholds,
};
pub use pdfium::PdfiumBackend;

/// Layout elements of a whole document
#[derive(Debug, Clone, Default)]
pub struct PartitionedDocument {
    /// Elements of every page, in extraction order
    pub elements: Vec<Element>,
    pub page_count: u32,
    pub metadata: PaperMetadata,
}

/// Splits a PDF into layout elements
pub trait LayoutBackend: Send + Sync {
    /// Partition `data` into elements. `source_name` is the path or URL the
    /// bytes came from and ends up in each element's file metadata.
    fn partition(&self, data: &[u8], source_name: &str) -> Result<PartitionedDocument>;
}
