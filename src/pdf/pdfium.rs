//! Layout backend built on PDFium

use super::blocks::{
    calculate_dynamic_thresholds, classify_block, group_into_blocks, group_into_lines, CharInfo,
    PdfiumConfig,
};
use super::{LayoutBackend, PartitionedDocument};
use crate::error::{Error, Result};
use crate::layout::{Coordinates, Element, ElementType};
use crate::paper::PaperMetadata;
use pdfium_render::prelude::*;
use std::path::Path;

const PDF_FILETYPE: &str = "application/pdf";

/// Get PDFium instance (creates new instance each time - PDFium is not thread-safe)
fn create_pdfium() -> Result<Pdfium> {
    // Try to bind to system library or use static linking
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "/opt/pdfium/lib",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

fn map_pdfium_error(err: PdfiumError) -> Error {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            Error::PasswordRequired
        }
        _ => Error::Pdfium {
            reason: format!("{}", err),
        },
    }
}

/// Splits file name and parent directory out of a path or URL
fn file_parts(source_name: &str) -> (String, String) {
    if let Ok(url) = url::Url::parse(source_name) {
        if url.scheme() == "http" || url.scheme() == "https" {
            let filename = url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|s| !s.is_empty())
                .unwrap_or_default()
                .to_string();
            let mut directory = url.clone();
            directory.set_query(None);
            directory.set_fragment(None);
            let dir = directory.as_str();
            let dir = dir.strip_suffix(&filename).unwrap_or(dir);
            return (dir.trim_end_matches('/').to_string(), filename);
        }
    }

    let path = Path::new(source_name);
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let directory = path
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    (directory, filename)
}

/// [`LayoutBackend`] that reads glyph positions and image objects through PDFium
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    config: PdfiumConfig,
}

impl PdfiumBackend {
    pub fn new(config: PdfiumConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PdfiumConfig {
        &self.config
    }

    /// Check whether the PDFium library can be bound on this host
    pub fn is_available() -> bool {
        create_pdfium().is_ok()
    }

    fn extract_metadata(document: &PdfDocument) -> PaperMetadata {
        let meta = document.metadata();
        let tag = |tag_type| {
            meta.get(tag_type)
                .map(|t| t.value().to_string())
                .filter(|v| !v.is_empty())
        };
        PaperMetadata {
            title: tag(PdfDocumentMetadataTagType::Title),
            author: tag(PdfDocumentMetadataTagType::Author),
            subject: tag(PdfDocumentMetadataTagType::Subject),
            creator: tag(PdfDocumentMetadataTagType::Creator),
            producer: tag(PdfDocumentMetadataTagType::Producer),
            creation_date: tag(PdfDocumentMetadataTagType::CreationDate),
            modification_date: tag(PdfDocumentMetadataTagType::ModificationDate),
        }
    }

    /// Collect character information in a top-left origin space
    fn collect_chars_with_info(text_obj: &PdfPageText, page_height: f32) -> Vec<CharInfo> {
        let mut chars = Vec::new();

        for segment in text_obj.segments().iter() {
            if let Ok(char_iter) = segment.chars() {
                for char_result in char_iter.iter() {
                    if let Some(c) = char_result.unicode_char() {
                        if let Ok(bounds) = char_result.loose_bounds() {
                            chars.push(CharInfo {
                                char: c,
                                x: bounds.left().value,
                                y: page_height - bounds.top().value,
                                width: bounds.width().value,
                                height: bounds.height().value,
                            });
                        }
                    }
                }
            }
        }

        chars
    }

    fn image_elements(page: &PdfPage, page_number: u32, page_height: f32) -> Vec<Element> {
        page.objects()
            .iter()
            .filter(|object| object.as_image_object().is_some())
            .filter_map(|object| object.bounds().ok())
            .map(|bounds| {
                let coordinates = Coordinates::from_bounds(
                    bounds.left().value,
                    page_height - bounds.top().value,
                    bounds.right().value,
                    page_height - bounds.bottom().value,
                );
                Element::new(ElementType::Image, "", page_number, coordinates)
            })
            .collect()
    }

    fn partition_page(&self, page: &PdfPage, page_number: u32) -> Vec<Element> {
        let page_width = page.width().value;
        let page_height = page.height().value;

        let mut elements = Vec::new();

        match page.text() {
            Ok(text_obj) => {
                let chars = Self::collect_chars_with_info(&text_obj, page_height);
                let thresholds = calculate_dynamic_thresholds(&chars);
                let lines = group_into_lines(chars, &thresholds, self.config.column_gap);
                let blocks = group_into_blocks(lines, self.config.paragraph_threshold);

                for block in blocks {
                    let text = block.text(thresholds.space_threshold);
                    if text.is_empty() {
                        continue;
                    }
                    let element_type =
                        classify_block(&block, &text, page_height, &thresholds, &self.config);
                    elements.push(Element::new(
                        element_type,
                        &text,
                        page_number,
                        block.coordinates(),
                    ));
                }
            }
            Err(e) => {
                tracing::warn!(page = page_number, error = %e, "failed to read page text");
            }
        }

        elements.extend(Self::image_elements(page, page_number, page_height));

        elements
            .into_iter()
            .map(|e| e.with_layout(page_width, page_height))
            .collect()
    }
}

impl LayoutBackend for PdfiumBackend {
    fn partition(&self, data: &[u8], source_name: &str) -> Result<PartitionedDocument> {
        let pdfium = create_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(data, None)
            .map_err(map_pdfium_error)?;

        let pages = document.pages();
        let page_count = pages.len() as u32;
        let metadata = Self::extract_metadata(&document);
        let (directory, filename) = file_parts(source_name);

        let mut elements = Vec::new();
        for (index, page) in pages.iter().enumerate() {
            let page_number = index as u32 + 1;
            let page_elements = self.partition_page(&page, page_number);
            tracing::debug!(
                page = page_number,
                elements = page_elements.len(),
                "partitioned page"
            );
            elements.extend(
                page_elements
                    .into_iter()
                    .map(|e| e.with_file(&directory, &filename, PDF_FILETYPE)),
            );
        }

        Ok(PartitionedDocument {
            elements,
            page_count,
            metadata,
        })
    }
}
