//! Paper parser: source resolution, partitioning and assembly

use crate::assemble::assemble_paper;
use crate::config::{LayoutConfig, ParserConfig};
use crate::error::Result;
use crate::paper::ParsedPaper;
use crate::pdf::{LayoutBackend, PdfiumBackend};
use crate::source::{ensure_pdf_header, resolve_path, resolve_url, DownloadCache};
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;

static DEFAULT_PARSER: Lazy<PaperParser> = Lazy::new(PaperParser::default);

/// Extract the body text of the paper stored at `path` using default settings.
pub fn parse_from_file<P: AsRef<Path>>(path: P) -> Result<ParsedPaper> {
    DEFAULT_PARSER.parse_from_file(path)
}

/// Download the paper at `url` and extract its body text using default
/// settings. Downloads are cached for the lifetime of the process.
pub async fn parse_from_url(url: &str) -> Result<ParsedPaper> {
    DEFAULT_PARSER.parse_from_url(url).await
}

/// Parses papers from local files or URLs
pub struct PaperParser<B = PdfiumBackend> {
    config: ParserConfig,
    backend: Arc<B>,
    cache: DownloadCache,
}

impl Default for PaperParser<PdfiumBackend> {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl PaperParser<PdfiumBackend> {
    pub fn new(config: ParserConfig) -> Self {
        Self::with_backend(config, PdfiumBackend::default())
    }
}

impl<B: LayoutBackend + 'static> PaperParser<B> {
    /// Create a parser that partitions documents with `backend`
    pub fn with_backend(config: ParserConfig, backend: B) -> Self {
        let cache = DownloadCache::new(config.cache_max_entries, config.cache_max_bytes);
        Self {
            config,
            backend: Arc::new(backend),
            cache,
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Downloaded PDFs, keyed by URL
    pub fn cache(&self) -> &DownloadCache {
        &self.cache
    }

    /// Parse the PDF at `path`
    pub fn parse_from_file<P: AsRef<Path>>(&self, path: P) -> Result<ParsedPaper> {
        let resolved = resolve_path(path)?;
        self.parse_bytes(&resolved.data, &resolved.source_name)
    }

    /// Download and parse the PDF at `url`.
    ///
    /// A cached download that then fails to parse is evicted, so the next call
    /// fetches it again.
    pub async fn parse_from_url(&self, url: &str) -> Result<ParsedPaper> {
        let data = match self.cache.get(url) {
            Some(data) => {
                tracing::debug!(url, bytes = data.len(), "download cache hit");
                data
            }
            None => {
                let data: Arc<[u8]> = resolve_url(url, &self.config).await?.data.into();
                if self.config.cache_downloads {
                    self.cache.insert(url, Arc::clone(&data));
                }
                data
            }
        };

        let backend = Arc::clone(&self.backend);
        let layout = self.config.layout.clone();
        let source = url.to_string();

        let result =
            tokio::task::spawn_blocking(move || run_pipeline(&*backend, &data, &source, &layout))
                .await?;

        if let Err(e) = &result {
            if self.cache.evict(url) {
                tracing::debug!(url, error = %e, "evicted download that failed to parse");
            }
        }
        result
    }

    /// Parse an in-memory PDF. `source_name` identifies it in the result.
    pub fn parse_bytes(&self, data: &[u8], source_name: &str) -> Result<ParsedPaper> {
        run_pipeline(&*self.backend, data, source_name, &self.config.layout)
    }
}

/// Header check, partitioning and assembly of one document
fn run_pipeline<B: LayoutBackend + ?Sized>(
    backend: &B,
    data: &[u8],
    source_name: &str,
    layout: &LayoutConfig,
) -> Result<ParsedPaper> {
    ensure_pdf_header(data, source_name)?;

    let document = backend.partition(data, source_name)?;
    tracing::info!(partitions = document.elements.len(), "partitioned document");

    assemble_paper(
        source_name,
        document.elements,
        document.page_count,
        document.metadata,
        layout,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::layout::{Coordinates, Element, ElementType};
    use crate::pdf::PartitionedDocument;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that returns a fixed element list and counts its calls
    #[derive(Default)]
    struct FixedBackend {
        calls: AtomicUsize,
    }

    impl LayoutBackend for FixedBackend {
        fn partition(&self, _data: &[u8], _source_name: &str) -> Result<PartitionedDocument> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let at = |top: f32| Coordinates::from_bounds(72.0, top, 540.0, top + 14.0);
            Ok(PartitionedDocument {
                elements: vec![
                    Element::new(ElementType::Title, "Abstract", 1, at(100.0)),
                    Element::new(
                        ElementType::NarrativeText,
                        "We describe a parser for papers.",
                        1,
                        at(120.0),
                    ),
                ],
                page_count: 1,
                metadata: Default::default(),
            })
        }
    }

    /// Backend that fails every document
    struct BrokenBackend;

    impl LayoutBackend for BrokenBackend {
        fn partition(&self, _data: &[u8], _source_name: &str) -> Result<PartitionedDocument> {
            Err(Error::Pdfium {
                reason: "damaged xref table".to_string(),
            })
        }
    }

    #[test]
    fn test_parse_bytes_uses_backend() {
        let parser = PaperParser::with_backend(ParserConfig::default(), FixedBackend::default());
        let paper = parser.parse_bytes(b"%PDF-1.7", "memory.pdf").unwrap();

        assert_eq!(paper.source, "memory.pdf");
        assert_eq!(paper.section("Abstract"), Some("We describe a parser for papers."));
        assert_eq!(parser.backend.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_bytes_rejects_non_pdf_before_backend() {
        let parser = PaperParser::with_backend(ParserConfig::default(), FixedBackend::default());
        let result = parser.parse_bytes(b"<html>", "page.html");

        assert!(matches!(result, Err(Error::InvalidPdf { .. })));
        assert_eq!(parser.backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_parse_from_file_missing() {
        let parser = PaperParser::with_backend(ParserConfig::default(), FixedBackend::default());
        let result = parser.parse_from_file("/nonexistent/paper.pdf");
        assert!(matches!(result, Err(Error::PdfNotFound { .. })));
    }

    #[tokio::test]
    async fn test_parse_from_url_served_from_cache() {
        let parser = PaperParser::with_backend(ParserConfig::default(), FixedBackend::default());
        // Loopback would be rejected if the parser went to the network
        let url = "http://127.0.0.1/paper.pdf";
        parser.cache().insert(url, Arc::from(&b"%PDF-1.7"[..]));

        let paper = parser.parse_from_url(url).await.unwrap();
        assert_eq!(paper.source, url);
        assert_eq!(paper.section_titles(), vec!["Abstract"]);
    }

    #[tokio::test]
    async fn test_parse_from_url_blocks_private_hosts() {
        let parser = PaperParser::with_backend(ParserConfig::default(), FixedBackend::default());
        let result = parser.parse_from_url("http://127.0.0.1:9/paper.pdf").await;
        assert!(matches!(result, Err(Error::SsrfBlocked { .. })));
        assert!(parser.cache().is_empty());
    }

    #[tokio::test]
    async fn test_parse_from_url_evicts_download_that_fails_to_parse() {
        let parser = PaperParser::with_backend(ParserConfig::default(), BrokenBackend);
        let url = "http://127.0.0.1/broken.pdf";
        parser.cache().insert(url, Arc::from(&b"%PDF-1.7"[..]));

        let result = parser.parse_from_url(url).await;
        assert!(matches!(result, Err(Error::Pdfium { .. })));
        assert!(!parser.cache().contains(url));
        assert_eq!(parser.cache().total_bytes(), 0);
    }
}
