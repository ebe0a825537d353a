//! Error types for paper-parser

use thiserror::Error;

/// Result type alias for paper-parser
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for paper-parser
#[derive(Error, Debug)]
pub enum Error {
    /// PDF file not found
    #[error("PDF not found: {path}")]
    PdfNotFound { path: String },

    /// Invalid PDF file
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// PDF is password protected
    #[error("PDF is password protected")]
    PasswordRequired,

    /// Source resolution error
    #[error("Failed to resolve source: {reason}")]
    SourceResolution { reason: String },

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Element record that does not follow the partition format
    #[error("Invalid element: {reason}")]
    InvalidElement { reason: String },

    /// Document produced no layout elements at all
    #[error("No text content found in {source_name}")]
    EmptyDocument { source_name: String },

    /// SSRF blocked (URL resolves to private/reserved IP)
    #[error("SSRF blocked: {url}")]
    SsrfBlocked { url: String },

    /// Download too large
    #[error("Download too large: {size} bytes (max: {max_size} bytes)")]
    DownloadTooLarge { size: u64, max_size: u64 },

    /// Blocking extraction task panicked or was cancelled
    #[error("Extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Whether the error comes from resolving the input rather than from parsing it.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            Error::PdfNotFound { .. }
                | Error::SourceResolution { .. }
                | Error::HttpRequest(_)
                | Error::Io(_)
                | Error::SsrfBlocked { .. }
                | Error::DownloadTooLarge { .. }
        )
    }
}
