//! Source resolution and download caching

pub mod cache;
pub mod resolver;

pub use cache::DownloadCache;
pub use resolver::{ensure_pdf_header, resolve_path, resolve_url, ResolvedPdf};
