//! Parser configuration

use serde::Deserialize;

/// Source resolution, caching and layout settings for a [`PaperParser`](crate::PaperParser)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Allow URLs that resolve to private/reserved IPs (default: false)
    pub allow_private_urls: bool,
    /// Maximum download size in bytes for URL sources (default: 100MB)
    pub max_download_bytes: u64,
    /// HTTP request timeout in seconds (default: 60)
    pub request_timeout_secs: u64,
    /// Keep downloaded PDFs so repeated URLs are not fetched again (default: true)
    pub cache_downloads: bool,
    /// Maximum number of cached downloads (default: 16)
    pub cache_max_entries: usize,
    /// Maximum total bytes in the download cache (default: 256MB)
    pub cache_max_bytes: usize,
    /// Layout analysis thresholds
    pub layout: LayoutConfig,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            allow_private_urls: false,
            max_download_bytes: 100 * 1024 * 1024, // 100MB
            request_timeout_secs: 60,
            cache_downloads: true,
            cache_max_entries: 16,
            cache_max_bytes: 256 * 1024 * 1024, // 256MB
            layout: LayoutConfig::default(),
        }
    }
}

/// Thresholds used when filtering and ordering layout elements.
///
/// Distances are in the element coordinate space. The PDFium backend emits
/// PDF points, so the defaults are tuned for points (1/72 inch).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Fraction of an element that must overlap the text area to count as body text
    pub text_area_threshold: f32,
    /// Maximum vertical distance between a figure/table and its caption
    pub caption_distance: f32,
    /// Horizontal inset applied when snapping elements to their column
    pub column_inset: f32,
    /// Number of standard deviations a title height may deviate from the mean
    pub title_sigma: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            text_area_threshold: 0.7,
            caption_distance: 18.0,
            column_inset: 4.0,
            title_sigma: 3.0,
        }
    }
}
