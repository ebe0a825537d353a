//! Source resolution for PDF data

use crate::config::ParserConfig;
use crate::error::{Error, Result};
use futures_util::StreamExt;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

/// Resolved PDF data
#[derive(Debug, Clone)]
pub struct ResolvedPdf {
    pub data: Vec<u8>,
    pub source_name: String,
}

/// Reject buffers that do not start with the `%PDF` magic
pub fn ensure_pdf_header(data: &[u8], what: &str) -> Result<()> {
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidPdf {
            reason: format!("{} is not a valid PDF file", what),
        });
    }
    Ok(())
}

/// Resolve a file path to PDF data
pub fn resolve_path<P: AsRef<Path>>(path: P) -> Result<ResolvedPdf> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(Error::PdfNotFound {
            path: path.display().to_string(),
        });
    }

    let data = std::fs::read(path)?;
    ensure_pdf_header(&data, "File")?;

    tracing::debug!(path = %path.display(), bytes = data.len(), "read PDF from disk");

    Ok(ResolvedPdf {
        data,
        source_name: path.display().to_string(),
    })
}

/// Check if an IP address is private/reserved (loopback, link-local, private ranges, etc.)
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()                           // 127.0.0.0/8
                || v4.is_private()                     // 10/8, 172.16/12, 192.168/16
                || v4.is_link_local()                  // 169.254/16
                || v4.is_broadcast()                   // 255.255.255.255
                || v4.is_unspecified()                 // 0.0.0.0
                || v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64  // CGNAT 100.64/10
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()                           // ::1
                || v6.is_unspecified()                 // ::
                || {
                    let segments = v6.segments();
                    // fc00::/7 (unique local)
                    (segments[0] & 0xFE00) == 0xFC00
                    // fe80::/10 (link-local)
                    || (segments[0] & 0xFFC0) == 0xFE80
                }
        }
    }
}

/// Parse a URL, accepting only http and https
fn parse_http_url(url_str: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(url_str).map_err(|e| Error::SourceResolution {
        reason: format!("Invalid URL: {}", e),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(Error::SourceResolution {
            reason: format!("Unsupported URL scheme: {}", scheme),
        }),
    }
}

/// Check URL for SSRF by resolving DNS and verifying IPs are public
async fn check_ssrf(parsed: &url::Url) -> Result<()> {
    let host = parsed.host_str().ok_or_else(|| Error::SourceResolution {
        reason: "URL has no host".to_string(),
    })?;

    let port = parsed.port_or_known_default().unwrap_or(443);
    // IPv6 literals come back bracketed from host_str
    let addr_str = format!("{}:{}", host, port);

    let addrs = tokio::net::lookup_host(&addr_str).await.map_err(|e| {
        Error::SourceResolution {
            reason: format!("DNS resolution failed for {}: {}", host, e),
        }
    })?;

    for addr in addrs {
        if is_private_ip(&addr.ip()) {
            return Err(Error::SsrfBlocked {
                url: parsed.to_string(),
            });
        }
    }

    Ok(())
}

/// Resolve a URL to PDF data with SSRF protection and download size limits
pub async fn resolve_url(url: &str, config: &ParserConfig) -> Result<ResolvedPdf> {
    let parsed = parse_http_url(url)?;

    if !config.allow_private_urls {
        check_ssrf(&parsed).await?;
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(Error::HttpRequest)?;

    tracing::debug!(url, "downloading PDF");
    let response = client.get(parsed).send().await?;

    if !response.status().is_success() {
        return Err(Error::SourceResolution {
            reason: format!("HTTP request failed with status: {}", response.status()),
        });
    }

    let max_download_bytes = config.max_download_bytes;

    // Check Content-Length header for early rejection
    if let Some(content_length) = response.content_length() {
        if content_length > max_download_bytes {
            return Err(Error::DownloadTooLarge {
                size: content_length,
                max_size: max_download_bytes,
            });
        }
    }

    // Stream the response body with incremental size checking
    let mut data = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Error::HttpRequest)?;
        data.extend_from_slice(&chunk);
        if data.len() as u64 > max_download_bytes {
            return Err(Error::DownloadTooLarge {
                size: data.len() as u64,
                max_size: max_download_bytes,
            });
        }
    }

    ensure_pdf_header(&data, "Downloaded data")?;

    tracing::debug!(url, bytes = data.len(), "downloaded PDF");

    Ok(ResolvedPdf {
        data,
        source_name: url.to_string(),
    })
}
