//! Integration tests for Paper Parser

use paper_parser::error::Error;
use paper_parser::pdf::{LayoutBackend, PartitionedDocument};
use paper_parser::{
    elements_from_json, ParsedPaper, PaperParser, ParserConfig, Result,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Fixtures
// ============================================================================

/// Backend that reads elements from a JSON array stored after the PDF header line
struct JsonBackend;

impl LayoutBackend for JsonBackend {
    fn partition(&self, data: &[u8], _source_name: &str) -> Result<PartitionedDocument> {
        let text = String::from_utf8_lossy(data);
        let json = text.split_once('\n').map(|(_, rest)| rest).unwrap_or("[]");
        let elements = elements_from_json(json)?;
        let page_count = elements.iter().map(|e| e.page_number).max().unwrap_or(0);
        Ok(PartitionedDocument {
            elements,
            page_count,
            metadata: Default::default(),
        })
    }
}

fn record(element_type: &str, text: &str, page: u32, top: f32, bottom: f32) -> serde_json::Value {
    json!({
        "type": element_type,
        "text": text,
        "metadata": {
            "page_number": page,
            "filetype": "application/pdf",
            "coordinates": {
                "points": [[72.0, top], [72.0, bottom], [540.0, bottom], [540.0, top]],
                "layout_width": 612.0,
                "layout_height": 792.0,
            },
        },
    })
}

/// A one-page paper in partition JSON, behind a `%PDF` header line
fn paper_fixture() -> Vec<u8> {
    let elements = json!([
        record("Title", "Abstract", 1, 110.0, 124.0),
        record(
            "NarrativeText",
            "We study how to recover the body text of scientific papers.",
            1,
            130.0,
            170.0
        ),
        record("Title", "1 Introduction", 1, 190.0, 204.0),
        record(
            "NarrativeText",
            "PDF stores glyphs, not para- graphs.",
            1,
            210.0,
            250.0
        ),
        record("Image", "", 1, 260.0, 400.0),
        record("FigureCaption", "Figure 1: Overview.", 1, 405.0, 420.0),
        record("Title", "References", 1, 440.0, 454.0),
        record(
            "NarrativeText",
            "[1] Someone. A cited paper. 2020.",
            1,
            460.0,
            480.0
        ),
    ]);

    let mut data = b"%PDF-1.7\n".to_vec();
    data.extend_from_slice(elements.to_string().as_bytes());
    data
}

fn write_fixture(data: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .unwrap();
    file.write_all(data).unwrap();
    file
}

fn local_parser() -> PaperParser<JsonBackend> {
    let config = ParserConfig {
        allow_private_urls: true,
        ..ParserConfig::default()
    };
    PaperParser::with_backend(config, JsonBackend)
}

/// Serve `body` with `status` over HTTP on a loopback port, counting requests
async fn serve_with_status(status: u16, body: Vec<u8>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let reason = match status {
                    200 => "OK",
                    404 => "Not Found",
                    _ => "Error",
                };
                let head = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/pdf\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    reason,
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}/papers/paper.pdf", addr), hits)
}

async fn serve(body: Vec<u8>) -> (String, Arc<AtomicUsize>) {
    serve_with_status(200, body).await
}

// ============================================================================
// parse_from_file
// ============================================================================

#[test]
fn test_parse_from_file_extracts_sections() {
    init_tracing();
    let file = write_fixture(&paper_fixture());

    let paper = local_parser().parse_from_file(file.path()).unwrap();

    assert_eq!(paper.section_titles(), vec!["Abstract", "1 Introduction"]);
    assert_eq!(
        paper.section("Abstract"),
        Some("We study how to recover the body text of scientific papers.")
    );
    assert_eq!(
        paper.section("1 Introduction"),
        Some("PDF stores glyphs, not paragraphs.")
    );
    assert_eq!(paper.page_count, 1);
    assert_eq!(paper.source, file.path().display().to_string());
}

#[test]
fn test_parse_from_file_drops_captions_and_references() {
    let file = write_fixture(&paper_fixture());
    let paper = local_parser().parse_from_file(file.path()).unwrap();
    let text = paper.text();

    assert!(!text.is_empty());
    assert!(!text.contains("Figure 1"));
    assert!(!text.contains("cited paper"));

    // Page text keeps everything that is not an image
    let page = paper.page_text(1).unwrap();
    assert!(page.contains("Figure 1: Overview."));
    assert!(page.contains("[1] Someone. A cited paper. 2020."));
}

#[test]
fn test_parse_from_file_nonexistent_path_fails() {
    let result = local_parser().parse_from_file("/nonexistent/dir/paper.pdf");
    match result {
        Err(err) => assert!(err.is_source_error()),
        Ok(paper) => panic!("expected an error, got {:?}", paper),
    }
}

#[test]
fn test_parse_from_file_rejects_non_pdf() {
    let file = write_fixture(b"<html><body>not a paper</body></html>");
    let result = local_parser().parse_from_file(file.path());
    assert!(matches!(result, Err(Error::InvalidPdf { .. })));
}

#[test]
fn test_parse_from_file_without_elements_is_empty_document() {
    let file = write_fixture(b"%PDF-1.7\n[]");
    let result = local_parser().parse_from_file(file.path());
    assert!(matches!(result, Err(Error::EmptyDocument { .. })));
}

#[test]
fn test_parse_from_file_bad_element_json() {
    let file = write_fixture(b"%PDF-1.7\n[{\"type\": \"Title\"}]");
    let result = local_parser().parse_from_file(file.path());
    assert!(matches!(result, Err(Error::Serialization(_))));
}

// ============================================================================
// parse_from_url
// ============================================================================

#[tokio::test]
async fn test_parse_from_url_matches_file() -> anyhow::Result<()> {
    init_tracing();
    let data = paper_fixture();
    let file = write_fixture(&data);
    let (url, _) = serve(data).await;

    let parser = local_parser();
    let from_url = parser.parse_from_url(&url).await?;
    let from_file = parser.parse_from_file(file.path())?;

    assert_eq!(from_url.source, url);
    assert_eq!(from_url.sections, from_file.sections);
    assert_eq!(from_url.text(), from_file.text());
    Ok(())
}

#[tokio::test]
async fn test_parse_from_url_uses_download_cache() -> anyhow::Result<()> {
    let (url, hits) = serve(paper_fixture()).await;
    let parser = local_parser();

    let first = parser.parse_from_url(&url).await?;
    let second = parser.parse_from_url(&url).await?;

    assert_eq!(first, second);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(parser.cache().contains(&url));
    Ok(())
}

#[tokio::test]
async fn test_parse_from_url_without_cache_downloads_again() -> anyhow::Result<()> {
    let (url, hits) = serve(paper_fixture()).await;
    let config = ParserConfig {
        allow_private_urls: true,
        cache_downloads: false,
        ..ParserConfig::default()
    };
    let parser = PaperParser::with_backend(config, JsonBackend);

    parser.parse_from_url(&url).await?;
    parser.parse_from_url(&url).await?;

    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(parser.cache().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_parse_from_url_rejects_non_pdf_response() {
    let (url, _) = serve(b"<html>moved</html>".to_vec()).await;
    let result = local_parser().parse_from_url(&url).await;
    assert!(matches!(result, Err(Error::InvalidPdf { .. })));
}

#[tokio::test]
async fn test_parse_from_url_error_status_fails() {
    let (url, hits) = serve_with_status(404, paper_fixture()).await;
    let parser = local_parser();

    let result = parser.parse_from_url(&url).await;
    assert!(matches!(result, Err(Error::SourceResolution { .. })));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(parser.cache().is_empty());
}

#[tokio::test]
async fn test_parse_from_url_evicts_unparseable_download() {
    let (url, hits) = serve(b"%PDF-1.7\nnot an element list".to_vec()).await;
    let parser = local_parser();

    let first = parser.parse_from_url(&url).await;
    assert!(matches!(first, Err(Error::Serialization(_))));
    assert!(!parser.cache().contains(&url));

    // Nothing cached, so the retry goes back to the server
    let second = parser.parse_from_url(&url).await;
    assert!(second.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_parse_from_url_download_limit() {
    let (url, _) = serve(paper_fixture()).await;
    let config = ParserConfig {
        allow_private_urls: true,
        max_download_bytes: 16,
        ..ParserConfig::default()
    };
    let parser = PaperParser::with_backend(config, JsonBackend);

    let result = parser.parse_from_url(&url).await;
    assert!(matches!(result, Err(Error::DownloadTooLarge { max_size: 16, .. })));
}

#[test]
fn test_parse_from_url_unreachable_fails() {
    let result: Result<ParsedPaper> =
        tokio_test::block_on(local_parser().parse_from_url("http://127.0.0.1:1/paper.pdf"));
    match result {
        Err(err) => assert!(err.is_source_error(), "unexpected error: {}", err),
        Ok(paper) => panic!("expected an error, got {:?}", paper),
    }
}

#[tokio::test]
async fn test_parse_from_url_blocks_private_hosts_by_default() {
    let (url, hits) = serve(paper_fixture()).await;
    let parser = PaperParser::with_backend(ParserConfig::default(), JsonBackend);

    let result = parser.parse_from_url(&url).await;
    assert!(matches!(result, Err(Error::SsrfBlocked { .. })));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_parse_from_url_rejects_other_schemes() {
    let result = local_parser().parse_from_url("file:///etc/passwd").await;
    assert!(matches!(result, Err(Error::SourceResolution { .. })));
}

// ============================================================================
// PDFium backend (run with `cargo test -- --ignored` where PDFium is installed)
// ============================================================================

/// Build a single-page PDF with Helvetica text lines at `(font size, baseline y, text)`
fn build_pdf(lines: &[(f32, f32, &str)]) -> Vec<u8> {
    let content: String = lines
        .iter()
        .map(|(size, y, text)| format!("BT /F1 {} Tf 72 {} Td ({}) Tj ET\n", size, y, text))
        .collect();

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}endstream",
            content.len(),
            content
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        "<< /Title (Parsing Papers) /Author (Jane Doe) >>".to_string(),
    ];

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, object) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, object).as_bytes());
    }

    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R /Info 6 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

fn pdfium_fixture() -> Vec<u8> {
    build_pdf(&[
        (16.0, 700.0, "Parsing Papers"),
        (12.0, 660.0, "Abstract"),
        (10.0, 640.0, "We present a method for extracting body text from papers."),
        (10.0, 628.0, "It keeps the sections of a paper in reading order."),
        (12.0, 600.0, "1 Introduction"),
        (10.0, 580.0, "Text extraction from PDF files is a hard problem."),
        (10.0, 568.0, "Layout analysis restores the order of the text blocks."),
        (12.0, 530.0, "References"),
        (10.0, 510.0, "[1] A. Author. Some cited work on documents. 2020."),
    ])
}

#[test]
#[ignore = "requires the PDFium shared library"]
fn test_pdfium_parse_from_file() {
    init_tracing();

    let file = write_fixture(&pdfium_fixture());
    let paper = PaperParser::default().parse_from_file(file.path()).unwrap();
    let text = paper.text();

    assert_eq!(paper.page_count, 1);
    assert_eq!(paper.metadata.title.as_deref(), Some("Parsing Papers"));
    assert!(text.contains("We present a method"));
    assert!(text.contains("hard problem"));
    assert!(!text.contains("Some cited work"));
}

#[test]
#[ignore = "requires the PDFium shared library"]
fn test_pdfium_rejects_truncated_pdf() {

    let mut data = pdfium_fixture();
    data.truncate(40);
    let file = write_fixture(&data);

    let result = PaperParser::default().parse_from_file(file.path());
    assert!(matches!(result, Err(Error::Pdfium { .. })));
}

#[tokio::test]
#[ignore = "requires the PDFium shared library"]
async fn test_pdfium_parse_from_url_matches_file() -> anyhow::Result<()> {

    let data = pdfium_fixture();
    let file = write_fixture(&data);
    let (url, _) = serve(data).await;

    let config = ParserConfig {
        allow_private_urls: true,
        ..ParserConfig::default()
    };
    let parser = PaperParser::new(config);
    let from_url = parser.parse_from_url(&url).await?;
    let from_file = parser.parse_from_file(file.path())?;

    assert_eq!(from_url.sections, from_file.sections);
    Ok(())
}
