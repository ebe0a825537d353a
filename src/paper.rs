//! Parsed paper types

use serde::Serialize;

/// Document information dictionary entries
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PaperMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

/// A named section of body text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Heading text, `Abstract` for text before the first heading
    pub title: String,
    pub text: String,
}

/// Text of a single page in reading order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageText {
    /// Page number (1-indexed)
    pub page: u32,
    pub text: String,
}

/// Text extracted from one paper
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedPaper {
    /// Path or URL the PDF came from
    pub source: String,
    pub page_count: u32,
    pub metadata: PaperMetadata,
    /// Body sections in document order; never contains empty sections
    pub sections: Vec<Section>,
    /// Per-page text, including material excluded from the sections
    pub pages: Vec<PageText>,
}

impl ParsedPaper {
    /// Body text: every section's text separated by blank lines
    pub fn text(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Text of the section with the given heading
    pub fn section(&self, title: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.title == title)
            .map(|s| s.text.as_str())
    }

    /// Section headings in document order
    pub fn section_titles(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.title.as_str()).collect()
    }

    /// Text of a page (1-indexed)
    pub fn page_text(&self, page: u32) -> Option<&str> {
        self.pages
            .iter()
            .find(|p| p.page == page)
            .map(|p| p.text.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
