//! Layout element model

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Kind of content a layout element holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    FigureCaption,
    Footer,
    Header,
    Image,
    ListItem,
    NarrativeText,
    Table,
    Title,
    UncategorizedText,
}

impl ElementType {
    /// Parse a partition label, falling back to `UncategorizedText` for unknown labels
    pub fn parse(value: &str) -> Self {
        match value {
            "FigureCaption" => Self::FigureCaption,
            "Footer" => Self::Footer,
            "Header" => Self::Header,
            "Image" => Self::Image,
            "ListItem" => Self::ListItem,
            "NarrativeText" => Self::NarrativeText,
            "Table" => Self::Table,
            "Title" => Self::Title,
            _ => Self::UncategorizedText,
        }
    }
}

/// Heading level of a title element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderType {
    FirstHeader,
    SecondHeader,
    ThirdHeader,
    FourthHeader,
    FifthHeader,
    AppendixHeader,
    Unknown,
}

/// A point in top-left-origin layout space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Four-corner bounding box of an element
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

impl Coordinates {
    /// Build an axis-aligned box from its edges
    pub fn from_bounds(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            top_left: Point::new(left, top),
            top_right: Point::new(right, top),
            bottom_left: Point::new(left, bottom),
            bottom_right: Point::new(right, bottom),
        }
    }

    pub fn width(&self) -> f32 {
        self.top_right.x - self.top_left.x
    }

    pub fn height(&self) -> f32 {
        self.bottom_left.y - self.top_left.y
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Whether two boxes overlap. Boxes that only touch do not intersect.
    pub fn intersects(&self, other: &Coordinates) -> bool {
        let left = self.top_left.x.min(other.top_left.x);
        let right = self.top_right.x.max(other.top_right.x);
        let top = self.top_left.y.min(other.top_left.y);
        let bottom = self.bottom_left.y.max(other.bottom_left.y);

        right - left < self.width() + other.width()
            && bottom - top < self.height() + other.height()
    }

    /// Area of the overlap between two boxes (0 when disjoint)
    pub fn overlap_area(&self, other: &Coordinates) -> f32 {
        let left = self.top_left.x.max(other.top_left.x);
        let right = self.top_right.x.min(other.top_right.x);
        let top = self.top_left.y.max(other.top_left.y);
        let bottom = self.bottom_left.y.min(other.bottom_left.y);

        (right - left).max(0.0) * (bottom - top).max(0.0)
    }

    /// Column-major reading order: a box entirely left of another comes first,
    /// horizontally overlapping boxes are ordered top to bottom.
    pub fn reading_cmp(&self, other: &Coordinates) -> Ordering {
        if self.top_right.x <= other.top_left.x {
            Ordering::Less
        } else if self.top_left.x >= other.top_right.x {
            Ordering::Greater
        } else {
            self.top_left.y.total_cmp(&other.top_left.y)
        }
    }
}

/// A typed, positioned block of page content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub element_type: ElementType,
    pub text: String,
    /// Page number (1-indexed)
    pub page_number: u32,
    pub coordinates: Coordinates,
    pub layout_width: f32,
    pub layout_height: f32,
    pub file_directory: String,
    pub filename: String,
    pub filetype: String,
    pub languages: Vec<String>,
}

impl Element {
    /// Create an element. Ligatures are expanded and line-break hyphenation is repaired.
    pub fn new(
        element_type: ElementType,
        text: &str,
        page_number: u32,
        coordinates: Coordinates,
    ) -> Self {
        Self {
            element_type,
            text: dehyphenate(&expand_ligatures(text)),
            page_number,
            coordinates,
            layout_width: 0.0,
            layout_height: 0.0,
            file_directory: String::new(),
            filename: String::new(),
            filetype: String::new(),
            languages: Vec::new(),
        }
    }

    pub fn with_layout(mut self, width: f32, height: f32) -> Self {
        self.layout_width = width;
        self.layout_height = height;
        self
    }

    pub fn with_file(mut self, directory: &str, filename: &str, filetype: &str) -> Self {
        self.file_directory = directory.to_string();
        self.filename = filename.to_string();
        self.filetype = filetype.to_string();
        self
    }

    pub fn is_type(&self, element_type: ElementType) -> bool {
        self.element_type == element_type
    }
}

// ============================================================================
// Partition JSON format
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(rename = "type")]
    element_type: String,
    #[serde(default)]
    text: String,
    metadata: RawMetadata,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    page_number: u32,
    coordinates: RawCoordinates,
    #[serde(default)]
    languages: Vec<String>,
    #[serde(default)]
    file_directory: String,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    filetype: String,
}

#[derive(Debug, Deserialize)]
struct RawCoordinates {
    points: Vec<[f32; 2]>,
    layout_width: f32,
    layout_height: f32,
}

impl TryFrom<RawElement> for Element {
    type Error = Error;

    fn try_from(raw: RawElement) -> Result<Self> {
        let points = &raw.metadata.coordinates.points;
        // Points are listed counter-clockwise from the top-left corner
        let [tl, bl, br, tr] = match points.as_slice() {
            [tl, bl, br, tr, ..] => [*tl, *bl, *br, *tr],
            _ => {
                return Err(Error::InvalidElement {
                    reason: format!("expected 4 coordinate points, got {}", points.len()),
                })
            }
        };

        let coordinates = Coordinates {
            top_left: Point::new(tl[0], tl[1]),
            top_right: Point::new(tr[0], tr[1]),
            bottom_left: Point::new(bl[0], bl[1]),
            bottom_right: Point::new(br[0], br[1]),
        };

        let mut element = Element::new(
            ElementType::parse(&raw.element_type),
            &raw.text,
            raw.metadata.page_number,
            coordinates,
        )
        .with_layout(
            raw.metadata.coordinates.layout_width,
            raw.metadata.coordinates.layout_height,
        )
        .with_file(
            &raw.metadata.file_directory,
            &raw.metadata.filename,
            &raw.metadata.filetype,
        );
        element.languages = raw.metadata.languages;
        Ok(element)
    }
}

/// Load elements from a JSON array of partition records
/// (`type`, `text`, `metadata.page_number`, `metadata.coordinates`).
pub fn elements_from_json(json: &str) -> Result<Vec<Element>> {
    let raw: Vec<RawElement> = serde_json::from_str(json)?;
    raw.into_iter().map(Element::try_from).collect()
}

// ============================================================================
// Text repair
// ============================================================================

/// Hyphenated compounds that get split across tokens as `end-to- end`
const JOINED_COMPOUNDS: [&str; 2] = ["end-to-end", "state-of-the-art"];

/// Second halves of compounds that keep their hyphen when rejoined.
static COMPOUND_SUFFIXES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "aware", "based", "centered", "class", "dependent", "domain", "driven", "efficient",
        "end", "fold", "free", "friendly", "grained", "independent", "intensive", "invariant",
        "level", "like", "modal", "order", "oriented", "related", "scale", "sensitive", "shot",
        "specific", "step", "style", "supervised", "task", "time", "trained", "type", "wise",
        "world",
    ]
    .into_iter()
    .collect()
});

/// Expand common typographic ligatures found in PDFs.
pub fn expand_ligatures(text: &str) -> String {
    text.replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{FB05}', '\u{FB06}'], "st")
}

fn keeps_hyphen(stem: &str, next: &str) -> bool {
    let next_word = next
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_lowercase();
    if COMPOUND_SUFFIXES.contains(next_word.as_str()) {
        return true;
    }

    let last = stem.rsplit('-').next().unwrap_or(stem);
    let is_acronym = last.chars().count() > 1 && last.chars().all(|c| c.is_ascii_uppercase());
    let starts_upper_or_digit = next
        .chars()
        .next()
        .is_some_and(|c| c.is_uppercase() || c.is_ascii_digit());

    is_acronym
        || last.chars().count() == 1
        || last.chars().any(|c| c.is_ascii_digit())
        || starts_upper_or_digit
}

/// Rejoin words split by line-break hyphenation.
///
/// - `"detec- tion"` → `"detection"`
/// - `"data- driven"` → `"data-driven"`
/// - `"end-to- end."` → `"end-to-end."`
pub fn dehyphenate(text: &str) -> String {
    let tokens: Vec<&str> = text.split(' ').collect();
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());

    let mut i = 0;
    while i < tokens.len() {
        let prev = tokens[i];
        if let Some(&next) = tokens.get(i + 1) {
            let bare_next = next.strip_suffix('.').unwrap_or(next);
            let combined = format!("{}{}", prev, bare_next).to_lowercase();

            if JOINED_COMPOUNDS.contains(&combined.as_str()) {
                out.push(format!("{}{}", prev, next));
                i += 2;
                continue;
            }

            if let Some(stem) = prev.strip_suffix('-') {
                if !stem.is_empty() && !bare_next.is_empty() {
                    if keeps_hyphen(stem, bare_next) {
                        out.push(format!("{}{}", prev, next));
                    } else {
                        out.push(format!("{}{}", stem, next));
                    }
                    i += 2;
                    continue;
                }
            }
        }
        out.push(prev.to_string());
        i += 1;
    }

    out.join(" ")
}
