//! Glyph grouping and block classification
//!
//! Everything here works on plain geometry in a top-left-origin space, so it
//! is independent of the PDF library that produced the glyphs.

use crate::layout::{Coordinates, ElementType};
use once_cell::sync::Lazy;
use regex::Regex;

/// Character information for layout extraction
#[derive(Debug, Clone)]
pub struct CharInfo {
    /// The character
    pub char: char,
    /// X coordinate (left)
    pub x: f32,
    /// Y coordinate (top, growing downwards)
    pub y: f32,
    /// Character width
    pub width: f32,
    /// Character height (used for font size estimation)
    pub height: f32,
}

/// Per-page thresholds derived from the glyph size distribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Maximum vertical offset between glyphs of one line
    pub line_tolerance: f32,
    /// Minimum horizontal gap that separates two words
    pub space_threshold: f32,
    /// Median glyph height, taken as the body font size
    pub body_height: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            line_tolerance: 5.0,
            space_threshold: 10.0,
            body_height: 10.0,
        }
    }
}

/// Tuning knobs for turning glyphs into classified blocks
#[derive(Debug, Clone)]
pub struct PdfiumConfig {
    /// Fraction of page height at the top treated as running header
    pub header_band: f32,
    /// Fraction of page height at the bottom treated as running footer
    pub footer_band: f32,
    /// Minimum horizontal gap that splits a line into separate columns
    pub column_gap: f32,
    /// Line spacing multiplier beyond which a new block starts
    pub paragraph_threshold: f32,
    /// Font size ratio over body text from which a short block is a heading
    pub title_scale: f32,
}

impl Default for PdfiumConfig {
    fn default() -> Self {
        Self {
            header_band: 0.04,
            footer_band: 0.05,
            column_gap: 15.0,
            paragraph_threshold: 1.5,
            title_scale: 1.15,
        }
    }
}

/// A run of glyphs on one baseline within one column
#[derive(Debug, Clone)]
pub struct LineInfo {
    /// Characters in reading order
    pub chars: Vec<CharInfo>,
    pub top: f32,
    pub bottom: f32,
    pub min_x: f32,
    pub max_x: f32,
    /// Average character height (font size proxy)
    pub avg_height: f32,
    /// Gaps between glyphs wider than about one em
    pub wide_gaps: usize,
}

impl LineInfo {
    fn from_chars(chars: Vec<CharInfo>, wide_gap: f32) -> Self {
        let avg_height = chars.iter().map(|c| c.height).sum::<f32>() / chars.len().max(1) as f32;
        let top = chars.iter().map(|c| c.y).fold(f32::MAX, f32::min);
        let bottom = chars.iter().map(|c| c.y + c.height).fold(f32::MIN, f32::max);
        let min_x = chars.iter().map(|c| c.x).fold(f32::MAX, f32::min);
        let max_x = chars.iter().map(|c| c.x + c.width).fold(f32::MIN, f32::max);

        let wide_gaps = gaps_wider_than(&chars, wide_gap).len();

        Self {
            chars,
            top,
            bottom,
            min_x,
            max_x,
            avg_height,
            wide_gaps,
        }
    }

    /// Line text with spaces inserted at word gaps
    pub fn text(&self, space_threshold: f32) -> String {
        let mut result = String::new();
        let mut prev_right: Option<f32> = None;

        for c in &self.chars {
            if c.char.is_whitespace() {
                if !result.is_empty() && !result.ends_with(' ') {
                    result.push(' ');
                }
            } else {
                if let Some(right) = prev_right {
                    if c.x - right > space_threshold && !result.ends_with(' ') {
                        result.push(' ');
                    }
                }
                result.push(c.char);
            }
            prev_right = Some(c.x + c.width);
        }

        result.trim().to_string()
    }
}

/// Vertically adjacent lines of similar size in one column
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<LineInfo>,
}

impl TextBlock {
    fn new(line: LineInfo) -> Self {
        Self { lines: vec![line] }
    }

    pub fn top(&self) -> f32 {
        self.lines.iter().map(|l| l.top).fold(f32::MAX, f32::min)
    }

    pub fn bottom(&self) -> f32 {
        self.lines.iter().map(|l| l.bottom).fold(f32::MIN, f32::max)
    }

    pub fn left(&self) -> f32 {
        self.lines.iter().map(|l| l.min_x).fold(f32::MAX, f32::min)
    }

    pub fn right(&self) -> f32 {
        self.lines.iter().map(|l| l.max_x).fold(f32::MIN, f32::max)
    }

    pub fn avg_height(&self) -> f32 {
        self.lines.iter().map(|l| l.avg_height).sum::<f32>() / self.lines.len() as f32
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::from_bounds(self.left(), self.top(), self.right(), self.bottom())
    }

    /// Block text, lines joined by single spaces
    pub fn text(&self, space_threshold: f32) -> String {
        self.lines
            .iter()
            .map(|l| l.text(space_threshold))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn accepts(&self, line: &LineInfo, paragraph_threshold: f32) -> bool {
        let Some(last) = self.lines.last() else {
            return false;
        };

        let overlaps = line.min_x < self.right() && line.max_x > self.left();
        let pitch = line.top - last.top;
        let normal_pitch = last.avg_height.max(line.avg_height);
        let similar_size = (line.avg_height - last.avg_height).abs()
            <= 0.2 * last.avg_height.max(line.avg_height);

        overlaps && pitch >= 0.0 && pitch <= normal_pitch * paragraph_threshold && similar_size
    }
}

/// Calculate dynamic thresholds based on font size distribution
pub fn calculate_dynamic_thresholds(chars: &[CharInfo]) -> Thresholds {
    let mut heights: Vec<f32> = chars
        .iter()
        .filter(|c| c.height > 0.0 && !c.char.is_whitespace())
        .map(|c| c.height)
        .collect();

    if heights.is_empty() {
        return Thresholds::default();
    }

    heights.sort_by(f32::total_cmp);
    let median_height = heights[heights.len() / 2];

    // ~40% of the font height covers baseline jitter within a line,
    // ~30% separates words
    Thresholds {
        line_tolerance: (median_height * 0.4).max(2.0),
        space_threshold: (median_height * 0.3).max(3.0),
        body_height: median_height,
    }
}

/// Number of ordinary rows that must share a gap before table rows are split at it
const GUTTER_SUPPORT: usize = 3;

/// Horizontal gaps between consecutive visible glyphs (sorted by x) that are
/// wider than `min_gap`, as `(left, right)` edges.
fn gaps_wider_than(chars: &[CharInfo], min_gap: f32) -> Vec<(f32, f32)> {
    let mut gaps = Vec::new();
    let mut prev_right: Option<f32> = None;
    for c in chars.iter().filter(|c| !c.char.is_whitespace()) {
        if let Some(right) = prev_right {
            if c.x - right > min_gap {
                gaps.push((right, c.x));
            }
        }
        prev_right = Some(prev_right.map_or(c.x + c.width, |r| r.max(c.x + c.width)));
    }
    gaps
}

/// Group characters into lines by Y proximity, then split each line at
/// column-sized gaps.
///
/// Consecutive rows with two or more wide gaps are table rows. They are only
/// split at gaps shared with the ordinary rows of the page (a column gutter),
/// so their cells stay on one line.
pub fn group_into_lines(chars: Vec<CharInfo>, thresholds: &Thresholds, column_gap: f32) -> Vec<LineInfo> {
    let mut sorted = chars;
    sorted.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    let mut rows: Vec<Vec<CharInfo>> = Vec::new();
    let mut current_y: Option<f32> = None;

    for c in sorted {
        let same_line = current_y.is_some_and(|y| (c.y - y).abs() <= thresholds.line_tolerance);
        match rows.last_mut() {
            Some(row) if same_line => row.push(c),
            _ => {
                current_y = Some(c.y);
                rows.push(vec![c]);
            }
        }
    }
    for row in &mut rows {
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
    }

    // Word gaps are ~0.3em; table cells are usually separated by a full em
    let wide_gap = thresholds.body_height.max(thresholds.space_threshold * 2.0);

    let multi_gap: Vec<bool> = rows
        .iter()
        .map(|row| gaps_wider_than(row, wide_gap).len() >= 2)
        .collect();
    let in_table: Vec<bool> = (0..rows.len())
        .map(|i| {
            multi_gap[i]
                && ((i > 0 && multi_gap[i - 1]) || multi_gap.get(i + 1).copied().unwrap_or(false))
        })
        .collect();
    let gutters: Vec<(f32, f32)> = rows
        .iter()
        .zip(&in_table)
        .filter(|(_, table)| !**table)
        .flat_map(|(row, _)| gaps_wider_than(row, column_gap))
        .collect();
    let is_gutter = |left: f32, right: f32| {
        gutters.iter().filter(|(l, r)| *l < right && *r > left).count() >= GUTTER_SUPPORT
    };

    let mut lines = Vec::new();
    for (row, table) in rows.into_iter().zip(in_table) {
        let mut run: Vec<CharInfo> = Vec::new();
        let mut run_right = f32::MIN;
        for c in row {
            if c.char.is_whitespace() {
                if !run.is_empty() {
                    run.push(c);
                }
                continue;
            }
            let splits = !run.is_empty()
                && c.x - run_right > column_gap
                && (!table || is_gutter(run_right, c.x));
            if splits {
                flush_run(&mut run, &mut lines, wide_gap);
            }
            run_right = if run.is_empty() { c.x + c.width } else { run_right.max(c.x + c.width) };
            run.push(c);
        }
        flush_run(&mut run, &mut lines, wide_gap);
    }

    lines
}

/// Emit the pending run as a line, without trailing whitespace
fn flush_run(run: &mut Vec<CharInfo>, lines: &mut Vec<LineInfo>, wide_gap: f32) {
    while run.last().is_some_and(|c| c.char.is_whitespace()) {
        run.pop();
    }
    if !run.is_empty() {
        lines.push(LineInfo::from_chars(std::mem::take(run), wide_gap));
    }
}

/// Group lines into blocks: a line joins the most recent block in its column
/// that ends just above it with a similar font size.
pub fn group_into_blocks(mut lines: Vec<LineInfo>, paragraph_threshold: f32) -> Vec<TextBlock> {
    lines.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.min_x.total_cmp(&b.min_x)));

    let mut blocks: Vec<TextBlock> = Vec::new();
    for line in lines {
        match blocks
            .iter_mut()
            .rev()
            .find(|b| b.accepts(&line, paragraph_threshold))
        {
            Some(block) => block.lines.push(line),
            None => blocks.push(TextBlock::new(line)),
        }
    }
    blocks
}

static CAPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:fig\.?|figure)\s*\d+").unwrap());

static HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d+(?:\.\d+)*\.?|[IVX]+\.|[A-Z]\.)\s+[A-Z]").unwrap()
});

static KEYWORD_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:abstract|references|bibliography|acknowledge?ments?|appendix|conclusions?)\b",
    )
    .unwrap()
});

static LIST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[•◦▪‣∙·*\-–—]|\(?\d{1,2}\)|\(?[a-z]\)|\([ivx]+\))\s").unwrap()
});

fn is_heading(block: &TextBlock, text: &str, thresholds: &Thresholds, config: &PdfiumConfig) -> bool {
    let chars = text.chars().count();
    if block.lines.len() > 3 || chars == 0 || chars > 150 {
        return false;
    }

    let words = text.split_whitespace().count();
    let single_line = block.lines.len() == 1;

    if single_line && chars <= 80 && words <= 12 && HEADING_RE.is_match(text) {
        return true;
    }
    if single_line && chars <= 40 && KEYWORD_HEADING_RE.is_match(text) {
        return true;
    }

    block.avg_height() >= thresholds.body_height * config.title_scale && !text.ends_with('.')
}

fn is_table(block: &TextBlock) -> bool {
    let rows_with_cells = block.lines.iter().filter(|l| l.wide_gaps >= 2).count();
    block.lines.len() >= 2 && rows_with_cells * 2 >= block.lines.len()
}

/// Decide what kind of content a block holds
pub fn classify_block(
    block: &TextBlock,
    text: &str,
    page_height: f32,
    thresholds: &Thresholds,
    config: &PdfiumConfig,
) -> ElementType {
    if page_height > 0.0 {
        if block.bottom() <= page_height * config.header_band {
            return ElementType::Header;
        }
        if block.top() >= page_height * (1.0 - config.footer_band) {
            return ElementType::Footer;
        }
    }

    if CAPTION_RE.is_match(text) {
        ElementType::FigureCaption
    } else if is_heading(block, text, thresholds, config) {
        ElementType::Title
    } else if LIST_RE.is_match(text) {
        ElementType::ListItem
    } else if is_table(block) {
        ElementType::Table
    } else if block.lines.len() >= 2 || text.split_whitespace().count() >= 6 {
        ElementType::NarrativeText
    } else {
        ElementType::UncategorizedText
    }
}
