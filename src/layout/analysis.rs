//! Geometric predicates and reading-order normalisation over layout elements

use super::element::{Coordinates, Element, ElementType, HeaderType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Element types that bound the body of the paper
const TEXT_AREA_TYPES: [ElementType; 5] = [
    ElementType::NarrativeText,
    ElementType::ListItem,
    ElementType::Image,
    ElementType::Table,
    ElementType::FigureCaption,
];

fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f32>() / values.len() as f32)
}

/// Population standard deviation
fn std_dev(values: &[f32]) -> Option<f32> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f32>() / values.len() as f32;
    Some(var.sqrt())
}

fn median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Whether the element is the heading that opens the bibliography
pub fn is_reference_section(element: &Element) -> bool {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)references?$").unwrap());

    element.is_type(ElementType::Title)
        && RE.is_match(element.text.trim())
        && element.text.chars().count() < 15
}

/// Heading level from the numbering prefix of a title
pub fn header_type(element: &Element) -> HeaderType {
    static LEVELS: Lazy<[Regex; 5]> = Lazy::new(|| {
        [
            Regex::new(r"^\d+\.?\s").unwrap(),
            Regex::new(r"^\d+\.\d+\.?\s").unwrap(),
            Regex::new(r"^\d+\.\d+\.\d+\.?\s").unwrap(),
            Regex::new(r"^\d+\.\d+\.\d+\.\d+\.?\s").unwrap(),
            Regex::new(r"^\d+\.\d+\.\d+\.\d+\.\d+\.?\s").unwrap(),
        ]
    });
    static ROMAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[IVX]+\.\s").unwrap());

    let text = element.text.as_str();
    let header = [
        HeaderType::FirstHeader,
        HeaderType::SecondHeader,
        HeaderType::ThirdHeader,
        HeaderType::FourthHeader,
        HeaderType::FifthHeader,
    ]
    .into_iter()
    .zip(LEVELS.iter())
    .find(|(_, re)| re.is_match(text))
    .map(|(header, _)| header);

    if let Some(header) = header {
        header
    } else if ROMAN.is_match(text) {
        HeaderType::FirstHeader
    } else if text.trim().to_lowercase().starts_with("appendix") {
        HeaderType::AppendixHeader
    } else {
        HeaderType::Unknown
    }
}

/// Height band that plausible section titles fall in
#[derive(Debug, Clone, Copy)]
pub struct TitleBand {
    low: f32,
    high: f32,
}

impl TitleBand {
    /// Mean ± `sigma` standard deviations of all Title heights
    pub fn from_elements(elements: &[Element], sigma: f32) -> Option<Self> {
        let heights: Vec<f32> = elements
            .iter()
            .filter(|e| e.is_type(ElementType::Title))
            .map(|e| e.coordinates.height())
            .collect();

        let m = mean(&heights)?;
        let s = std_dev(&heights)?;
        Some(Self {
            low: m - s * sigma,
            high: m + s * sigma,
        })
    }

    pub fn contains(&self, element: &Element) -> bool {
        let h = element.coordinates.height();
        self.low <= h && h <= self.high
    }
}

/// Whether a title's height is consistent with the other titles in the document
pub fn is_title(element: &Element, elements: &[Element], sigma: f32) -> bool {
    TitleBand::from_elements(elements, sigma).is_some_and(|band| band.contains(element))
}

/// Whether more than `threshold` of the element's area lies inside the text area
pub fn is_in_text_area(element: &Element, text_area: &Coordinates, threshold: f32) -> bool {
    let element_area = element.coordinates.area();
    if element_area <= 0.0 {
        return false;
    }
    element.coordinates.overlap_area(text_area) / element_area > threshold
}

fn same_page_of_type<'a>(
    element: &'a Element,
    elements: &'a [Element],
    element_type: ElementType,
) -> impl Iterator<Item = &'a Element> {
    elements
        .iter()
        .filter(move |e| e.is_type(element_type) && e.page_number == element.page_number)
}

/// Whether the element is a table or overlaps one on the same page
pub fn is_part_of_table(element: &Element, elements: &[Element]) -> bool {
    if element.is_type(ElementType::Table) {
        return true;
    }

    same_page_of_type(element, elements, ElementType::Table)
        .any(|table| element.coordinates.intersects(&table.coordinates))
}

/// Whether the element captions an image: it starts with "fig" and overlaps
/// an image or sits just below one.
pub fn is_figure_caption(element: &Element, elements: &[Element], distance: f32) -> bool {
    if element.is_type(ElementType::FigureCaption) {
        return true;
    }

    if !element.text.to_lowercase().starts_with("fig") {
        return false;
    }

    same_page_of_type(element, elements, ElementType::Image).any(|image| {
        let y_diff = element.coordinates.top_left.y - image.coordinates.bottom_left.y;
        element.coordinates.intersects(&image.coordinates) || (0.0 < y_diff && y_diff < distance)
    })
}

/// Whether the element captions a table: it starts with "table" and overlaps
/// a table or sits just above one.
pub fn is_table_caption(element: &Element, elements: &[Element], distance: f32) -> bool {
    if element.is_type(ElementType::FigureCaption) {
        return true;
    }

    if !element.text.to_lowercase().starts_with("table") {
        return false;
    }

    same_page_of_type(element, elements, ElementType::Table).any(|table| {
        let y_diff = table.coordinates.top_left.y - element.coordinates.bottom_left.y;
        element.coordinates.intersects(&table.coordinates) || (0.0 < y_diff && y_diff < distance)
    })
}

/// Median box enclosing body content across pages.
///
/// Each page contributes its topmost and leftmost positive edge and its
/// rightmost and bottommost edge over body-type elements. Pages without such
/// elements count as 0 for top/left and the document-wide maximum for
/// right/bottom.
pub fn text_area(elements: &[Element]) -> Coordinates {
    let page_count = elements.iter().map(|e| e.page_number).max().unwrap_or(0);

    let mut tops = Vec::with_capacity(page_count as usize);
    let mut lefts = Vec::with_capacity(page_count as usize);
    let mut rights: Vec<Option<f32>> = Vec::with_capacity(page_count as usize);
    let mut bottoms: Vec<Option<f32>> = Vec::with_capacity(page_count as usize);

    for page in 1..=page_count {
        let on_page: Vec<&Coordinates> = elements
            .iter()
            .filter(|e| e.page_number == page && TEXT_AREA_TYPES.contains(&e.element_type))
            .map(|e| &e.coordinates)
            .collect();

        let min_positive = |values: Vec<f32>| {
            values
                .into_iter()
                .filter(|v| *v > 0.0)
                .reduce(f32::min)
                .unwrap_or(0.0)
        };
        tops.push(min_positive(on_page.iter().map(|c| c.top_left.y).collect()));
        lefts.push(min_positive(on_page.iter().map(|c| c.top_left.x).collect()));
        rights.push(on_page.iter().map(|c| c.top_right.x).reduce(f32::max));
        bottoms.push(on_page.iter().map(|c| c.bottom_left.y).reduce(f32::max));
    }

    let right_max = rights.iter().flatten().copied().reduce(f32::max);
    let bottom_max = bottoms.iter().flatten().copied().reduce(f32::max);

    let (Some(right_max), Some(bottom_max)) = (right_max, bottom_max) else {
        // No body-type elements at all: fall back to the whole page layout
        let width = elements.iter().map(|e| e.layout_width).fold(0.0, f32::max);
        let height = elements.iter().map(|e| e.layout_height).fold(0.0, f32::max);
        return Coordinates::from_bounds(0.0, 0.0, width, height);
    };

    let rights: Vec<f32> = rights.into_iter().map(|v| v.unwrap_or(right_max)).collect();
    let bottoms: Vec<f32> = bottoms.into_iter().map(|v| v.unwrap_or(bottom_max)).collect();

    Coordinates::from_bounds(
        median(&lefts),
        median(&tops),
        median(&rights),
        median(&bottoms),
    )
}

/// Whether the narrative text is narrow enough relative to the text area to
/// indicate a two-column layout
pub fn is_two_column(elements: &[Element], text_area: &Coordinates) -> bool {
    let widths: Vec<f32> = elements
        .iter()
        .filter(|e| e.is_type(ElementType::NarrativeText))
        .map(|e| e.coordinates.width())
        .collect();

    mean(&widths).is_some_and(|avg| avg < text_area.width() / 1.5)
}

/// Snap every element's horizontal extent to its column so that reading
/// order only depends on column and vertical position.
pub fn adjust_width(elements: &mut [Element], text_area: &Coordinates, inset: f32) {
    let column_width = text_area.width() / 2.2;
    let left = text_area.top_left.x;
    let right = text_area.top_right.x;

    let two_column = is_two_column(elements, text_area);
    tracing::debug!(two_column, "column layout");

    for element in elements.iter_mut() {
        let (new_left, new_right) = if !two_column {
            (left + inset, right - inset)
        } else if element.coordinates.top_right.x < left + text_area.width() / 2.0 {
            (left + inset, left + column_width - inset)
        } else {
            (right - column_width - inset, right - inset)
        };

        let c = &mut element.coordinates;
        c.top_left.x = new_left;
        c.bottom_left.x = new_left;
        c.top_right.x = new_right;
        c.bottom_right.x = new_right;
    }
}

/// Group elements by page and sort each page into reading order
pub fn sort_elements(elements: Vec<Element>) -> Vec<Element> {
    let mut by_page: BTreeMap<u32, Vec<Element>> = BTreeMap::new();
    for element in elements {
        by_page.entry(element.page_number).or_default().push(element);
    }

    by_page
        .into_values()
        .flat_map(|mut page| {
            page.sort_by(|a, b| a.coordinates.reading_cmp(&b.coordinates));
            page
        })
        .collect()
}
