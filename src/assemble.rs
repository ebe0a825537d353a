//! Text assembly: from layout elements to sectioned body text

use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::layout::{
    adjust_width, header_type, is_figure_caption, is_in_text_area, is_part_of_table,
    is_reference_section, is_table_caption, sort_elements, text_area, Coordinates, Element,
    ElementType, HeaderType, TitleBand,
};
use crate::paper::{PageText, PaperMetadata, ParsedPaper, Section};

/// Section that collects text appearing before the first recognised heading
pub const ABSTRACT: &str = "Abstract";

/// Element types that can contribute body text
const TEXT_TYPES: [ElementType; 3] = [
    ElementType::Title,
    ElementType::NarrativeText,
    ElementType::ListItem,
];

/// Ordered section accumulator. Re-opening a section empties it in place.
struct SectionBuilder {
    sections: Vec<Section>,
    current: usize,
}

impl SectionBuilder {
    fn new() -> Self {
        Self {
            sections: vec![Section {
                title: ABSTRACT.to_string(),
                text: String::new(),
            }],
            current: 0,
        }
    }

    fn open(&mut self, title: &str) {
        if let Some(index) = self.sections.iter().position(|s| s.title == title) {
            self.sections[index].text.clear();
            self.current = index;
        } else {
            self.sections.push(Section {
                title: title.to_string(),
                text: String::new(),
            });
            self.current = self.sections.len() - 1;
        }
    }

    fn push_text(&mut self, text: &str) {
        let section = &mut self.sections[self.current];
        section.text.push_str(text.trim());
        section.text.push(' ');
    }

    fn finish(self) -> Vec<Section> {
        self.sections
            .into_iter()
            .filter_map(|mut s| {
                let trimmed = s.text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                s.text = trimmed.to_string();
                Some(s)
            })
            .collect()
    }
}

/// Select the elements that make up the body of the paper, stopping at the
/// bibliography heading.
pub fn select_body_elements<'a>(
    elements: &'a [Element],
    area: &Coordinates,
    config: &LayoutConfig,
) -> Vec<&'a Element> {
    let titles = TitleBand::from_elements(elements, config.title_sigma);

    let mut selected = Vec::new();
    for element in elements {
        if is_reference_section(element) {
            break;
        }

        let keep = TEXT_TYPES.contains(&element.element_type)
            && is_in_text_area(element, area, config.text_area_threshold)
            && !is_figure_caption(element, elements, config.caption_distance)
            && !is_table_caption(element, elements, config.caption_distance)
            && !is_part_of_table(element, elements)
            && !(element.is_type(ElementType::Title)
                && !titles.is_some_and(|band| band.contains(element)));

        if keep {
            selected.push(element);
        }
    }
    selected
}

/// Group body elements into sections
pub fn build_sections(body: &[&Element]) -> Vec<Section> {
    let mut builder = SectionBuilder::new();

    for element in body {
        if element.is_type(ElementType::Title) {
            tracing::debug!(heading = %element.text, "processing heading");

            let lower = element.text.to_lowercase();
            if lower.contains("abstract") {
                builder.open(ABSTRACT);
                continue;
            }
            if lower.contains("introduction") {
                builder.open(element.text.trim());
                continue;
            }
            if matches!(
                header_type(element),
                HeaderType::FirstHeader | HeaderType::AppendixHeader
            ) {
                builder.open(element.text.trim());
                continue;
            }
        }
        builder.push_text(&element.text);
    }

    builder.finish()
}

fn build_pages(elements: &[Element]) -> Vec<PageText> {
    let mut pages: Vec<PageText> = Vec::new();
    for element in elements {
        let text = element.text.trim();
        if element.is_type(ElementType::Image) || text.is_empty() {
            continue;
        }
        match pages.last_mut() {
            Some(page) if page.page == element.page_number => {
                page.text.push('\n');
                page.text.push_str(text);
            }
            _ => pages.push(PageText {
                page: element.page_number,
                text: text.to_string(),
            }),
        }
    }
    pages
}

/// Turn partitioned layout elements into a [`ParsedPaper`].
///
/// Elements are normalised to their columns, sorted into reading order and
/// filtered down to body text, which is then grouped under its headings.
pub fn assemble_paper(
    source: &str,
    mut elements: Vec<Element>,
    page_count: u32,
    metadata: PaperMetadata,
    config: &LayoutConfig,
) -> Result<ParsedPaper> {
    if elements.is_empty() {
        return Err(Error::EmptyDocument {
            source_name: source.to_string(),
        });
    }

    let area = text_area(&elements);
    adjust_width(&mut elements, &area, config.column_inset);
    let elements = sort_elements(elements);

    let last_page = elements.iter().map(|e| e.page_number).max().unwrap_or(0);
    tracing::info!(
        pages = last_page,
        elements = elements.len(),
        "sorted layout elements"
    );

    let body = select_body_elements(&elements, &area, config);
    tracing::info!(text_elements = body.len(), "selected body text");

    let sections = build_sections(&body);
    if sections.is_empty() {
        tracing::warn!(source, "no body text found");
    }

    Ok(ParsedPaper {
        source: source.to_string(),
        page_count: page_count.max(last_page),
        metadata,
        sections,
        pages: build_pages(&elements),
    })
}
