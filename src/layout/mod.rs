//! Layout element model and analysis
//!
//! Elements are typed, positioned blocks of page content. The analysis
//! functions decide which of them belong to the body of a paper and put them
//! into reading order.

mod analysis;
mod element;

pub use analysis::{
    adjust_width, header_type, is_figure_caption, is_in_text_area, is_part_of_table,
    is_reference_section, is_table_caption, is_title, is_two_column, sort_elements, text_area,
    TitleBand,
};
pub use element::{
    dehyphenate, elements_from_json, expand_ligatures, Coordinates, Element, ElementType,
    HeaderType, Point,
};
