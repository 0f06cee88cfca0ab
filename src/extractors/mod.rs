use crate::error::ScrapeError;
use scraper::{ElementRef, Html};

mod metadata;
mod nutrient_table;

pub use metadata::MetadataExtractor;
pub use nutrient_table::{
    has_nutrient_table, sanitize_serving_key, NutrientTableExtractor, NUTRIENT_TABLE_ID,
};

/// A rendered detail page
pub struct ParsingContext {
    pub url: String,
    pub document: Html,
}

impl ParsingContext {
    pub fn new(url: impl Into<String>, html: &str) -> Self {
        Self {
            url: url.into(),
            document: Html::parse_document(html),
        }
    }
}

pub trait Extractor {
    type Output;

    fn parse(&self, context: &ParsingContext) -> Result<Self::Output, ScrapeError>;
}

/// Visible text of an element with whitespace runs collapsed
pub(crate) fn element_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
