use super::{element_text, Extractor, ParsingContext};
use crate::error::ScrapeError;
use crate::model::FoodMetadata;
use log::debug;
use regex::Regex;
use reqwest::Url;
use scraper::Selector;
use std::sync::LazyLock;

static IMAGES: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").unwrap());
static TABLE_ROWS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table tr").unwrap());
static CELLS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap());

const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

/// Picks up the product photo, data source and publication date that the
/// current and industry editions show next to the nutrient table
pub struct MetadataExtractor;

impl MetadataExtractor {
    fn find_image(&self, context: &ParsingContext) -> Option<String> {
        let src = context
            .document
            .select(&IMAGES)
            .filter_map(|img| img.value().attr("src"))
            .find(|src| {
                let lower = src.to_lowercase();
                lower.contains("uploads") && IMAGE_EXTENSIONS.iter().any(|ext| lower.contains(ext))
            })?;

        // The page uses relative upload paths
        let resolved = Url::parse(&context.url)
            .and_then(|base| base.join(src))
            .map(|url| url.to_string())
            .unwrap_or_else(|_| src.to_string());
        Some(resolved)
    }

    fn find_source(&self, context: &ParsingContext) -> Option<String> {
        for row in context.document.select(&TABLE_ROWS) {
            let cells: Vec<_> = row.select(&CELLS).collect();
            if cells.len() < 3 {
                continue;
            }
            if element_text(cells[0]).eq_ignore_ascii_case("source") {
                let source = element_text(cells[2]);
                return (!source.is_empty()).then_some(source);
            }
        }
        None
    }

    fn find_published_date(&self, context: &ParsingContext) -> Option<String> {
        let html = context.document.html();
        ISO_DATE.find(&html).map(|m| m.as_str().to_string())
    }
}

impl Extractor for MetadataExtractor {
    type Output = FoodMetadata;

    fn parse(&self, context: &ParsingContext) -> Result<FoodMetadata, ScrapeError> {
        let metadata = FoodMetadata {
            image: self.find_image(context),
            source: self.find_source(context),
            published_date: self.find_published_date(context),
        };
        debug!("Metadata for {}: {:?}", context.url, metadata);
        Ok(metadata)
    }
}
