use log::debug;

use crate::error::ScrapeError;
use crate::extractors::{Extractor, MetadataExtractor, NutrientTableExtractor, ParsingContext};
use crate::fetchers::PageFetcher;
use crate::model::{FoodItem, FoodMetadata, FoodRecord};

/// Render one item's detail page and extract its record
///
/// # Arguments
/// * `fetcher` - Page fetcher of the current run
/// * `item` - Listing entry of the item
/// * `with_metadata` - Also look for image, source and published date
pub async fn process(
    fetcher: &dyn PageFetcher,
    item: &FoodItem,
    with_metadata: bool,
) -> Result<FoodRecord, ScrapeError> {
    let html = fetcher.fetch(&item.detail_url).await?;
    extract_record(item, &html, with_metadata)
}

/// Build a record from an already rendered detail page
pub fn extract_record(
    item: &FoodItem,
    html: &str,
    with_metadata: bool,
) -> Result<FoodRecord, ScrapeError> {
    let context = ParsingContext::new(&item.detail_url, html);

    let metadata = if with_metadata {
        MetadataExtractor.parse(&context)?
    } else {
        FoodMetadata::default()
    };
    let groups = NutrientTableExtractor.parse(&context)?;

    let record = FoodRecord::new(item, metadata, groups);
    debug!(
        "{}: {} categories, {} nutrients",
        record.ndb_no,
        record.category_count(),
        record.nutrient_count()
    );
    Ok(record)
}
