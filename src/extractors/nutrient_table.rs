use super::{element_text, Extractor, ParsingContext};
use crate::error::ScrapeError;
use crate::model::{group_records, NutrientEntry, NutrientGroup, NutrientRecord};
use log::{debug, warn};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// DOM id of the nutrient table on every detail page
pub const NUTRIENT_TABLE_ID: &str = "tableDetailNutrient";

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(&format!("#{NUTRIENT_TABLE_ID}")).unwrap());
static HEADER_CELLS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("thead th").unwrap());
static BODY_ROWS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody tr").unwrap());
static DATA_CELLS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static ANY_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());
static SPANNING_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[colspan]").unwrap());

static DISALLOWED_KEY_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s\[\]().]").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Background colour the site uses for category header rows
const CATEGORY_BACKGROUNDS: [&str; 2] = [
    "background-color:#f2f2f2",
    "background-color:rgb(242,242,242)",
];

/// Turn a serving-size column header into a JSON key.
///
/// Keeps word characters, brackets, parentheses and dots; everything else
/// becomes `_` and whitespace runs become a single `_`. Different headers can
/// map to the same key.
pub fn sanitize_serving_key(header: &str) -> String {
    let replaced = DISALLOWED_KEY_CHARS.replace_all(header.trim(), "_");
    WHITESPACE.replace_all(&replaced, "_").into_owned()
}

/// Whether `html` contains the nutrient table element
pub fn has_nutrient_table(html: &str) -> bool {
    Html::parse_document(html).select(&TABLE).next().is_some()
}

/// Cell placeholder for "no value"
fn is_blank(value: &str) -> bool {
    value.is_empty() || value == "-"
}

fn is_category_row(row: ElementRef) -> bool {
    let style: String = row
        .value()
        .attr("style")
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    CATEGORY_BACKGROUNDS.iter().any(|bg| style.contains(bg))
        || row.select(&SPANNING_CELL).next().is_some()
}

/// Extracts the category and nutrient rows of `#tableDetailNutrient`
pub struct NutrientTableExtractor;

impl NutrientTableExtractor {
    /// Classify every body row, in page order
    pub fn records(&self, context: &ParsingContext) -> Result<Vec<NutrientRecord>, ScrapeError> {
        let table = context
            .document
            .select(&TABLE)
            .next()
            .ok_or_else(|| ScrapeError::MissingTable(context.url.clone()))?;

        let headers: Vec<String> = table.select(&HEADER_CELLS).map(element_text).collect();
        debug!("Nutrient table headers: {:?}", headers);

        let mut records = Vec::new();
        for (index, row) in table.select(&BODY_ROWS).enumerate() {
            match self.parse_row(row, &headers) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => debug!("Skipping row {} without a usable name", index),
                Err(e) => warn!("Dropping row {} on {}: {}", index, context.url, e),
            }
        }

        Ok(records)
    }

    fn parse_row(
        &self,
        row: ElementRef,
        headers: &[String],
    ) -> Result<Option<NutrientRecord>, String> {
        if is_category_row(row) {
            let cell = row
                .select(&ANY_CELL)
                .next()
                .ok_or("category row has no cells")?;
            let category = element_text(cell);
            return Ok((!category.is_empty()).then_some(NutrientRecord::Category { category }));
        }

        let cells: Vec<String> = row.select(&DATA_CELLS).map(element_text).collect();
        if cells.len() < 3 {
            return Ok(None);
        }

        let name = &cells[0];
        if name.is_empty() {
            return Ok(None);
        }

        let mut entry = NutrientEntry::new(name.clone());

        if !is_blank(&cells[1]) {
            entry.unit = Some(cells[1].clone());
        }

        if !is_blank(&cells[2]) {
            if headers.get(2).is_some_and(|h| is_per_100ml(h)) {
                entry.value_per_100ml = Some(cells[2].clone());
            } else {
                entry.value_per_100g = Some(cells[2].clone());
            }
        }

        for (value, header) in cells.iter().zip(headers.iter()).skip(3) {
            if is_blank(value) || header.trim().is_empty() {
                continue;
            }
            entry.servings.insert(serving_key(header), value.clone());
        }

        Ok(Some(NutrientRecord::Nutrient(entry)))
    }
}

/// Serving key for a column; keys that would shadow a fixed nutrient field
/// get a `_serving` suffix
fn serving_key(header: &str) -> String {
    let key = sanitize_serving_key(header);
    if NutrientEntry::FIELD_NAMES.contains(&key.as_str()) {
        let renamed = format!("{key}_serving");
        warn!(
            "Serving column '{}' clashes with a nutrient field, stored as '{}'",
            header, renamed
        );
        renamed
    } else {
        key
    }
}

fn is_per_100ml(header: &str) -> bool {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .contains("100ml")
}

impl Extractor for NutrientTableExtractor {
    type Output = Vec<NutrientGroup>;

    fn parse(&self, context: &ParsingContext) -> Result<Vec<NutrientGroup>, ScrapeError> {
        debug!("Extracting nutrient table from {}", context.url);
        Ok(group_records(self.records(context)?))
    }
}
