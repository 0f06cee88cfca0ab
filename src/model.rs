use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A food item as enumerated by the listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItem {
    pub ndb_no: String,
    pub description: String,
    pub food_group: String,
    pub detail_url: String,
}

/// A single nutrient row of the detail table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutrientEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_per_100g: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_per_100ml: Option<String>,
    /// Values per named serving, keyed by the sanitized column header.
    /// Headers that sanitize to the same key overwrite each other.
    #[serde(flatten)]
    pub servings: BTreeMap<String, String>,
}

impl NutrientEntry {
    /// JSON keys of the fixed fields, which serving keys share a map with
    pub const FIELD_NAMES: [&'static str; 4] =
        ["name", "unit", "value_per_100g", "value_per_100ml"];

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// One classified row of the nutrient table, in page order.
///
/// Also the element type of the flat `Nutrient` arrays written by earlier
/// scraper versions, where a nutrient belongs to the closest category
/// marker before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NutrientRecord {
    Nutrient(NutrientEntry),
    Category { category: String },
}

/// Nutrients listed under one category header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutrientGroup {
    /// `None` for rows that appear before the first category header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub nutrients: Vec<NutrientEntry>,
}

/// Fold a flat, ordered record sequence into explicit category groups.
pub fn group_records<I>(records: I) -> Vec<NutrientGroup>
where
    I: IntoIterator<Item = NutrientRecord>,
{
    let mut groups: Vec<NutrientGroup> = Vec::new();
    for record in records {
        match record {
            NutrientRecord::Category { category } => groups.push(NutrientGroup {
                category: Some(category),
                nutrients: Vec::new(),
            }),
            NutrientRecord::Nutrient(entry) => match groups.last_mut() {
                Some(group) => group.nutrients.push(entry),
                None => groups.push(NutrientGroup {
                    category: None,
                    nutrients: vec![entry],
                }),
            },
        }
    }
    groups
}

/// Optional page metadata; only some database editions publish it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodMetadata {
    #[serde(
        rename = "Image",
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<String>,
    #[serde(
        rename = "Source",
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<String>,
    #[serde(
        rename = "Published Date",
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_date: Option<String>,
}

impl FoodMetadata {
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.source.is_none() && self.published_date.is_none()
    }
}

/// The complete scraped record of one food item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodRecord {
    #[serde(rename = "NDB No")]
    pub ndb_no: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Food Group")]
    pub food_group: String,
    #[serde(flatten)]
    pub metadata: FoodMetadata,
    #[serde(rename = "Nutrient", deserialize_with = "deserialize_groups")]
    pub groups: Vec<NutrientGroup>,
}

impl FoodRecord {
    pub fn new(item: &FoodItem, metadata: FoodMetadata, groups: Vec<NutrientGroup>) -> Self {
        Self {
            ndb_no: item.ndb_no.clone(),
            description: item.description.clone(),
            food_group: item.food_group.clone(),
            metadata,
            groups,
        }
    }

    /// Number of distinct category names
    pub fn category_count(&self) -> usize {
        self.groups
            .iter()
            .filter_map(|g| g.category.as_deref())
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn nutrient_count(&self) -> usize {
        self.groups.iter().map(|g| g.nutrients.len()).sum()
    }

    pub fn nutrients(&self) -> impl Iterator<Item = &NutrientEntry> {
        self.groups.iter().flat_map(|g| g.nutrients.iter())
    }
}

// Earlier scraper versions wrote empty strings for missing metadata
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredNutrients {
    Grouped(Vec<NutrientGroup>),
    Flat(Vec<NutrientRecord>),
}

fn deserialize_groups<'de, D>(deserializer: D) -> Result<Vec<NutrientGroup>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StoredNutrients::deserialize(deserializer)? {
        StoredNutrients::Grouped(groups) => groups,
        StoredNutrients::Flat(records) => group_records(records),
    })
}
