use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// A database name that is not one of the known editions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown database '{0}', expected one of: current, 1997, industry")]
pub struct UnknownDatabase(pub String);

/// The three editions of the MyFCD website
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Database {
    Current,
    Fcd1997,
    Industry,
}

/// How many items a database is expected to hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedTotal {
    Exact(usize),
    Estimate(usize),
}

impl ExpectedTotal {
    pub fn count(&self) -> usize {
        match self {
            ExpectedTotal::Exact(n) | ExpectedTotal::Estimate(n) => *n,
        }
    }
}

/// Site-specific settings of a database edition
#[derive(Debug, Clone)]
pub struct DatabaseProfile {
    pub name: &'static str,
    pub base_url: &'static str,
    pub listing_url: &'static str,
    /// Delay between two detail pages
    pub item_delay: Duration,
    /// Delay between two listing pages
    pub page_delay: Duration,
    /// How long to wait for the nutrient table to render
    pub render_timeout: Duration,
    /// Extra wait after the table appears, for client-side serving calculations
    pub settle_delay: Duration,
    /// Whether detail pages carry image, source and published date
    pub has_metadata: bool,
    pub expected_total: ExpectedTotal,
    fallback_groups: &'static [(&'static str, &'static str)],
}

impl DatabaseProfile {
    /// Food group labels used when the landing page cannot be scraped
    pub fn fallback_food_groups(&self) -> HashMap<String, String> {
        self.fallback_groups
            .iter()
            .map(|(code, label)| (code.to_string(), label.to_string()))
            .collect()
    }
}

const CURRENT_GROUPS: &[(&str, &str)] = &[
    ("1", "Cereals and grain products"),
    ("2", "Nuts, seeds and products"),
    ("3", "Legumes and legume products"),
    ("4", "Vegetables and vegetable products"),
    ("5", "Fruits and fruit products"),
    ("6", "Sugars and syrups"),
    ("7", "Meat and meat products"),
    ("8", "Eggs"),
    ("9", "Milk and milk products"),
    ("10", "Fish, shellfish and products"),
    ("11", "Oils and fats"),
    ("12", "Beverages"),
    ("13", "Miscellaneous"),
    ("14", "Starchy roots, tubers and products"),
];

const FCD1997_GROUPS: &[(&str, &str)] = &[
    ("1", "Cereals and grain products"),
    ("2", "Nuts and oil seeds"),
    ("3", "Pulses and products"),
    ("4", "Vegetables and products"),
    ("5", "Fruits and products"),
    ("6", "Sugar and products"),
    ("7", "Meat and products"),
    ("8", "Eggs and products"),
    ("9", "Milk and products"),
    ("10", "Fish and products"),
    ("11", "Fats and oils"),
    ("12", "Beverages"),
    ("13", "Other foods"),
    ("14", "Starchy roots, tubers and products"),
    ("23", "Traditional kuih (rice-based)"),
    ("24", "Traditional kuih (cakes)"),
    ("25", "Traditional kuih (fried)"),
    ("28", "Indian dishes"),
    ("29", "Prepared meat dishes"),
    ("30", "Prepared fish dishes"),
    ("31", "Traditional desserts"),
    ("37", "Canned/processed meat"),
    ("38", "Raw ingredients (mixed)"),
    ("39", "Mixed rice dishes"),
    ("40", "Mixed rice dishes (alt)"),
    ("44", "Fast food items"),
    ("45", "Burgers"),
    ("46", "Pizza"),
    ("47", "Pasta dishes"),
    ("48", "Sandwiches"),
    ("49", "Satay"),
    ("50", "Local main dishes"),
    ("51", "Pork products"),
    ("52", "Duck eggs and products"),
    ("53", "Seafood"),
    ("54", "Processed meat"),
    ("55", "Dairy products"),
    ("56", "Cooking fats"),
    ("57", "Breakfast cereals"),
    ("58", "Starchy foods"),
    ("59", "Legumes"),
    ("60", "Local fruits"),
];

const INDUSTRY_GROUPS: &[(&str, &str)] = &[
    ("-1", "Ungrouped"),
    ("1", "Cereals and grain products"),
    ("2", "Nuts, seeds and products"),
    ("3", "Legumes and legume products"),
    ("4", "Vegetables and vegetable products"),
    ("5", "Fruits and fruit products"),
    ("6", "Sugars and syrups"),
    ("7", "Meat and meat products"),
    ("8", "Eggs"),
    ("9", "Milk and milk products"),
    ("10", "Fish, shellfish and products"),
    ("11", "Oils and fats"),
    ("12", "Beverages"),
    ("13", "Miscellaneous"),
    ("14", "Starchy roots, tubers and products"),
    ("15", "Ice cream and ice confection"),
    ("16", "Chocolate and chocolate confectionery products"),
    ("17", "Seasoning"),
    ("18", "Sweets"),
    ("19", "Snacks"),
    ("20", "Franchised Food and Beverages"),
    ("21", "Fast Foods"),
];

impl Database {
    pub const ALL: [Database; 3] = [Database::Current, Database::Fcd1997, Database::Industry];

    pub fn profile(&self) -> DatabaseProfile {
        match self {
            Database::Current => DatabaseProfile {
                name: "MyFCD",
                base_url: "https://myfcd.moh.gov.my/myfcdcurrent/",
                listing_url: "https://myfcd.moh.gov.my/myfcdcurrent/index.php/ajax/datatable_data",
                item_delay: Duration::from_millis(500),
                page_delay: Duration::from_millis(500),
                render_timeout: Duration::from_secs(10),
                settle_delay: Duration::ZERO,
                has_metadata: true,
                expected_total: ExpectedTotal::Exact(233),
                fallback_groups: CURRENT_GROUPS,
            },
            Database::Fcd1997 => DatabaseProfile {
                name: "MyFCD97",
                base_url: "https://myfcd.moh.gov.my/myfcd97/",
                listing_url: "https://myfcd.moh.gov.my/myfcd97/index.php/ajax/datatable_data",
                item_delay: Duration::from_millis(800),
                page_delay: Duration::from_millis(500),
                render_timeout: Duration::from_secs(20),
                settle_delay: Duration::from_secs(3),
                has_metadata: false,
                expected_total: ExpectedTotal::Exact(233),
                fallback_groups: FCD1997_GROUPS,
            },
            Database::Industry => DatabaseProfile {
                name: "MyFCD Industry",
                base_url: "https://myfcd.moh.gov.my/myfcdindustri/",
                listing_url: "https://myfcd.moh.gov.my/myfcdindustri/static/DataTables-1.10.12/examples/server_side/scripts/server_processing.php",
                item_delay: Duration::from_millis(100),
                page_delay: Duration::from_millis(100),
                render_timeout: Duration::from_secs(5),
                settle_delay: Duration::ZERO,
                has_metadata: true,
                expected_total: ExpectedTotal::Estimate(500),
                fallback_groups: INDUSTRY_GROUPS,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Database::Current => "current",
            Database::Fcd1997 => "1997",
            Database::Industry => "industry",
        }
    }
}

/// Detail page of an item under a site base URL (which ends with `/`)
pub fn detail_url(base_url: &str, ndb_no: &str) -> String {
    format!("{base_url}index.php/site/detail_product/{ndb_no}/1/10/-1/0/0/")
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Database {
    type Err = UnknownDatabase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "current" | "myfcd" => Ok(Database::Current),
            "1997" | "97" | "myfcd97" => Ok(Database::Fcd1997),
            "industry" | "industri" | "myfcdindustri" => Ok(Database::Industry),
            other => Err(UnknownDatabase(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_database_names() {
        assert_eq!("current".parse::<Database>().unwrap(), Database::Current);
        assert_eq!("1997".parse::<Database>().unwrap(), Database::Fcd1997);
        assert_eq!(" Industry ".parse::<Database>().unwrap(), Database::Industry);
        assert_eq!(
            "2005".parse::<Database>(),
            Err(UnknownDatabase("2005".to_string()))
        );
    }

    #[test]
    fn test_display_round_trips() {
        for db in Database::ALL {
            assert_eq!(db.to_string().parse::<Database>().unwrap(), db);
        }
    }

    #[test]
    fn test_detail_url() {
        assert_eq!(
            detail_url("https://myfcd.moh.gov.my/myfcd97/", "R101061"),
            "https://myfcd.moh.gov.my/myfcd97/index.php/site/detail_product/R101061/1/10/-1/0/0/"
        );
    }

    #[test]
    fn test_profiles() {
        let industry = Database::Industry.profile();
        assert!(industry.has_metadata);
        assert_eq!(industry.expected_total, ExpectedTotal::Estimate(500));
        assert_eq!(
            industry.fallback_food_groups().get("-1").map(String::as_str),
            Some("Ungrouped")
        );

        let old = Database::Fcd1997.profile();
        assert!(!old.has_metadata);
        assert_eq!(old.settle_delay, Duration::from_secs(3));
        assert_eq!(old.fallback_food_groups().len(), 42);
    }
}
