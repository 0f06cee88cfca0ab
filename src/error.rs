use std::time::Duration;

use thiserror::Error;

use crate::database::UnknownDatabase;
use crate::model::FoodItem;

/// Errors that can occur while scraping or post-processing MyFCD data
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// HTTP request to the listing endpoint or a detail page failed
    #[error("Request failed: {0}")]
    FetchError(#[from] reqwest::Error),

    /// Listing pagination stopped before all pages were fetched.
    ///
    /// The items gathered before the failure are kept so the caller can
    /// decide whether a partial run is acceptable.
    #[error("Listing stopped at page {page} after {} items: {source}", .fetched.len())]
    ListingIncomplete {
        page: usize,
        fetched: Vec<FoodItem>,
        #[source]
        source: Box<ScrapeError>,
    },

    /// The listing endpoint answered but listed nothing
    #[error("The listing endpoint returned no food items")]
    EmptyListing,

    /// The run was interrupted with Ctrl+C
    #[error("Interrupted")]
    Interrupted,

    /// The nutrient table did not appear on the page in time
    #[error("Timed out after {timeout:?} waiting for the nutrient table on {url}")]
    RenderTimeout { url: String, timeout: Duration },

    /// The page was loaded but has no nutrient table
    #[error("No nutrient table found on {0}")]
    MissingTable(String),

    /// Headless browser failure (launch, navigation, DOM access)
    #[error("Browser error: {0}")]
    BrowserError(#[from] chromiumoxide::error::CdpError),

    /// Browser could not be configured
    #[error("Browser setup failed: {0}")]
    BrowserSetup(String),

    /// Unknown database edition name
    #[error(transparent)]
    InvalidDatabase(#[from] UnknownDatabase),

    /// Reading or writing output files failed
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// CSV export failed
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

impl ScrapeError {
    /// Items fetched before a listing failure, if this is one
    pub fn partial_listing(self) -> Option<Vec<FoodItem>> {
        match self {
            ScrapeError::ListingIncomplete { fetched, .. } => Some(fetched),
            _ => None,
        }
    }
}
