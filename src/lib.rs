pub mod config;
pub mod database;
pub mod error;
pub mod extractors;
pub mod fetchers;
pub mod model;
pub mod pipelines;
pub mod store;
pub mod tools;

pub use config::{load_config, RendererKind, ScrapeSettings, ScraperConfig};
pub use database::{Database, ExpectedTotal};
pub use error::ScrapeError;
pub use model::{FoodItem, FoodMetadata, FoodRecord, NutrientEntry, NutrientGroup, NutrientRecord};
pub use pipelines::RunReport;
pub use store::FoodStore;

/// Scrape every item of `database` into the configured output directory
///
/// # Example
/// ```no_run
/// # use myfcd_scrape::{scrape_database, Database, ScraperConfig};
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ScraperConfig::load()?;
/// let report = scrape_database(Database::Fcd1997, &config).await?;
/// println!("{} of {} saved", report.saved, report.listed);
/// # Ok(())
/// # }
/// ```
pub async fn scrape_database(
    database: Database,
    config: &ScraperConfig,
) -> Result<RunReport, ScrapeError> {
    pipelines::scrape::run(&config.resolve(database)).await
}

/// List the items of `database` without visiting their detail pages
pub async fn fetch_food_list(
    database: Database,
    config: &ScraperConfig,
) -> Result<Vec<FoodItem>, ScrapeError> {
    pipelines::scrape::list_items(&config.resolve(database)).await
}
