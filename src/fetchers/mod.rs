mod chrome;
mod listing;
mod request;

pub use chrome::ChromeFetcher;
pub use listing::{parse_food_group_options, ListingClient, ListingPage};
pub use request::RequestFetcher;

use async_trait::async_trait;

use crate::config::{RendererKind, ScrapeSettings};
use crate::error::ScrapeError;

/// Loads a detail page and returns its HTML once the nutrient table is present
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetcher name for logging (e.g., "chrome", "request")
    fn fetcher_name(&self) -> &str;

    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;

    /// Release the underlying session; called once at the end of a run
    async fn close(&mut self) -> Result<(), ScrapeError> {
        Ok(())
    }
}

/// Create the detail-page fetcher selected in the settings
pub async fn create_fetcher(settings: &ScrapeSettings) -> Result<Box<dyn PageFetcher>, ScrapeError> {
    match settings.renderer {
        RendererKind::Browser => Ok(Box::new(ChromeFetcher::launch(settings).await?)),
        RendererKind::Http => Ok(Box::new(RequestFetcher::new(settings)?)),
    }
}
