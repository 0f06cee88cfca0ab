use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use super::PageFetcher;
use crate::config::ScrapeSettings;
use crate::error::ScrapeError;
use crate::extractors::has_nutrient_table;

/// Plain HTTP fetcher for detail pages that are served with the table
/// already rendered (mirrors, saved pages, test servers)
pub struct RequestFetcher {
    client: Client,
}

impl RequestFetcher {
    pub fn new(settings: &ScrapeSettings) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for RequestFetcher {
    fn fetcher_name(&self) -> &str {
        "request"
    }

    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        debug!("Fetching {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        let html = response.text().await?;

        if !has_nutrient_table(&html) {
            return Err(ScrapeError::MissingTable(url.to_string()));
        }

        Ok(html)
    }
}
