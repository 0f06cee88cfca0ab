use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use futures::{Stream, StreamExt};
use log::{debug, info, warn};
use std::fmt::Display;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::PageFetcher;
use crate::config::ScrapeSettings;
use crate::error::ScrapeError;
use crate::extractors::NUTRIENT_TABLE_ID;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Headless Chrome session that renders detail pages.
///
/// The nutrient table is filled in by JavaScript, so the page is polled until
/// the table element exists. One browser and one tab are reused for the whole
/// run; call [`PageFetcher::close`] to shut the browser down.
pub struct ChromeFetcher {
    browser: Option<Browser>,
    page: Page,
    handler: Option<JoinHandle<()>>,
    render_timeout: Duration,
    settle_delay: Duration,
}

impl ChromeFetcher {
    pub async fn launch(settings: &ScrapeSettings) -> Result<Self, ScrapeError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1280, 720)
            .request_timeout(settings.request_timeout)
            .args([
                "--disable-gpu",
                "--disable-dev-shm-usage",
                "--disable-extensions",
                "--disable-plugins",
                "--disable-default-apps",
                "--no-first-run",
            ]);
        if let Some(path) = &settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(ScrapeError::BrowserSetup)?;

        let (mut browser, mut handler) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            drain_events(&mut handler).await;
        });

        let page = match Self::open_page(&browser, &settings.user_agent).await {
            Ok(page) => page,
            Err(e) => {
                // Don't leave a headless Chrome behind when the tab can't be opened
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler.abort();
                return Err(e);
            }
        };

        info!("Headless Chrome started");
        Ok(Self {
            browser: Some(browser),
            page,
            handler: Some(handler),
            render_timeout: settings.render_timeout,
            settle_delay: settings.settle_delay,
        })
    }

    async fn open_page(browser: &Browser, user_agent: &str) -> Result<Page, ScrapeError> {
        let page = browser.new_page("about:blank").await?;
        page.set_user_agent(SetUserAgentOverrideParams::new(user_agent))
            .await?;
        Ok(page)
    }

    async fn wait_for_table(&self) {
        let selector = format!("#{NUTRIENT_TABLE_ID}");
        while self.page.find_element(selector.as_str()).await.is_err() {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Read the browser connection until it closes and return the number of
/// events seen. Errors are not fatal: the connection keeps working after
/// messages that fail to decode, and stopping here would stall every
/// pending command.
async fn drain_events<S, T, E>(events: &mut S) -> usize
where
    S: Stream<Item = Result<T, E>> + Unpin,
    E: Display,
{
    let mut seen = 0;
    while let Some(event) = events.next().await {
        seen += 1;
        if let Err(e) = event {
            debug!("Browser event error: {}", e);
        }
    }
    seen
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    fn fetcher_name(&self) -> &str {
        "chrome"
    }

    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        debug!("Rendering {}", url);
        self.page.goto(url.to_string()).await?;

        tokio::time::timeout(self.render_timeout, self.wait_for_table())
            .await
            .map_err(|_| ScrapeError::RenderTimeout {
                url: url.to_string(),
                timeout: self.render_timeout,
            })?;

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        Ok(self.page.content().await?)
    }

    async fn close(&mut self) -> Result<(), ScrapeError> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        let result = browser.close().await.map(|_| ());
        if let Err(e) = browser.wait().await {
            warn!("Chrome did not exit cleanly: {}", e);
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        info!("Headless Chrome stopped");
        Ok(result?)
    }
}
