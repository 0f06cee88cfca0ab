use log::{error, info, warn};
use std::future::Future;

use super::{detail, RunReport};
use crate::config::ScrapeSettings;
use crate::error::ScrapeError;
use crate::fetchers::{create_fetcher, ListingClient, PageFetcher};
use crate::model::FoodItem;
use crate::store::FoodStore;

/// Items whose progress is always logged at the start of a run
const VERBOSE_ITEMS: usize = 3;
const PROGRESS_EVERY: usize = 50;

/// Enumerate a database through its listing endpoint
pub async fn list_items(settings: &ScrapeSettings) -> Result<Vec<FoodItem>, ScrapeError> {
    let listing = ListingClient::new(settings)?;
    let food_groups = listing.food_groups().await;

    match listing.fetch_all(&food_groups).await {
        Ok(items) => Ok(items),
        Err(ScrapeError::ListingIncomplete {
            page,
            fetched,
            source,
        }) if settings.allow_partial_listing => {
            warn!(
                "Listing failed at page {} ({}); continuing with {} items",
                page,
                source,
                fetched.len()
            );
            Ok(fetched)
        }
        Err(e) => Err(e),
    }
}

/// Scrape a whole database edition into `settings.output_dir`
///
/// This pipeline:
/// 1. Pages through the listing endpoint
/// 2. Starts the configured page fetcher (headless Chrome by default)
/// 3. Visits every item, one at a time, with the edition's politeness delay
/// 4. Writes one JSON file per item
///
/// Ctrl+C stops the run with [`ScrapeError::Interrupted`].
pub async fn run(settings: &ScrapeSettings) -> Result<RunReport, ScrapeError> {
    info!("Scraping {} into {}", settings.name, settings.output_dir.display());

    let items = list_items(settings).await?;
    if items.is_empty() {
        return Err(ScrapeError::EmptyListing);
    }

    let fetcher = create_fetcher(settings).await?;
    scrape_with(fetcher, items, settings, ctrl_c()).await
}

/// Scrape listed `items` with an already started `fetcher`
///
/// The run stops with [`ScrapeError::Interrupted`] when `shutdown` completes
/// first. The fetcher is closed before returning on every path.
pub async fn scrape_with<F>(
    mut fetcher: Box<dyn PageFetcher>,
    mut items: Vec<FoodItem>,
    settings: &ScrapeSettings,
    shutdown: F,
) -> Result<RunReport, ScrapeError>
where
    F: Future<Output = ()>,
{
    let listed = items.len();
    if let Some(max) = settings.max_items {
        items.truncate(max);
        info!("Limiting to {} items", max);
    }

    let store = FoodStore::new(&settings.output_dir);
    let outcome = tokio::select! {
        report = scrape_items(fetcher.as_ref(), &items, settings, &store) => Ok(report),
        _ = shutdown => Err(ScrapeError::Interrupted),
    };

    if let Err(e) = fetcher.close().await {
        warn!("Failed to close {} fetcher: {}", fetcher.fetcher_name(), e);
    }

    let report = outcome?;
    Ok(RunReport { listed, ..report })
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    warn!("Interrupted, stopping after closing the fetcher");
}

/// Visit `items` in order and save each record; per-item failures are
/// logged and collected, never propagated
pub async fn scrape_items(
    fetcher: &dyn PageFetcher,
    items: &[FoodItem],
    settings: &ScrapeSettings,
    store: &FoodStore,
) -> RunReport {
    let total = items.len();
    let mut report = RunReport {
        listed: total,
        ..Default::default()
    };
    info!("Total items to process: {}", total);

    for (index, item) in items.iter().enumerate() {
        let position = index + 1;
        let verbose = position <= VERBOSE_ITEMS;
        if verbose || position % PROGRESS_EVERY == 0 || position == total {
            info!(
                "Processing {}/{} ({:.1}%): {} - {}",
                position,
                total,
                position as f64 / total as f64 * 100.0,
                item.ndb_no,
                item.description
            );
        }

        report.attempted += 1;
        match detail::process(fetcher, item, settings.extract_metadata).await {
            Ok(record) => match store.save(&record) {
                Ok(_) => {
                    report.saved += 1;
                    if verbose {
                        info!(
                            "  Categories: {}, Nutrients: {}",
                            record.category_count(),
                            record.nutrient_count()
                        );
                    }
                }
                Err(e) => {
                    error!("Failed to save {}: {}", item.ndb_no, e);
                    report.failed.push((item.ndb_no.clone(), e.to_string()));
                }
            },
            Err(e) => {
                error!("Failed to process {}: {}", item.ndb_no, e);
                report.failed.push((item.ndb_no.clone(), e.to_string()));
            }
        }

        if position < total && !settings.item_delay.is_zero() {
            tokio::time::sleep(settings.item_delay).await;
        }
    }

    info!(
        "Successfully processed {}/{} foods, files in {}",
        report.saved,
        total,
        store.dir().display()
    );
    report
}
