use async_trait::async_trait;
use mockito::{Server, ServerGuard};
use serde_json::json;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use myfcd_scrape::fetchers::PageFetcher;
use myfcd_scrape::pipelines::scrape::scrape_with;
use myfcd_scrape::{
    scrape_database, Database, FoodItem, FoodStore, RendererKind, ScrapeError, ScraperConfig,
};

fn detail_page(energy: &str) -> String {
    format!(
        r#"
        <html><body>
            <img src="uploads/products/item.png">
            <table>
                <tr><td>Source</td><td>:</td><td>Manufacturer label</td></tr>
            </table>
            <table id="tableDetailNutrient">
                <thead><tr>
                    <th>Nutrient</th><th>Unit</th><th>Value per 100 g</th><th>1 packet (25 g)</th>
                </tr></thead>
                <tbody>
                    <tr style="background-color:#f2f2f2"><td>Proximates</td></tr>
                    <tr><td>Energy</td><td>kcal</td><td>{energy}</td><td>-</td></tr>
                    <tr><td>Protein</td><td>g</td><td>7.1</td><td>1.8</td></tr>
                    <tr style="background-color:#f2f2f2"><td>Minerals</td></tr>
                    <tr><td>Sodium</td><td>mg</td><td>610</td><td>152</td></tr>
                </tbody>
            </table>
            <small>Published: 2019-11-20</small>
        </body></html>
        "#
    )
}

fn detail_path(ndb_no: &str) -> String {
    format!("/index.php/site/detail_product/{ndb_no}/1/10/-1/0/0/")
}

async fn mock_site(server: &mut ServerGuard) -> Vec<mockito::Mock> {
    let listing = json!({
        "data": [
            ["P001", "Keropok lekor", "19"],
            ["P002", "Kuih bahulu", "18"],
            ["P/003", "Teh tarik", "12"],
        ],
        "recordsTotal": 3
    });

    vec![
        server
            .mock("GET", "/")
            .with_status(200)
            .with_body(r#"<select id="foodGroup"><option value="19">Snacks</option></select>"#)
            .create_async()
            .await,
        server
            .mock("POST", "/listing")
            .with_status(200)
            .with_body(listing.to_string())
            .create_async()
            .await,
        server
            .mock("GET", detail_path("P001").as_str())
            .with_status(200)
            .with_body(detail_page("495"))
            .create_async()
            .await,
        server
            .mock("GET", detail_path("P002").as_str())
            .with_status(200)
            .with_body("<html><body>Not rendered</body></html>")
            .create_async()
            .await,
        server
            .mock("GET", detail_path("P/003").as_str())
            .with_status(200)
            .with_body(detail_page("-"))
            .create_async()
            .await,
    ]
}

fn test_config(server: &ServerGuard, output: &std::path::Path) -> ScraperConfig {
    ScraperConfig {
        output_dir: output.to_path_buf(),
        base_url: Some(format!("{}/", server.url())),
        listing_url: Some(format!("{}/listing", server.url())),
        item_delay_ms: Some(0),
        page_delay_ms: Some(0),
        renderer: RendererKind::Http,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_scrape_writes_one_file_per_item() {
    let mut server = Server::new_async().await;
    let _mocks = mock_site(&mut server).await;
    let dir = tempfile::tempdir().unwrap();

    let report = scrape_database(Database::Industry, &test_config(&server, dir.path()))
        .await
        .unwrap();

    assert_eq!(report.listed, 3);
    assert_eq!(report.attempted, 3);
    assert_eq!(report.saved, 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "P002");

    let store = FoodStore::new(dir.path());
    let files = store.record_files().unwrap();
    assert_eq!(files.len(), 2);
    assert!(dir.path().join("P001.json").exists());
    assert!(dir.path().join("P_003.json").exists());
    assert!(!dir.path().join("P002.json").exists());

    let record = store.load(&dir.path().join("P001.json")).unwrap();
    assert_eq!(record.description, "Keropok lekor");
    assert_eq!(record.food_group, "Snacks");
    assert_eq!(record.metadata.source.as_deref(), Some("Manufacturer label"));
    assert_eq!(record.metadata.published_date.as_deref(), Some("2019-11-20"));
    assert!(record
        .metadata
        .image
        .as_deref()
        .is_some_and(|url| url.starts_with(&server.url()) && url.ends_with("uploads/products/item.png")));
    assert_eq!(record.category_count(), 2);
    assert_eq!(record.nutrient_count(), 3);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("P001.json")).unwrap()).unwrap();
    assert_eq!(json["NDB No"], "P001");
    assert_eq!(json["Food Group"], "Snacks");
    assert_eq!(json["Nutrient"][0]["nutrients"][1]["1_packet_(25_g)"], "1.8");

    let tea = store.load(&dir.path().join("P_003.json")).unwrap();
    assert_eq!(tea.food_group, "Food Group 12");
    assert_eq!(tea.groups[0].nutrients[0].value_per_100g, None);
}

#[tokio::test]
async fn test_rerun_rewrites_identical_files() {
    let mut server = Server::new_async().await;
    let _mocks = mock_site(&mut server).await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&server, dir.path());

    scrape_database(Database::Industry, &config).await.unwrap();
    let first = fs::read(dir.path().join("P001.json")).unwrap();

    scrape_database(Database::Industry, &config).await.unwrap();
    assert_eq!(fs::read(dir.path().join("P001.json")).unwrap(), first);
    assert_eq!(FoodStore::new(dir.path()).record_files().unwrap().len(), 2);
}

#[tokio::test]
async fn test_max_items_limits_detail_requests() {
    let mut server = Server::new_async().await;
    let _mocks = mock_site(&mut server).await;
    let dir = tempfile::tempdir().unwrap();
    let config = ScraperConfig {
        max_items: Some(1),
        ..test_config(&server, dir.path())
    };

    let report = scrape_database(Database::Industry, &config).await.unwrap();
    assert_eq!(report.listed, 3);
    assert_eq!(report.attempted, 1);
    assert_eq!(report.saved, 1);
}

#[tokio::test]
async fn test_1997_edition_skips_metadata() {
    let mut server = Server::new_async().await;
    let _mocks = mock_site(&mut server).await;
    let dir = tempfile::tempdir().unwrap();

    scrape_database(Database::Fcd1997, &test_config(&server, dir.path()))
        .await
        .unwrap();

    let content = fs::read_to_string(dir.path().join("P001.json")).unwrap();
    assert!(!content.contains("Published Date"));
    assert!(!content.contains("\"Source\""));
    assert!(!content.contains("\"Image\""));
}

#[tokio::test]
async fn test_empty_listing_is_an_error() {
    let mut server = Server::new_async().await;
    let _listing = server
        .mock("POST", "/listing")
        .with_status(200)
        .with_body(r#"{"data": [], "recordsTotal": 0}"#)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();

    let result = scrape_database(Database::Current, &test_config(&server, dir.path())).await;
    assert!(matches!(result, Err(ScrapeError::EmptyListing)));
}

/// How the in-memory fetcher answers every page request
#[derive(Clone, Copy)]
enum Answer {
    Page,
    Missing,
    Hang,
}

struct CountingFetcher {
    answer: Answer,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl PageFetcher for CountingFetcher {
    fn fetcher_name(&self) -> &str {
        "counting"
    }

    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        match self.answer {
            Answer::Page => Ok(detail_page("100")),
            Answer::Missing => Err(ScrapeError::MissingTable(url.to_string())),
            Answer::Hang => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), ScrapeError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn listed_items(count: usize) -> Vec<FoodItem> {
    (1..=count)
        .map(|n| FoodItem {
            ndb_no: format!("R{n}"),
            description: format!("Food {n}"),
            food_group: "Snacks".to_string(),
            detail_url: format!("http://localhost/item/R{n}"),
        })
        .collect()
}

async fn run_counting(
    answer: Answer,
    shutdown: impl std::future::Future<Output = ()>,
) -> (Result<myfcd_scrape::RunReport, ScrapeError>, usize) {
    let dir = tempfile::tempdir().unwrap();
    let settings = ScraperConfig {
        output_dir: dir.path().to_path_buf(),
        item_delay_ms: Some(0),
        ..Default::default()
    }
    .resolve(Database::Fcd1997);

    let closed = Arc::new(AtomicUsize::new(0));
    let fetcher = Box::new(CountingFetcher {
        answer,
        closed: Arc::clone(&closed),
    });

    let result = scrape_with(fetcher, listed_items(3), &settings, shutdown).await;
    (result, closed.load(Ordering::SeqCst))
}

#[tokio::test]
async fn test_fetcher_closed_after_successful_run() {
    let (result, closed) = run_counting(Answer::Page, std::future::pending()).await;

    let report = result.unwrap();
    assert_eq!(report.saved, 3);
    assert!(report.failed.is_empty());
    assert_eq!(closed, 1);
}

#[tokio::test]
async fn test_fetcher_closed_after_item_failures() {
    let (result, closed) = run_counting(Answer::Missing, std::future::pending()).await;

    let report = result.unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.saved, 0);
    assert_eq!(report.failed.len(), 3);
    assert_eq!(closed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_fetcher_closed_after_interrupt() {
    let shutdown = tokio::time::sleep(Duration::from_secs(5));
    let (result, closed) = run_counting(Answer::Hang, shutdown).await;

    assert!(matches!(result, Err(ScrapeError::Interrupted)));
    assert_eq!(closed, 1);
}
