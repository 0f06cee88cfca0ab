use log::{debug, info, warn};
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use crate::config::ScrapeSettings;
use crate::database::detail_url;
use crate::error::ScrapeError;
use crate::model::FoodItem;

static GROUP_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?[\d.]+$").unwrap());
static GROUP_SELECT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "select[name*='group'], select[id*='group'], select[name*='Group'], select[id*='Group']",
    )
    .unwrap()
});
static OPTIONS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("option[value]").unwrap());

/// One page of the DataTables listing endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingPage {
    /// Raw rows: `[ndb_no, description, food_group_code, ...]`
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(rename = "recordsTotal", default, deserialize_with = "lenient_count")]
    pub records_total: usize,
}

// PHP backends are not consistent about numbers vs numeric strings
fn lenient_count<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().unwrap_or(0) as usize,
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Client for the server-side listing endpoint of one database edition
pub struct ListingClient {
    client: Client,
    base_url: String,
    listing_url: String,
    page_size: usize,
    page_delay: Duration,
    fallback_groups: HashMap<String, String>,
}

impl ListingClient {
    pub fn new(settings: &ScrapeSettings) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            listing_url: settings.listing_url.clone(),
            page_size: settings.page_size.max(1),
            page_delay: settings.page_delay,
            fallback_groups: settings.database.profile().fallback_food_groups(),
        })
    }

    /// Request `page_size` rows starting at `offset`
    pub async fn fetch_page(&self, offset: usize) -> Result<ListingPage, ScrapeError> {
        let form = [
            ("my_food_group", "0".to_string()),
            ("my_manufacturer", "0".to_string()),
            ("start", offset.to_string()),
            ("length", self.page_size.to_string()),
        ];

        let page = self
            .client
            .post(&self.listing_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json::<ListingPage>()
            .await?;

        Ok(page)
    }

    /// Food group code → label, scraped from the landing page.
    ///
    /// Falls back to the edition's built-in table when the page can't be
    /// fetched or lists no groups.
    pub async fn food_groups(&self) -> HashMap<String, String> {
        info!("Getting food group names from {}", self.base_url);
        let scraped = match self.fetch_landing_page().await {
            Ok(html) => parse_food_group_options(&html),
            Err(e) => {
                warn!("Could not load landing page: {}", e);
                HashMap::new()
            }
        };

        if scraped.is_empty() {
            warn!("No food groups found on the landing page, using built-in table");
            self.fallback_groups.clone()
        } else {
            info!("Found {} food groups", scraped.len());
            scraped
        }
    }

    async fn fetch_landing_page(&self) -> Result<String, ScrapeError> {
        Ok(self
            .client
            .get(&self.base_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }

    /// Page through the whole listing.
    ///
    /// Stops when a page comes back short or the reported total is reached.
    /// A failing page ends pagination with [`ScrapeError::ListingIncomplete`],
    /// which still carries the items collected so far.
    pub async fn fetch_all(
        &self,
        food_groups: &HashMap<String, String>,
    ) -> Result<Vec<FoodItem>, ScrapeError> {
        info!("Fetching food list from {}", self.listing_url);
        let mut items = Vec::new();
        let mut offset = 0;
        let mut page_number = 1;

        loop {
            let page = match self.fetch_page(offset).await {
                Ok(page) => page,
                Err(e) => {
                    return Err(ScrapeError::ListingIncomplete {
                        page: page_number,
                        fetched: items,
                        source: Box::new(e),
                    })
                }
            };

            let received = page.data.len();
            let before = items.len();
            items.extend(page.data.iter().filter_map(|row| self.to_item(row, food_groups)));
            info!("Page {}: {} items", page_number, items.len() - before);

            if received < self.page_size || offset + self.page_size >= page.records_total {
                break;
            }

            offset += self.page_size;
            page_number += 1;
            tokio::time::sleep(self.page_delay).await;
        }

        info!("Retrieved {} food items", items.len());
        Ok(items)
    }

    fn to_item(&self, row: &Value, food_groups: &HashMap<String, String>) -> Option<FoodItem> {
        let cells = row.as_array().filter(|cells| cells.len() >= 3);
        let Some(cells) = cells else {
            debug!("Skipping malformed listing row: {}", row);
            return None;
        };

        let ndb_no = cell_string(&cells[0]);
        let description = cell_string(&cells[1]);
        let group_code = cell_string(&cells[2]);

        let food_group = food_groups
            .get(&group_code)
            .cloned()
            .unwrap_or_else(|| format!("Food Group {group_code}"));

        Some(FoodItem {
            detail_url: detail_url(&self.base_url, &ndb_no),
            ndb_no,
            description,
            food_group,
        })
    }
}

fn cell_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Collect `code → label` pairs from the `<option>` elements of a page.
///
/// Options of a food-group `<select>` are used when the page has one;
/// otherwise every option with a numeric value counts. Code `0` is the
/// "all groups" entry and is skipped.
pub fn parse_food_group_options(html: &str) -> HashMap<String, String> {
    let document = Html::parse_document(html);

    let scoped: Vec<ElementRef> = document
        .select(&GROUP_SELECT)
        .flat_map(|select| select.select(&OPTIONS))
        .collect();
    let groups = usable_options(scoped);
    if !groups.is_empty() {
        return groups;
    }

    usable_options(document.select(&OPTIONS))
}

fn usable_options<'a>(options: impl IntoIterator<Item = ElementRef<'a>>) -> HashMap<String, String> {
    options
        .into_iter()
        .filter_map(|option| {
            let code = option.value().attr("value")?.trim();
            let label = option.text().collect::<String>().trim().to_string();
            let usable = code != "0" && GROUP_CODE.is_match(code) && !label.is_empty();
            usable.then(|| (code.to_string(), label))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_prefers_food_group_select() {
        let html = r#"
            <select name="my_food_group">
                <option value="0">All</option>
                <option value="1">Cereals and grain products</option>
                <option value="-1"> Ungrouped </option>
            </select>
            <select name="my_manufacturer">
                <option value="0">All</option>
                <option value="17">Acme Sdn Bhd</option>
            </select>
        "#;

        let groups = parse_food_group_options(html);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["1"], "Cereals and grain products");
        assert_eq!(groups["-1"], "Ungrouped");
        assert!(!groups.contains_key("17"));
    }

    #[test]
    fn test_parse_options_without_group_select() {
        let html = r#"
            <select id="filter">
                <option value="0">All</option>
                <option value="1.1">Rice</option>
                <option value="abc">Not a group</option>
                <option value="2"></option>
            </select>
        "#;

        let groups = parse_food_group_options(html);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["1.1"], "Rice");
    }

    #[test]
    fn test_lenient_records_total() {
        let page: ListingPage =
            serde_json::from_str(r#"{"data": [], "recordsTotal": "233"}"#).unwrap();
        assert_eq!(page.records_total, 233);

        let page: ListingPage = serde_json::from_str(r#"{"data": [["a", "b", 1]]}"#).unwrap();
        assert_eq!(page.records_total, 0);
        assert_eq!(page.data.len(), 1);
    }

    #[test]
    fn test_cell_string() {
        assert_eq!(cell_string(&Value::String(" R101 ".to_string())), "R101");
        assert_eq!(cell_string(&serde_json::json!(12)), "12");
        assert_eq!(cell_string(&Value::Null), "");
    }
}
