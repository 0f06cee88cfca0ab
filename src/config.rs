use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::database::{Database, DatabaseProfile, ExpectedTotal};

/// Which page renderer fetches detail pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Headless Chrome; required for the live site, which fills the table with JavaScript
    #[default]
    Browser,
    /// Plain HTTP GET, for pages whose table is served pre-rendered
    Http,
}

/// Scraper configuration
///
/// Every optional field falls back to the profile of the selected database.
#[derive(Debug, Deserialize, Clone)]
pub struct ScraperConfig {
    /// Directory for the per-item JSON files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Rows requested per listing page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Delay between detail pages in milliseconds
    pub item_delay_ms: Option<u64>,
    /// Delay between listing pages in milliseconds
    pub page_delay_ms: Option<u64>,
    /// Wait for the nutrient table to render, in seconds
    pub render_timeout_secs: Option<u64>,
    /// Extra wait after the table appears, in milliseconds
    pub settle_delay_ms: Option<u64>,
    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Only scrape the first N listed items
    pub max_items: Option<usize>,
    #[serde(default)]
    pub renderer: RendererKind,
    /// Chrome/Chromium binary; auto-detected when unset
    pub chrome_executable: Option<PathBuf>,
    /// Override the site base URL (must end with `/`)
    pub base_url: Option<String>,
    /// Override the listing endpoint URL
    pub listing_url: Option<String>,
    /// Scrape whatever was listed when listing pagination fails midway
    #[serde(default)]
    pub allow_partial_listing: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            page_size: default_page_size(),
            item_delay_ms: None,
            page_delay_ms: None,
            render_timeout_secs: None,
            settle_delay_ms: None,
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
            max_items: None,
            renderer: RendererKind::default(),
            chrome_executable: None,
            base_url: None,
            listing_url: None,
            allow_partial_listing: false,
        }
    }
}

/// Configuration resolved against a database profile
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub database: Database,
    pub name: &'static str,
    pub base_url: String,
    pub listing_url: String,
    pub output_dir: PathBuf,
    pub page_size: usize,
    pub item_delay: Duration,
    pub page_delay: Duration,
    pub render_timeout: Duration,
    pub settle_delay: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub max_items: Option<usize>,
    pub renderer: RendererKind,
    pub chrome_executable: Option<PathBuf>,
    pub extract_metadata: bool,
    pub expected_total: ExpectedTotal,
    pub allow_partial_listing: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("datasets")
}

fn default_page_size() -> usize {
    100
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36".to_string()
}

impl ScraperConfig {
    /// Load configuration from `myfcd.toml` and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        load_config(None)
    }

    /// Merge this configuration with the defaults of `database`
    pub fn resolve(&self, database: Database) -> ScrapeSettings {
        let profile: DatabaseProfile = database.profile();
        let millis = |value: Option<u64>, fallback: Duration| {
            value.map(Duration::from_millis).unwrap_or(fallback)
        };

        ScrapeSettings {
            database,
            name: profile.name,
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| profile.base_url.to_string()),
            listing_url: self
                .listing_url
                .clone()
                .unwrap_or_else(|| profile.listing_url.to_string()),
            output_dir: self.output_dir.clone(),
            page_size: self.page_size.max(1),
            item_delay: millis(self.item_delay_ms, profile.item_delay),
            page_delay: millis(self.page_delay_ms, profile.page_delay),
            render_timeout: self
                .render_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(profile.render_timeout),
            settle_delay: millis(self.settle_delay_ms, profile.settle_delay),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            user_agent: self.user_agent.clone(),
            max_items: self.max_items,
            renderer: self.renderer,
            chrome_executable: self.chrome_executable.clone(),
            extract_metadata: profile.has_metadata,
            expected_total: profile.expected_total,
            allow_partial_listing: self.allow_partial_listing,
        }
    }
}

/// Load configuration from file and environment variables
///
/// Configuration is loaded with the following priority (highest to lowest):
/// 1. Environment variables with MYFCD__ prefix
/// 2. The given file, or `myfcd.toml` in the current directory
/// 3. Default values
///
/// Environment variable format: MYFCD__ITEM_DELAY_MS=250
pub fn load_config(path: Option<&Path>) -> Result<ScraperConfig, ConfigError> {
    let file = match path {
        // An explicitly named file has to exist
        Some(path) => File::from(path).required(true),
        None => File::with_name("myfcd").required(false),
    };

    let settings = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("MYFCD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let config = ScraperConfig::default();
        assert_eq!(config.page_size, 100);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.renderer, RendererKind::Browser);
        assert_eq!(config.output_dir, PathBuf::from("datasets"));
        assert!(!config.allow_partial_listing);
    }

    #[test]
    fn test_resolve_uses_profile_defaults() {
        let settings = ScraperConfig::default().resolve(Database::Fcd1997);
        assert_eq!(settings.item_delay, Duration::from_millis(800));
        assert_eq!(settings.render_timeout, Duration::from_secs(20));
        assert_eq!(settings.settle_delay, Duration::from_secs(3));
        assert_eq!(settings.base_url, "https://myfcd.moh.gov.my/myfcd97/");
        assert!(!settings.extract_metadata);
    }

    #[test]
    fn test_resolve_prefers_explicit_values() {
        let config = ScraperConfig {
            item_delay_ms: Some(0),
            render_timeout_secs: Some(2),
            base_url: Some("http://127.0.0.1:1234/".to_string()),
            page_size: 0,
            ..Default::default()
        };

        let settings = config.resolve(Database::Industry);
        assert_eq!(settings.item_delay, Duration::ZERO);
        assert_eq!(settings.render_timeout, Duration::from_secs(2));
        assert_eq!(settings.base_url, "http://127.0.0.1:1234/");
        assert_eq!(settings.page_size, 1);
        assert!(settings.listing_url.ends_with("server_processing.php"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "output_dir = \"out\"\nitem_delay_ms = 250\nrenderer = \"http\"\nmax_items = 5"
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.item_delay_ms, Some(250));
        assert_eq!(config.renderer, RendererKind::Http);
        assert_eq!(config.max_items, Some(5));
        assert_eq!(config.page_size, 100);
    }

    #[test]
    fn test_load_config_missing_file_is_an_error() {
        let result = load_config(Some(Path::new("/nonexistent/myfcd.toml")));
        assert!(result.is_err());
    }
}
