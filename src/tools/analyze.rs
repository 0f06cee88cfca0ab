use log::{info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::config::ScrapeSettings;
use crate::error::ScrapeError;
use crate::store::FoodStore;

pub const SUMMARY_FILE: &str = "summary_analysis.json";

/// Problems and ranked lists shown in the text report
const REPORT_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Statistics {
    pub total_files: usize,
    pub successful_scrapes: usize,
    pub with_images: usize,
    pub with_source: usize,
    pub with_published_date: usize,
    pub total_nutrients: usize,
    pub food_groups: BTreeMap<String, usize>,
    pub nutrients_by_food: Vec<usize>,
    pub serving_sizes: BTreeMap<String, usize>,
    pub files_with_serving_sizes: usize,
}

/// Aggregate view over an output directory
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub analysis_date: String,
    pub database_type: String,
    pub source_url: String,
    pub statistics: Statistics,
    pub unique_nutrients: Vec<String>,
    pub problems: Vec<String>,
}

impl Summary {
    pub fn average_nutrients(&self) -> Option<f64> {
        let counts = &self.statistics.nutrients_by_food;
        (!counts.is_empty()).then(|| counts.iter().sum::<usize>() as f64 / counts.len() as f64)
    }

    /// Entries of a frequency table, most frequent first (ties by name)
    fn ranked(counts: &BTreeMap<String, usize>) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> =
            counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        ranked
    }

    pub fn food_group_ranking(&self) -> Vec<(&str, usize)> {
        Self::ranked(&self.statistics.food_groups)
    }

    pub fn serving_size_ranking(&self) -> Vec<(&str, usize)> {
        Self::ranked(&self.statistics.serving_sizes)
    }

    fn share(&self, count: usize) -> f64 {
        match self.statistics.successful_scrapes {
            0 => 0.0,
            total => count as f64 / total as f64 * 100.0,
        }
    }

    /// Write the summary as `summary_analysis.json` into the store directory
    pub fn write(&self, store: &FoodStore) -> Result<PathBuf, ScrapeError> {
        let path = store.dir().join(SUMMARY_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!("Detailed analysis saved to {}", path.display());
        Ok(path)
    }
}

/// Read every item file in `store` and aggregate statistics
///
/// The summary names the database and the site it was scraped from, taken
/// from the resolved `settings` so URL overrides are reported.
pub fn analyze(store: &FoodStore, settings: &ScrapeSettings) -> Result<Summary, ScrapeError> {
    let files = store.record_files()?;
    info!("Analyzing {} files in {}", files.len(), store.dir().display());

    let mut stats = Statistics {
        total_files: files.len(),
        ..Default::default()
    };
    let mut unique_nutrients = BTreeSet::new();
    let mut problems = Vec::new();

    for path in &files {
        let record = match store.load(path) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                problems.push(format!("Error processing {}: {}", path.display(), e));
                continue;
            }
        };

        stats.successful_scrapes += 1;
        stats.with_images += usize::from(record.metadata.image.is_some());
        stats.with_source += usize::from(record.metadata.source.is_some());
        stats.with_published_date += usize::from(record.metadata.published_date.is_some());
        *stats.food_groups.entry(record.food_group.clone()).or_default() += 1;

        let nutrient_count = record.nutrient_count();
        stats.nutrients_by_food.push(nutrient_count);
        stats.total_nutrients += nutrient_count;

        let mut has_servings = false;
        for nutrient in record.nutrients() {
            unique_nutrients.insert(nutrient.name.clone());
            for key in nutrient.servings.keys() {
                has_servings = true;
                *stats.serving_sizes.entry(key.clone()).or_default() += 1;
            }
        }
        stats.files_with_serving_sizes += usize::from(has_servings);
    }

    Ok(Summary {
        analysis_date: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        database_type: settings.name.to_string(),
        source_url: settings.base_url.clone(),
        statistics: stats,
        unique_nutrients: unique_nutrients.into_iter().collect(),
        problems,
    })
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.statistics;
        writeln!(f, "SCRAPING SUMMARY - {}", self.database_type)?;
        writeln!(f, "Total files processed: {}", stats.total_files)?;
        writeln!(f, "Successful scrapes: {}", stats.successful_scrapes)?;
        for (label, count) in [
            ("images", stats.with_images),
            ("source", stats.with_source),
            ("published date", stats.with_published_date),
            ("serving sizes", stats.files_with_serving_sizes),
        ] {
            writeln!(f, "Files with {}: {} ({:.1}%)", label, count, self.share(count))?;
        }

        writeln!(f, "\nTotal unique nutrients: {}", self.unique_nutrients.len())?;
        writeln!(f, "Total nutrient entries: {}", stats.total_nutrients)?;
        if let Some(average) = self.average_nutrients() {
            writeln!(f, "Average nutrients per food: {:.1}", average)?;
        }

        writeln!(f, "\nFood Groups Distribution:")?;
        for (group, count) in self.food_group_ranking() {
            writeln!(f, "  • {}: {} items ({:.1}%)", group, count, self.share(count))?;
        }

        let servings = self.serving_size_ranking();
        if !servings.is_empty() {
            writeln!(f, "\nCommon Serving Sizes:")?;
            for (key, count) in servings.into_iter().take(REPORT_LIMIT) {
                writeln!(f, "  • {}: {} occurrences", key, count)?;
            }
        }

        if !self.problems.is_empty() {
            writeln!(f, "\nProblems encountered:")?;
            for problem in self.problems.iter().take(REPORT_LIMIT) {
                writeln!(f, "  • {}", problem)?;
            }
            if self.problems.len() > REPORT_LIMIT {
                writeln!(f, "  ... and {} more problems", self.problems.len() - REPORT_LIMIT)?;
            }
        }

        Ok(())
    }
}
