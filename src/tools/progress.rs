use std::fmt;

use crate::database::ExpectedTotal;
use crate::error::ScrapeError;
use crate::store::FoodStore;

const BAR_WIDTH: usize = 30;
const SAMPLE_SIZE: usize = 3;

/// Category and nutrient counts of one recently written file
#[derive(Debug, Clone)]
pub struct FileSample {
    pub file_name: String,
    /// `(distinct categories, nutrients)` or the read error
    pub counts: Result<(usize, usize), String>,
}

#[derive(Debug, Clone)]
pub struct ProgressReport {
    pub completed: usize,
    pub expected: ExpectedTotal,
    pub samples: Vec<FileSample>,
}

impl ProgressReport {
    pub fn percent(&self) -> f64 {
        let expected = self.expected.count();
        if expected == 0 {
            return 0.0;
        }
        let percent = self.completed as f64 / expected as f64 * 100.0;
        match self.expected {
            ExpectedTotal::Estimate(_) => percent.min(100.0),
            ExpectedTotal::Exact(_) => percent,
        }
    }

    pub fn bar(&self) -> String {
        let expected = self.expected.count().max(1);
        let filled = (BAR_WIDTH * self.completed / expected).min(BAR_WIDTH);
        format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
    }

    /// Only an exact expected total can tell that a run is finished
    pub fn is_complete(&self) -> bool {
        match self.expected {
            ExpectedTotal::Exact(n) => self.completed >= n,
            ExpectedTotal::Estimate(_) => false,
        }
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expected {
            ExpectedTotal::Exact(n) => writeln!(
                f,
                "Completed: {}/{} ({:.1}%)",
                self.completed,
                n,
                self.percent()
            )?,
            ExpectedTotal::Estimate(n) => writeln!(
                f,
                "Completed: {} files (about {} expected)",
                self.completed, n
            )?,
        }

        if self.completed == 0 {
            return writeln!(f, "Scraping not started");
        }

        writeln!(f, "Progress: [{}] {:.1}%", self.bar(), self.percent())?;

        if !self.samples.is_empty() {
            writeln!(f, "\nRecent files check:")?;
            for sample in &self.samples {
                match &sample.counts {
                    Ok((categories, nutrients)) => writeln!(
                        f,
                        "  {}: {} categories, {} nutrients",
                        sample.file_name, categories, nutrients
                    )?,
                    Err(e) => writeln!(f, "  Error checking {}: {}", sample.file_name, e)?,
                }
            }
        }

        if self.is_complete() {
            writeln!(f, "\nScraping COMPLETE!")
        } else {
            writeln!(f, "\nScraping in progress...")
        }
    }
}

/// Count the item files in `store` and sample the last few by name
pub fn check_progress(
    store: &FoodStore,
    expected: ExpectedTotal,
) -> Result<ProgressReport, ScrapeError> {
    let files = store.record_files()?;

    let samples = files
        .iter()
        .skip(files.len().saturating_sub(SAMPLE_SIZE))
        .map(|path| FileSample {
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            counts: store
                .load(path)
                .map(|record| (record.category_count(), record.nutrient_count()))
                .map_err(|e| e.to_string()),
        })
        .collect();

    Ok(ProgressReport {
        completed: files.len(),
        expected,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(completed: usize, expected: ExpectedTotal) -> ProgressReport {
        ProgressReport {
            completed,
            expected,
            samples: Vec::new(),
        }
    }

    #[test]
    fn test_percent_and_bar() {
        let progress = report(116, ExpectedTotal::Exact(233));
        assert!((progress.percent() - 49.78).abs() < 0.01);
        assert_eq!(progress.bar().chars().filter(|c| *c == '█').count(), 14);
        assert_eq!(progress.bar().chars().count(), 30);
        assert!(!progress.is_complete());
        assert!(report(233, ExpectedTotal::Exact(233)).is_complete());
    }

    #[test]
    fn test_estimate_is_capped() {
        let progress = report(650, ExpectedTotal::Estimate(500));
        assert_eq!(progress.percent(), 100.0);
        assert_eq!(progress.bar(), "█".repeat(30));
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_not_started_display() {
        let text = report(0, ExpectedTotal::Exact(233)).to_string();
        assert!(text.contains("0/233"));
        assert!(text.contains("Scraping not started"));
    }
}
