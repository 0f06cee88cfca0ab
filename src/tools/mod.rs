//! Read-only consumers of an output directory

pub mod analyze;
pub mod csv_export;
pub mod progress;

pub use analyze::{analyze, Summary, SUMMARY_FILE};
pub use csv_export::{export_csv, write_csv, CsvExport, DEFAULT_CSV_FILE};
pub use progress::{check_progress, ProgressReport};
