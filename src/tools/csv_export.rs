use log::{error, info};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::ScrapeError;
use crate::model::FoodRecord;
use crate::store::FoodStore;

pub const DEFAULT_CSV_FILE: &str = "myfcd_complete.csv";

const IDENTITY_COLUMNS: [&str; 6] = [
    "NDB_No",
    "Description",
    "Food_Group",
    "Image",
    "Source",
    "Published_Date",
];

/// Result of a directory export
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    /// Files that could not be read and were left out
    pub skipped: Vec<String>,
}

/// Column names for rows with up to `groups` category groups
pub fn header(groups: usize) -> Vec<String> {
    let mut columns: Vec<String> = IDENTITY_COLUMNS.iter().map(|c| c.to_string()).collect();
    for n in 1..=groups {
        columns.push(format!("Category_{n}"));
        columns.push(format!("Nutrients_{n}"));
    }
    columns
}

/// One wide row: identity columns, then a category name and a JSON array of
/// its nutrients for every group
pub fn csv_row(record: &FoodRecord) -> Result<Vec<String>, ScrapeError> {
    let metadata = &record.metadata;
    let mut row = vec![
        record.ndb_no.clone(),
        record.description.clone(),
        record.food_group.clone(),
        metadata.image.clone().unwrap_or_default(),
        metadata.source.clone().unwrap_or_default(),
        metadata.published_date.clone().unwrap_or_default(),
    ];

    for group in &record.groups {
        row.push(group.category.clone().unwrap_or_default());
        row.push(serde_json::to_string(&group.nutrients)?);
    }

    Ok(row)
}

/// Write `records` as CSV; rows with fewer groups are padded with empty cells
pub fn write_csv<W: Write>(records: &[FoodRecord], writer: W) -> Result<usize, ScrapeError> {
    let groups = records.iter().map(|r| r.groups.len()).max().unwrap_or(0);
    let header = header(groups);

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&header)?;
    for record in records {
        let mut row = csv_row(record)?;
        row.resize(header.len(), String::new());
        csv.write_record(&row)?;
    }
    csv.flush()?;

    Ok(header.len())
}

/// Convert every item file of `store` into a single CSV at `output`
pub fn export_csv(store: &FoodStore, output: &Path) -> Result<CsvExport, ScrapeError> {
    let files = store.record_files()?;
    info!("Found {} JSON files", files.len());

    let mut records = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();
    for (index, path) in files.iter().enumerate() {
        match store.load(path) {
            Ok(record) => records.push(record),
            Err(e) => {
                error!("Error processing {}: {}", path.display(), e);
                skipped.push(path.display().to_string());
            }
        }
        if (index + 1) % 50 == 0 {
            info!("Processed {}/{} files...", index + 1, files.len());
        }
    }

    let columns = write_csv(&records, File::create(output)?)?;
    info!("CSV created: {}", output.display());

    Ok(CsvExport {
        path: output.to_path_buf(),
        rows: records.len(),
        columns,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{group_records, FoodMetadata, NutrientEntry, NutrientRecord};

    fn record(groups: usize) -> FoodRecord {
        let mut flat = Vec::new();
        for n in 0..groups {
            flat.push(NutrientRecord::Category {
                category: format!("C{n}"),
            });
            flat.push(NutrientRecord::Nutrient(NutrientEntry::new(format!("N{n}"))));
        }
        FoodRecord {
            ndb_no: format!("R{groups}"),
            description: "Food".to_string(),
            food_group: "Group".to_string(),
            metadata: FoodMetadata {
                image: Some("https://example.com/a.jpg".to_string()),
                ..Default::default()
            },
            groups: group_records(flat),
        }
    }

    #[test]
    fn test_header() {
        assert_eq!(header(0).len(), 6);
        let columns = header(2);
        assert_eq!(&columns[6..], ["Category_1", "Nutrients_1", "Category_2", "Nutrients_2"]);
    }

    #[test]
    fn test_rows_are_padded_to_widest_record() {
        let mut out = Vec::new();
        let columns = write_csv(&[record(1), record(3)], &mut out).unwrap();
        assert_eq!(columns, 12);

        let mut reader = csv::Reader::from_reader(out.as_slice());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 12);
        assert_eq!(&rows[0][3], "https://example.com/a.jpg");
        assert_eq!(&rows[0][4], "");
        assert_eq!(&rows[0][6], "C0");
        assert_eq!(&rows[0][8], "");
        assert_eq!(&rows[1][10], "C2");
        assert_eq!(&rows[1][11], r#"[{"name":"N2"}]"#);
    }
}
