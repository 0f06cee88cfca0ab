use log::debug;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::ScrapeError;
use crate::model::FoodRecord;

static UNSAFE_FILE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\-.]").unwrap());

/// Reports written next to the item files start with this prefix
const SUMMARY_PREFIX: &str = "summary";

/// File stem for an item id; characters outside `[\w-.]` become `_`
pub fn sanitize_file_stem(ndb_no: &str) -> String {
    let stem = UNSAFE_FILE_CHARS.replace_all(ndb_no.trim(), "_");
    if stem.is_empty() {
        "unknown".to_string()
    } else {
        stem.into_owned()
    }
}

/// Directory of per-item JSON documents
#[derive(Debug, Clone)]
pub struct FoodStore {
    dir: PathBuf,
}

impl FoodStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, ndb_no: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_file_stem(ndb_no)))
    }

    /// Write a record as pretty-printed JSON, replacing any previous file
    pub fn save(&self, record: &FoodRecord) -> Result<PathBuf, ScrapeError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&record.ndb_no);
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json)?;
        debug!("Saved {}", path.display());
        Ok(path)
    }

    pub fn load(&self, path: &Path) -> Result<FoodRecord, ScrapeError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Item files sorted by name; summary reports are excluded
    pub fn record_files(&self) -> Result<Vec<PathBuf>, ScrapeError> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_record_file(path))
            .collect();
        files.sort();
        Ok(files)
    }
}

fn is_record_file(path: &Path) -> bool {
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let is_summary = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(SUMMARY_PREFIX));
    is_json && !is_summary
}
