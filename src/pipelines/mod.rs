pub mod detail;
pub mod scrape;

/// Outcome of a scraping run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Items returned by the listing endpoint
    pub listed: usize,
    /// Items whose detail page was visited
    pub attempted: usize,
    /// Items written to disk
    pub saved: usize,
    /// `(ndb_no, reason)` for every item that was not saved
    pub failed: Vec<(String, String)>,
}
