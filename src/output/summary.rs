//! Crawl summary types
//!
//! A [`CrawlSummary`] combines the crawler's counters with what happened
//! afterwards (deduplication and persistence) so a fetch can be reported in
//! one place.

use crate::crawler::CrawlReport;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Summary statistics for one fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlSummary {
    // Run metadata
    pub seed: String,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
    pub cancelled: bool,

    // Pages
    pub pages_fetched: usize,
    pub cache_hits: usize,
    pub failed_pages: usize,
    pub skipped_links: usize,

    // Records
    pub records_extracted: usize,
    pub discarded_rows: usize,
    pub unique_records: usize,
    pub records_saved: usize,

    /// Network requests per domain, busiest first
    pub requests_per_domain: Vec<(String, u64)>,
}

impl CrawlSummary {
    /// Builds a summary from a crawl report
    ///
    /// # Arguments
    ///
    /// * `seed` - The start URL of the crawl
    /// * `report` - What the crawler returned
    /// * `unique_records` - Records left after deduplication
    /// * `records_saved` - Records written to storage
    pub fn from_report(
        seed: &str,
        report: &CrawlReport,
        unique_records: usize,
        records_saved: usize,
    ) -> Self {
        let stats = &report.stats;

        let mut requests_per_domain: Vec<(String, u64)> = stats
            .requests_per_domain
            .iter()
            .map(|(domain, count)| (domain.clone(), *count))
            .collect();
        requests_per_domain.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            seed: seed.to_string(),
            finished_at: Utc::now(),
            duration: stats.elapsed,
            cancelled: stats.cancelled,
            pages_fetched: stats.pages_fetched,
            cache_hits: stats.cache_hits,
            failed_pages: stats.failed_pages,
            skipped_links: stats.skipped_links,
            records_extracted: stats.records_extracted,
            discarded_rows: stats.discarded_rows,
            unique_records,
            records_saved,
            requests_per_domain,
        }
    }

    /// Pages that were attempted, from any source
    pub fn total_pages(&self) -> usize {
        self.pages_fetched + self.cache_hits + self.failed_pages
    }

    /// Share of retrieved pages served from the cache, as a percentage
    pub fn cache_hit_rate(&self) -> f64 {
        let retrieved = self.pages_fetched + self.cache_hits;
        if retrieved == 0 {
            return 0.0;
        }
        (self.cache_hits as f64 / retrieved as f64) * 100.0
    }

    /// Records collapsed into an earlier one with the same title
    pub fn duplicates(&self) -> usize {
        self.records_extracted.saturating_sub(self.unique_records)
    }

    pub fn status(&self) -> &'static str {
        if self.cancelled {
            "cancelled"
        } else {
            "completed"
        }
    }
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Crawl {}: {} pages ({} cached, {} failed), {} records, {} unique, {} saved in {:.1}s",
            self.status(),
            self.total_pages(),
            self.cache_hits,
            self.failed_pages,
            self.records_extracted,
            self.unique_records,
            self.records_saved,
            self.duration.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::CrawlStats;
    use std::collections::HashMap;

    fn report() -> CrawlReport {
        CrawlReport {
            records: Vec::new(),
            stats: CrawlStats {
                pages_fetched: 3,
                cache_hits: 1,
                failed_pages: 1,
                records_extracted: 12,
                requests_per_domain: HashMap::from([
                    ("a.example.com".to_string(), 1),
                    ("www.example.com".to_string(), 3),
                ]),
                elapsed: Duration::from_millis(2500),
                ..CrawlStats::default()
            },
        }
    }

    #[test]
    fn test_from_report() {
        let summary = CrawlSummary::from_report("https://www.example.com/", &report(), 10, 10);

        assert_eq!(summary.total_pages(), 5);
        assert_eq!(summary.duplicates(), 2);
        assert_eq!(summary.status(), "completed");
        assert_eq!(summary.requests_per_domain[0], ("www.example.com".to_string(), 3));
    }

    #[test]
    fn test_cache_hit_rate() {
        let summary = CrawlSummary::from_report("https://www.example.com/", &report(), 10, 10);
        assert!((summary.cache_hit_rate() - 25.0).abs() < 0.01);

        assert_eq!(CrawlSummary::default().cache_hit_rate(), 0.0);
    }

    #[test]
    fn test_display_line() {
        let mut summary = CrawlSummary::from_report("https://www.example.com/", &report(), 10, 9);
        summary.cancelled = true;

        let line = summary.to_string();
        assert!(line.starts_with("Crawl cancelled: 5 pages"));
        assert!(line.contains("10 unique, 9 saved"));
        assert!(line.ends_with("in 2.5s"));
    }
}
