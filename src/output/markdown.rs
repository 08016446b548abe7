//! Markdown summary generation
//!
//! This module writes a human-readable markdown report of a fetch,
//! including page counts, record counts and per-domain request totals.

use crate::output::summary::{CrawlSummary, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary to a file
///
/// # Arguments
///
/// * `summary` - The crawl summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    tracing::info!("Wrote summary to {}", output_path.display());
    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("# Psych Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Start URL**: {}\n", summary.seed));
    md.push_str(&format!(
        "- **Finished**: {}\n",
        summary.finished_at.to_rfc3339()
    ));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        summary.duration.as_secs_f64()
    ));
    md.push_str(&format!("- **Status**: {}\n\n", summary.status()));

    // Pages
    md.push_str("## Pages\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Fetched | {} |\n", summary.pages_fetched));
    md.push_str(&format!("| From cache | {} |\n", summary.cache_hits));
    md.push_str(&format!("| Failed | {} |\n", summary.failed_pages));
    md.push_str(&format!(
        "| Off-site links skipped | {} |\n\n",
        summary.skipped_links
    ));
    md.push_str(&format!(
        "Cache hit rate: {:.2}%\n\n",
        summary.cache_hit_rate()
    ));

    // Records
    md.push_str("## Records\n\n");
    md.push_str("| Stage | Count |\n");
    md.push_str("|-------|-------|\n");
    md.push_str(&format!("| Extracted | {} |\n", summary.records_extracted));
    md.push_str(&format!(
        "| Untitled rows discarded | {} |\n",
        summary.discarded_rows
    ));
    md.push_str(&format!("| Duplicates collapsed | {} |\n", summary.duplicates()));
    md.push_str(&format!("| Unique | {} |\n", summary.unique_records));
    md.push_str(&format!("| Saved | {} |\n\n", summary.records_saved));

    // Requests per domain
    if !summary.requests_per_domain.is_empty() {
        md.push_str("## Requests per Domain\n\n");
        md.push_str("| Domain | Requests |\n");
        md.push_str("|--------|----------|\n");

        for (domain, count) in &summary.requests_per_domain {
            md.push_str(&format!("| {} | {} |\n", domain, count));
        }
        md.push('\n');
    }

    md
}
