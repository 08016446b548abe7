//! Output module for presenting crawl results
//!
//! This module handles:
//! - Crawl summaries (a one-line report and a markdown file)
//! - The interactive terminal browser over stored listings

mod browser;
mod markdown;
mod summary;

pub use browser::{browse, BrowserState};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use summary::{CrawlSummary, OutputError, OutputResult};
