//! Crawler module for walking a directory's pagination chain
//!
//! This module contains the core crawling logic, including:
//! - The deduplicating frontier queue shared by worker slots
//! - Per-domain politeness (parallelism and request spacing)
//! - The on-disk fetch cache
//! - HTTP fetching
//! - Listing extraction from results pages
//! - Overall crawl coordination

mod cache;
mod coordinator;
mod extractor;
mod fetcher;
mod frontier;
mod governor;

pub use cache::{clear_dir, CacheError, CacheResult, CachedResponse, FetchCache};
pub use coordinator::{crawl, Coordinator, CrawlReport, CrawlStats};
pub use extractor::{extract, CompiledRules, Extraction};
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use frontier::{Frontier, FrontierError, InFlight, SharedFrontier};
pub use governor::{Governor, GovernorPermit};
