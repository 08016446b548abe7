//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates:
//! - Seeding and draining the frontier with concurrent worker slots
//! - Serving pages from the fetch cache or the network
//! - Extracting listings and following pagination links
//! - Cancellation and queue-overflow aborts

use crate::config::{CrawlerConfig, ExtractionRules};
use crate::crawler::cache::{CachedResponse, FetchCache};
use crate::crawler::extractor::{extract, CompiledRules};
use crate::crawler::fetcher::{build_http_client, fetch_url, FetchResult};
use crate::crawler::frontier::{FrontierError, SharedFrontier};
use crate::crawler::governor::Governor;
use crate::record::Record;
use crate::state::CrawlState;
use crate::url::{extract_domain, is_allowed_domain, normalize_url};
use crate::{ConfigError, PsychError, Result};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Counters collected over one crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Pages retrieved over the network
    pub pages_fetched: usize,
    /// Pages served from the fetch cache
    pub cache_hits: usize,
    /// Pages that could not be retrieved
    pub failed_pages: usize,
    /// Pagination links ignored because they left the allowed domains
    pub skipped_links: usize,
    /// Records extracted before deduplication
    pub records_extracted: usize,
    /// Rows dropped for lacking a title
    pub discarded_rows: usize,
    /// Network requests issued per domain
    pub requests_per_domain: HashMap<String, u64>,
    /// The crawl was stopped by the caller before the frontier drained
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// The outcome of a crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Every extracted record, in completion order, not deduplicated
    pub records: Vec<Record>,
    pub stats: CrawlStats,
}

/// Main crawler coordinator structure
///
/// Holds everything that outlives a single run: the HTTP client, the cache
/// and the compiled extraction rules. Each call to [`Coordinator::run`]
/// gets a fresh frontier, governor and accumulator.
#[derive(Debug)]
pub struct Coordinator {
    config: CrawlerConfig,
    rules: Arc<CompiledRules>,
    client: Client,
    cache: Option<FetchCache>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `rules` - Selectors used to pull listings out of each page
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(PsychError)` - A selector did not parse, the HTTP client could
    ///   not be built, or the cache directory could not be created
    pub fn new(config: CrawlerConfig, rules: &ExtractionRules) -> Result<Self> {
        let rules = Arc::new(CompiledRules::compile(rules)?);
        let client = build_http_client(&config)?;
        let cache = match &config.cache_dir {
            Some(dir) => Some(FetchCache::new(dir)?),
            None => None,
        };

        Ok(Self {
            config,
            rules,
            client,
            cache,
        })
    }

    /// Runs a crawl from `seed` until the frontier drains or `cancel` fires
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The crawl finished or was cancelled; a cancelled
    ///   report carries the records gathered so far
    /// * `Err(PsychError::Config)` - The seed is invalid or outside the
    ///   allowed domains; nothing was fetched
    /// * `Err(PsychError::QueueOverflow)` - The frontier exceeded its capacity
    pub async fn run(&self, seed: &str, cancel: CancellationToken) -> Result<CrawlReport> {
        let started = Instant::now();

        let seed = normalize_url(seed)?;
        let seed_domain = extract_domain(&seed)
            .ok_or_else(|| ConfigError::SeedNotAllowed(seed.to_string()))?;
        if !is_allowed_domain(&seed_domain, &self.config.allowed_domains) {
            return Err(ConfigError::SeedNotAllowed(seed.to_string()).into());
        }

        let parallelism = self.config.max_parallelism.max(1) as usize;
        let crawl = Arc::new(Crawl {
            frontier: SharedFrontier::new(self.config.queue_capacity),
            governor: Governor::new(
                parallelism,
                Duration::from_millis(self.config.request_delay),
            ),
            client: self.client.clone(),
            cache: self.cache.clone(),
            rules: Arc::clone(&self.rules),
            allowed_domains: self.config.allowed_domains.clone(),
            records: Mutex::new(Vec::new()),
            counters: Counters::default(),
            overflow: Mutex::new(None),
            abort: cancel.child_token(),
        });

        crawl.enqueue(seed.as_str());
        tracing::info!("Starting crawl at {} with {} workers", seed, parallelism);

        let mut workers = JoinSet::new();
        for id in 0..parallelism {
            let crawl = Arc::clone(&crawl);
            workers.spawn(async move { crawl.work(id).await });
        }

        let mut worker_failure = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Crawl worker stopped abnormally: {}", e);
                crawl.abort.cancel();
                worker_failure.get_or_insert_with(|| e.to_string());
            }
        }

        if let Some(FrontierError::Overflow { capacity }) = crawl.take_overflow() {
            return Err(PsychError::QueueOverflow { capacity });
        }
        if let Some(message) = worker_failure {
            return Err(PsychError::Worker(message));
        }

        let records = std::mem::take(
            &mut *crawl
                .records
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        let stats = CrawlStats {
            pages_fetched: crawl.counters.pages_fetched.load(Ordering::Relaxed),
            cache_hits: crawl.counters.cache_hits.load(Ordering::Relaxed),
            failed_pages: crawl.counters.failed_pages.load(Ordering::Relaxed),
            skipped_links: crawl.counters.skipped_links.load(Ordering::Relaxed),
            records_extracted: records.len(),
            discarded_rows: crawl.counters.discarded_rows.load(Ordering::Relaxed),
            requests_per_domain: crawl.governor.request_counts(),
            cancelled: cancel.is_cancelled(),
            elapsed: started.elapsed(),
        };

        if stats.cancelled {
            tracing::warn!(
                "Crawl cancelled after {} pages, keeping {} records",
                crawl.frontier.visited_count(),
                records.len()
            );
            if !crawl.frontier.is_empty() {
                tracing::info!("{} queued pages were not visited", crawl.frontier.len());
            }
        } else {
            tracing::info!(
                "Crawl completed: {} pages ({} from cache, {} failed), {} records in {:?}",
                crawl.frontier.visited_count(),
                stats.cache_hits,
                stats.failed_pages,
                records.len(),
                stats.elapsed
            );
        }

        Ok(CrawlReport { records, stats })
    }
}

#[derive(Debug, Default)]
struct Counters {
    pages_fetched: AtomicUsize,
    cache_hits: AtomicUsize,
    failed_pages: AtomicUsize,
    skipped_links: AtomicUsize,
    discarded_rows: AtomicUsize,
}

/// State shared by the worker slots of one run
struct Crawl {
    frontier: SharedFrontier,
    governor: Governor,
    client: Client,
    cache: Option<FetchCache>,
    rules: Arc<CompiledRules>,
    allowed_domains: Vec<String>,
    records: Mutex<Vec<Record>>,
    counters: Counters,
    overflow: Mutex<Option<FrontierError>>,
    /// Fires on caller cancellation, overflow, or a worker failure
    abort: CancellationToken,
}

impl Crawl {
    /// One worker slot: pop, fetch, extract, enqueue, repeat
    async fn work(&self, id: usize) {
        let mut state = CrawlState::Pending;

        while let Some((url, _in_flight)) = self.frontier.next(&self.abort).await {
            advance(&mut state, CrawlState::Fetching, id);

            let body = tokio::select! {
                body = self.load(&url) => body,
                _ = self.abort.cancelled() => break,
            };

            let Some(body) = body else {
                advance(&mut state, CrawlState::Pending, id);
                continue;
            };

            advance(&mut state, CrawlState::Extracting, id);
            self.process(&url, &body);
            advance(&mut state, CrawlState::Pending, id);
        }

        advance(&mut state, CrawlState::Done, id);
    }

    /// Returns the page body from the cache or the network
    async fn load(&self, url: &str) -> Option<String> {
        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get(url)) {
            tracing::debug!("Cache hit: {}", url);
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Some(cached.body);
        }

        let domain = Url::parse(url).ok().as_ref().and_then(extract_domain)?;
        let _permit = self.governor.acquire(&domain).await?;

        tracing::debug!("Fetching {}", url);
        match fetch_url(&self.client, url).await {
            FetchResult::Success(response) => {
                self.counters.pages_fetched.fetch_add(1, Ordering::Relaxed);
                self.store(&response);
                Some(response.body)
            }
            FetchResult::HttpError { status_code } => {
                tracing::debug!("HTTP {} for {}", status_code, url);
                self.counters.failed_pages.fetch_add(1, Ordering::Relaxed);
                None
            }
            FetchResult::NetworkError { error } => {
                tracing::debug!("Failed to fetch {}: {}", url, error);
                self.counters.failed_pages.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn store(&self, response: &CachedResponse) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(response) {
                tracing::warn!("Failed to cache {}: {}", response.url, e);
            }
        }
    }

    /// Extracts a page, appends its records and enqueues its links
    fn process(&self, url: &str, body: &str) {
        let Ok(page_url) = Url::parse(url) else {
            return;
        };

        let extraction = extract(body, &page_url, &self.rules);
        tracing::debug!(
            "Extracted {} records and {} links from {}",
            extraction.records.len(),
            extraction.next_links.len(),
            url
        );

        self.counters
            .discarded_rows
            .fetch_add(extraction.discarded_rows, Ordering::Relaxed);
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(extraction.records);

        for link in extraction.next_links {
            if !self.enqueue(link.as_str()) {
                break;
            }
        }
    }

    /// Normalizes and enqueues a link if it stays within the allowed domains
    ///
    /// Returns false once the crawl has been aborted by an overflow.
    fn enqueue(&self, link: &str) -> bool {
        let normalized = match normalize_url(link) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping link {}: {}", link, e);
                self.counters.skipped_links.fetch_add(1, Ordering::Relaxed);
                return true;
            }
        };

        let allowed = extract_domain(&normalized)
            .map_or(false, |domain| is_allowed_domain(&domain, &self.allowed_domains));
        if !allowed {
            tracing::debug!("Skipping off-site link {}", normalized);
            self.counters.skipped_links.fetch_add(1, Ordering::Relaxed);
            return true;
        }

        match self.frontier.push(normalized.as_str()) {
            Ok(_) => true,
            Err(overflow) => {
                tracing::error!("{}; aborting crawl", overflow);
                self.overflow
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get_or_insert(overflow);
                self.abort.cancel();
                false
            }
        }
    }

    fn take_overflow(&self) -> Option<FrontierError> {
        self.overflow
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

fn advance(state: &mut CrawlState, next: CrawlState, worker: usize) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid transition {} -> {}",
        state,
        next
    );
    tracing::trace!("Worker {}: {} -> {}", worker, state, next);
    if next.is_terminal() {
        tracing::trace!("Worker {} finished", worker);
    }
    *state = next;
}

/// Runs a crawl and returns only the extracted records
///
/// # Arguments
///
/// * `seed` - The start URL (usually from `build_start_url`)
/// * `config` - The crawler configuration
/// * `rules` - The extraction rules
/// * `cancel` - Stops the crawl early; the records gathered so far are kept
///
/// # Example
///
/// ```no_run
/// use psych::config::Config;
/// use psych::crawler::crawl;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> psych::Result<()> {
/// let config = Config::default();
/// let records = crawl(
///     "https://www.psychologytoday.com/us/therapists/98101",
///     config.crawler,
///     &config.selectors,
///     CancellationToken::new(),
/// )
/// .await?;
/// println!("{} listings", records.len());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(
    seed: &str,
    config: CrawlerConfig,
    rules: &ExtractionRules,
    cancel: CancellationToken,
) -> Result<Vec<Record>> {
    let coordinator = Coordinator::new(config, rules)?;
    Ok(coordinator.run(seed, cancel).await?.records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_selector_fails_construction() {
        let rules = ExtractionRules {
            row: "div[".to_string(),
            ..ExtractionRules::default()
        };
        let result = Coordinator::new(CrawlerConfig::default(), &rules);
        assert!(matches!(
            result,
            Err(PsychError::Config(ConfigError::InvalidSelector { .. }))
        ));
    }

    #[tokio::test]
    async fn test_seed_outside_allowed_domains() {
        let coordinator =
            Coordinator::new(CrawlerConfig::default(), &ExtractionRules::default()).unwrap();

        let result = coordinator
            .run("https://example.com/us/therapists/98101", CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(PsychError::Config(ConfigError::SeedNotAllowed(_)))
        ));
    }

    #[tokio::test]
    async fn test_invalid_seed() {
        let coordinator =
            Coordinator::new(CrawlerConfig::default(), &ExtractionRules::default()).unwrap();

        let result = coordinator.run("not a url", CancellationToken::new()).await;
        assert!(matches!(result, Err(PsychError::UrlError(_))));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let coordinator =
            Coordinator::new(CrawlerConfig::default(), &ExtractionRules::default()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = coordinator
            .run("https://www.psychologytoday.com/us/therapists/98101", cancel)
            .await
            .unwrap();

        assert!(report.stats.cancelled);
        assert!(report.records.is_empty());
        assert_eq!(report.stats.pages_fetched, 0);
    }

    #[test]
    fn test_cache_dir_created() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache_dir = dir.path().join("responses");
        let config = CrawlerConfig {
            cache_dir: Some(cache_dir.clone()),
            ..CrawlerConfig::default()
        };

        Coordinator::new(config, &ExtractionRules::default()).unwrap();
        assert!(cache_dir.is_dir());
    }
}
