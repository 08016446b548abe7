//! Per-domain politeness
//!
//! Every request goes through [`Governor::acquire`], which enforces two
//! limits for the request's domain:
//! - at most `parallelism` requests in flight at once
//! - successive request start times at least `delay` apart

use crate::state::DomainState;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::OwnedSemaphorePermit;
use tokio::time::Instant;

/// Grants permission to send one request to a domain
///
/// The domain's parallelism slot is released when the permit is dropped.
#[derive(Debug)]
pub struct GovernorPermit {
    _permit: OwnedSemaphorePermit,
}

/// Tracks politeness state for every domain seen during a crawl
#[derive(Debug)]
pub struct Governor {
    parallelism: usize,
    delay: Duration,
    domains: Mutex<HashMap<String, DomainState>>,
}

impl Governor {
    /// Creates a governor
    ///
    /// # Arguments
    ///
    /// * `parallelism` - Maximum concurrent requests per domain
    /// * `delay` - Minimum spacing between request starts per domain
    pub fn new(parallelism: usize, delay: Duration) -> Self {
        Self {
            parallelism: parallelism.max(1),
            delay,
            domains: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until a request to `domain` is allowed to start
    ///
    /// Waits for a parallelism slot first, then reserves the next start time
    /// and sleeps until it arrives. Returns `None` only if the domain's
    /// semaphore was closed, which the governor never does.
    pub async fn acquire(&self, domain: &str) -> Option<GovernorPermit> {
        let semaphore = {
            let mut domains = self.lock();
            domains
                .entry(domain.to_string())
                .or_insert_with(|| DomainState::new(self.parallelism))
                .permits
                .clone()
        };

        let permit = semaphore.acquire_owned().await.ok()?;

        let start = {
            let mut domains = self.lock();
            let state = domains
                .entry(domain.to_string())
                .or_insert_with(|| DomainState::new(self.parallelism));
            state.reserve_slot(Instant::now(), self.delay)
        };

        tokio::time::sleep_until(start).await;

        tracing::trace!("Request slot granted for {}", domain);

        Some(GovernorPermit { _permit: permit })
    }

    /// Number of requests granted per domain
    pub fn request_counts(&self) -> HashMap<String, u64> {
        self.lock()
            .iter()
            .map(|(domain, state)| (domain.clone(), state.request_count))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DomainState>> {
        self.domains.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
