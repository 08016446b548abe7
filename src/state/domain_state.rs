use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Tracks the politeness state of one domain during a crawl
///
/// Holds the domain's parallelism semaphore and the earliest instant at
/// which the next request may start. Slots are reserved ahead of time, so
/// concurrent callers are spaced by the configured delay rather than all
/// waking at once.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// Bounds the number of simultaneous requests to this domain
    pub permits: Arc<Semaphore>,

    /// Earliest start time of the next request, `None` before the first one
    pub next_slot: Option<Instant>,

    /// Number of requests issued to this domain in the current crawl
    pub request_count: u64,
}

impl DomainState {
    /// Creates a new DomainState allowing `parallelism` requests at once
    pub fn new(parallelism: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(parallelism.max(1))),
            next_slot: None,
            request_count: 0,
        }
    }

    /// Reserves the next request slot and returns when it starts
    ///
    /// The returned instant is `now` if the domain is idle, otherwise the
    /// previously reserved slot. The following slot is pushed `delay` further.
    pub fn reserve_slot(&mut self, now: Instant, delay: Duration) -> Instant {
        let start = match self.next_slot {
            Some(slot) if slot > now => slot,
            _ => now,
        };

        self.next_slot = Some(start + delay);
        self.request_count += 1;
        start
    }
}
