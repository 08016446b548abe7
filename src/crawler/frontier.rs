//! Frontier queue for pages awaiting a fetch
//!
//! The frontier is a bounded FIFO queue that remembers every URL it has ever
//! accepted, so a page reached twice through pagination is fetched once.
//! [`SharedFrontier`] lets several worker tasks drain it concurrently and
//! agree on when the crawl has run out of work.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Frontier-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrontierError {
    #[error("frontier is full ({capacity} URLs queued)")]
    Overflow { capacity: usize },
}

/// Bounded FIFO queue of URLs with permanent deduplication
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<String>,
    seen: HashSet<String>,
    capacity: usize,
    visited: usize,
}

impl Frontier {
    /// Creates an empty frontier holding at most `capacity` queued URLs
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            capacity,
            visited: 0,
        }
    }

    /// Enqueues a URL unless it was queued or visited before
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The URL was added
    /// * `Ok(false)` - The URL was already known
    /// * `Err(FrontierError::Overflow)` - The queue is at capacity
    pub fn push(&mut self, url: impl Into<String>) -> Result<bool, FrontierError> {
        let url = url.into();

        if self.seen.contains(&url) {
            return Ok(false);
        }

        if self.queue.len() >= self.capacity {
            return Err(FrontierError::Overflow {
                capacity: self.capacity,
            });
        }

        self.seen.insert(url.clone());
        self.queue.push_back(url);
        Ok(true)
    }

    /// Removes the oldest queued URL and marks it visited
    pub fn pop(&mut self) -> Option<String> {
        let url = self.queue.pop_front()?;
        self.visited += 1;
        Some(url)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of URLs still waiting
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Number of URLs handed out by `pop`
    pub fn visited_count(&self) -> usize {
        self.visited
    }
}

#[derive(Debug)]
struct SharedInner {
    frontier: Frontier,
    in_flight: usize,
}

/// A frontier shared by concurrent workers
///
/// Workers call [`SharedFrontier::next`] in a loop. A worker that finds the
/// queue empty waits while other workers still hold URLs, since those pages
/// may yield more links. Once the queue is empty and nothing is in flight,
/// every waiting worker receives `None`.
#[derive(Debug)]
pub struct SharedFrontier {
    inner: Mutex<SharedInner>,
    notify: Notify,
}

/// Marks one popped URL as being worked on; dropping it marks the work done
#[derive(Debug)]
pub struct InFlight<'a> {
    frontier: &'a SharedFrontier,
}

impl SharedFrontier {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(SharedInner {
                frontier: Frontier::new(capacity),
                in_flight: 0,
            }),
            notify: Notify::new(),
        }
    }

    /// Enqueues a URL and wakes any waiting worker if it was new
    pub fn push(&self, url: impl Into<String>) -> Result<bool, FrontierError> {
        let added = self.lock().frontier.push(url)?;
        if added {
            self.notify.notify_waiters();
        }
        Ok(added)
    }

    /// Waits for the next URL to work on
    ///
    /// # Returns
    ///
    /// * `Some((url, guard))` - Work to do; drop `guard` when finished
    /// * `None` - The frontier is drained or `cancel` fired
    pub async fn next(&self, cancel: &CancellationToken) -> Option<(String, InFlight<'_>)> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }

            // Registered before checking the queue so a push between the
            // check and the await is not missed.
            let notified = self.notify.notified();

            {
                let mut inner = self.lock();
                if let Some(url) = inner.frontier.pop() {
                    inner.in_flight += 1;
                    return Some((url, InFlight { frontier: self }));
                }
                if inner.in_flight == 0 {
                    drop(inner);
                    self.notify.notify_waiters();
                    return None;
                }
            }

            tokio::select! {
                _ = notified => {}
                _ = cancel.cancelled() => return None,
            }
        }
    }

    /// Number of URLs handed out so far
    pub fn visited_count(&self) -> usize {
        self.lock().frontier.visited_count()
    }

    /// Number of URLs still waiting
    pub fn len(&self) -> usize {
        self.lock().frontier.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().frontier.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, SharedInner> {
        // The guarded data stays consistent across a panicking worker.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        {
            let mut inner = self.frontier.lock();
            inner.in_flight = inner.in_flight.saturating_sub(1);
        }
        self.frontier.notify.notify_waiters();
    }
}
