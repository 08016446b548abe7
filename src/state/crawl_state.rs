/// Crawl state machine definitions
///
/// A worker slot cycles `Pending -> Fetching -> Extracting -> Pending` for
/// each URL it pops and ends in `Done` once the frontier is drained (or the
/// crawl is cancelled). A failed fetch goes straight back to `Pending`.
use std::fmt;

/// Represents where a worker slot is in the crawl loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Waiting for the next URL from the frontier
    Pending,

    /// A URL has been popped and its body is being retrieved
    Fetching,

    /// The body is being parsed into records and follow-up links
    Extracting,

    /// The frontier is drained or the crawl was cancelled
    Done,
}

impl CrawlState {
    /// Returns true if no further work will happen in this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if the transition `self -> next` is part of the crawl loop
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Pending, Self::Done)
                | (Self::Fetching, Self::Extracting)
                | (Self::Fetching, Self::Pending)
                | (Self::Fetching, Self::Done)
                | (Self::Extracting, Self::Pending)
                | (Self::Extracting, Self::Done)
        )
    }

    /// Lowercase name used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
