//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: the per-worker crawl loop state machine
//! - `DomainState`: per-domain parallelism and request spacing

mod crawl_state;
mod domain_state;

pub use crawl_state::CrawlState;
pub use domain_state::DomainState;
