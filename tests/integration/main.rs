//! End-to-end tests for psych
//!
//! Crawls run against wiremock servers; storage tests use temporary
//! database files.

mod crawl_tests;
mod storage_tests;
