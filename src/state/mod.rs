//! State module for tracking one top-level crawl
//!
//! `CrawlState` holds the visited set and the link budget counter. It is
//! created per request and threaded through the recursion by exclusive
//! reference, so concurrent requests never observe each other's progress.

mod crawl_state;

pub use crawl_state::CrawlState;
