//! Configuration module for Page-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; a missing file section falls back to defaults.
//!
//! # Example
//!
//! ```no_run
//! use page_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Fetch timeout: {}s", config.fetcher.timeout_secs);
//! ```

mod parser;
mod types;
mod validation;

pub use parser::{config_hash, load_config, load_config_with_hash, parse_config};
pub use types::{Config, CrawlDefaults, FetcherConfig, ServerConfig, UserAgentConfig};
pub use validation::validate;
