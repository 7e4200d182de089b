//! Page-Harvest main entry point
//!
//! This is the command-line interface for the Page-Harvest scraper: it
//! either runs the HTTP service or performs a single scrape and prints it.

use anyhow::Context;
use clap::{Parser, Subcommand};
use page_harvest::config::{load_config_with_hash, validate, Config};
use page_harvest::service::server;
use page_harvest::{OutputFormat, ScrapeRequest, Scraper};
use serde_json::{json, Map, Value};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Page-Harvest: a bounded recursive page scraper
///
/// Page-Harvest fetches a page, extracts its title, text and images, and
/// can follow its links to a bounded depth and link budget, converting
/// PDF, DOCX and XLSX documents along the way.
#[derive(Parser, Debug)]
#[command(name = "page-harvest")]
#[command(version)]
#[command(about = "A bounded recursive page scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP scrape service
    Serve {
        /// Address to listen on (overrides the configured bind address)
        #[arg(long, value_name = "ADDR")]
        bind: Option<SocketAddr>,

        /// Validate config and show it without starting the server
        #[arg(long)]
        dry_run: bool,
    },

    /// Scrape one URL and print the rendered result
    Scrape {
        /// URL to scrape (`https://` is assumed when no scheme is given)
        url: String,

        /// Response format: json, html, text, markdown, proxy or metadata
        #[arg(long)]
        format: Option<OutputFormat>,

        /// Maximum link hops to follow from the page
        #[arg(long, default_value_t = 0)]
        max_level: u32,

        /// Maximum number of recursive fetches
        #[arg(long)]
        max_links: Option<usize>,

        /// Only list or follow links matching this regular expression
        #[arg(long, value_name = "RE")]
        filter: Option<String>,

        /// Body-size cutoff for extracted text, in KiB
        #[arg(long, value_name = "KIB")]
        maxsize: Option<usize>,

        /// Seconds to wait between recursive requests
        #[arg(long, value_name = "SECS")]
        rate_limit: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_ref())?;

    match cli.command {
        Command::Serve { bind, dry_run } => {
            if dry_run {
                handle_dry_run(&config);
                return Ok(());
            }
            handle_serve(config, bind).await
        }
        Command::Scrape {
            url,
            format,
            max_level,
            max_links,
            filter,
            maxsize,
            rate_limit,
        } => {
            let mut body = Map::new();
            body.insert("url".into(), json!(url));
            body.insert("max_level".into(), json!(max_level));
            if let Some(format) = format {
                body.insert("format".into(), json!(format.as_str()));
            }
            if let Some(max_links) = max_links {
                body.insert("max_recursion_links".into(), json!(max_links));
            }
            if let Some(filter) = filter {
                body.insert("link_exp_filter".into(), json!(filter));
            }
            if let Some(maxsize) = maxsize {
                body.insert("maxsize".into(), json!(maxsize));
            }
            if let Some(rate_limit) = rate_limit {
                body.insert("rate_limit".into(), json!(rate_limit));
            }
            handle_scrape(config, Value::Object(body)).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("page_harvest=info,warn"),
            1 => EnvFilter::new("page_harvest=debug,info"),
            2 => EnvFilter::new("page_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so scrape output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, or validated defaults when none is given
fn load(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::debug!("No configuration file given, using defaults");
        let config = Config::default();
        validate(&config).context("default configuration is invalid")?;
        return Ok(config);
    };

    tracing::info!("Loading configuration from: {}", path.display());
    match load_config_with_hash(path) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            Err(e.into())
        }
    }
}

/// Handles `serve --dry-run`: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Page-Harvest Dry Run ===\n");

    println!("Server:");
    println!("  Bind address: {}", config.server.bind_address);

    println!("\nUser Agent:");
    println!("  Header: {}", config.user_agent.header_value());

    println!("\nFetcher:");
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  Connect timeout: {}s", config.fetcher.connect_timeout_secs);
    println!("  Max redirects: {}", config.fetcher.max_redirects);

    println!("\nCrawl Defaults:");
    println!("  Max content size: {} KiB", config.crawl.max_content_size_kib);
    println!("  Max images: {}", config.crawl.max_images);
    println!(
        "  Request rate delay: {}ms",
        config.crawl.request_rate_delay_ms
    );
    println!("  Default format: {}", config.crawl.default_format);

    println!("\n✓ Configuration is valid");
}

/// Runs the HTTP service
async fn handle_serve(config: Config, bind: Option<SocketAddr>) -> anyhow::Result<()> {
    let addr = match bind {
        Some(addr) => addr,
        None => config
            .server
            .bind_address
            .parse()
            .with_context(|| format!("invalid bind address '{}'", config.server.bind_address))?,
    };

    let scraper = Scraper::new(config).context("failed to build HTTP client")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    server::serve(listener, scraper).await?;
    Ok(())
}

/// Scrapes one URL and writes the rendered body to stdout
async fn handle_scrape(config: Config, body: Value) -> anyhow::Result<()> {
    let request = ScrapeRequest::from_value(&body, &config.crawl)?;
    let scraper = Scraper::new(config).context("failed to build HTTP client")?;

    let rendered = match scraper.scrape(&request).await {
        Ok(rendered) => rendered,
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            return Err(e.into());
        }
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&rendered.body)?;
    if !rendered.body.ends_with(b"\n") {
        stdout.write_all(b"\n")?;
    }

    Ok(())
}
