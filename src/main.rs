//! Sumi-Trawl main entry point
//!
//! This is the command-line interface for the Sumi-Trawl listing harvester.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use sumi_trawl::config::{load_config_with_hash, Config};
use sumi_trawl::crawler::{trawl, DomainFilter, ScrapeKind, DOMAINS_ROOT};
use sumi_trawl::output::{find_batches, print_statistics, read_batches, OverwritePolicy, RunGuard};
use sumi_trawl::records::DomainListing;
use tracing_subscriber::EnvFilter;

/// Sumi-Trawl: a patient listing harvester
///
/// Sumi-Trawl collects the sites of a listing network, walks the paginated
/// job search of each site and visits every job it found. Output goes to
/// numbered CSV batches; a stage whose output already exists is only repeated
/// after confirmation.
#[derive(Parser, Debug)]
#[command(name = "sumi-trawl")]
#[command(version = "1.0.0")]
#[command(about = "A patient listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Scrape stage to run (repeatable, defaults to all stages in order)
    #[arg(short = 't', long = "type", value_enum)]
    types: Vec<KindArg>,

    /// Only scrape sites whose URL contains this text (repeatable)
    #[arg(long = "domain", value_name = "SUBSTRING", conflicts_with = "pick")]
    domains: Vec<String>,

    /// Choose one known site interactively before scraping jobs
    #[arg(long, conflicts_with = "no_input")]
    pick: bool,

    /// Repeat stages whose output already exists without asking
    #[arg(short, long, conflicts_with = "no_input")]
    yes: bool,

    /// Never prompt; stages whose output already exists are skipped
    #[arg(long)]
    no_input: bool,

    /// Validate config and show what would be scraped without scraping
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Domains,
    Jobs,
    Details,
}

impl From<KindArg> for ScrapeKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Domains => ScrapeKind::Domains,
            KindArg::Jobs => ScrapeKind::Jobs,
            KindArg::Details => ScrapeKind::Details,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(anyhow::Error::new(e).context("could not load configuration"));
        }
    };
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let kinds: Vec<ScrapeKind> = if cli.types.is_empty() {
        ScrapeKind::all().to_vec()
    } else {
        cli.types.iter().copied().map(ScrapeKind::from).collect()
    };

    if cli.dry_run {
        handle_dry_run(&config, &kinds);
        return Ok(());
    }

    let filter = if cli.pick {
        pick_domain(Path::new(&config.output.csv_dir))?
    } else if cli.domains.is_empty() {
        DomainFilter::All
    } else {
        DomainFilter::Matching(cli.domains.clone())
    };

    let guard = if cli.yes {
        RunGuard::new(OverwritePolicy::Approve)
    } else if cli.no_input {
        RunGuard::new(OverwritePolicy::Decline)
    } else {
        RunGuard::interactive()
    };

    // Dropping the trawl future on Ctrl-C drops the open writer, which flushes
    // its buffered records before the process exits.
    let stats = tokio::select! {
        result = trawl(&config, guard, filter, &kinds) => {
            result.context("trawl could not start")?
        }
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::warn!("Received interrupt, buffered records were saved");
            anyhow::bail!("trawl interrupted");
        }
    };

    if !cli.quiet {
        println!();
        print_statistics(&stats);
    }

    if stats.has_failures() {
        tracing::warn!("Trawl finished with failures");
    } else {
        tracing::info!("Trawl completed successfully");
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_trawl=info,warn"),
            1 => EnvFilter::new("sumi_trawl=debug,info"),
            2 => EnvFilter::new("sumi_trawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the configuration and planned stages
fn handle_dry_run(config: &Config, kinds: &[ScrapeKind]) {
    println!("=== Sumi-Trawl Dry Run ===\n");

    println!("Scraper Configuration:");
    println!("  Page size: {}", config.scraper.page_size);
    println!(
        "  Retries: {} attempts, {}s apart",
        config.scraper.retry_attempts, config.scraper.retry_delay
    );
    println!("  Throttle delay: {}s", config.scraper.throttle_delay);
    println!("  Request timeout: {}s", config.scraper.request_timeout);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nSource:");
    println!("  Sites index: {}", config.source.sites_url);
    println!("  Search path: {}", config.source.search_path);
    println!("  Offset parameter: {}", config.source.offset_param);
    for (name, value) in &config.source.search_params {
        println!("    * {}={}", name, value);
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.csv_dir);
    println!("  Rows per file: {}", config.output.rows_per_file);

    let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
    println!("\n✓ Configuration is valid");
    println!("✓ Would run stages: {}", names.join(", "));
}

/// Handles --pick: lets the operator choose one site from earlier domain batches
fn pick_domain(csv_dir: &Path) -> anyhow::Result<DomainFilter> {
    let files = find_batches(csv_dir, DOMAINS_ROOT)?;
    let domains: Vec<DomainListing> = read_batches(&files)?;
    if domains.is_empty() {
        anyhow::bail!(
            "no sites known yet, run the domains stage first (looked in {})",
            csv_dir.display()
        );
    }

    let items: Vec<String> = domains
        .iter()
        .map(|d| format!("{} ({})", d.city, d.url))
        .collect();
    let chosen = dialoguer::Select::new()
        .with_prompt("Which site should be scraped?")
        .items(&items)
        .default(0)
        .interact()
        .context("site selection was interrupted")?;

    tracing::info!("Scraping only {}", domains[chosen].url);
    Ok(DomainFilter::Matching(vec![domains[chosen].url.clone()]))
}
