//! PlainSight command-line scanner
//!
//! Scans a page for its privacy policy and cookie consent setup and prints
//! what the analyzer services make of them.

mod snapshot;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use plainsight_config::PlainsightConfig;
use plainsight_extract::{ContentExtractor, ExtractorConfig, HttpFetcher};
use plainsight_scan::{
    render_state, AnalyzerClient, AnalyzerConfig, EvidenceCollector, Pipeline, ScanState,
};
use snapshot::PageSnapshot;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "plainsight")]
#[command(version, about = "Find and analyze a site's privacy policy and cookies")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a page and analyze its policy and cookies
    Scan {
        /// Page to scan
        url: String,

        /// Print the final state as JSON
        #[arg(long)]
        json: bool,

        /// Analyzer base URL (overrides config and environment)
        #[arg(long)]
        analyzer_url: Option<String>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Retries for transient analyzer failures
        #[arg(long)]
        retries: Option<u32>,
    },

    /// Open the results dashboard in the browser
    Dashboard {
        /// Dashboard URL (overrides config and environment)
        #[arg(long)]
        url: Option<String>,
    },

    /// Show the active configuration
    Config {
        /// Write the defaults to the config file if it does not exist
        #[arg(long)]
        init: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn extractor_config(config: &PlainsightConfig) -> ExtractorConfig {
    ExtractorConfig::default()
        .with_max_length(config.max_document_bytes)
        .with_timeout(config.request_timeout_secs)
        .with_user_agent(config.user_agent.clone())
        .with_redirects(config.follow_redirects, config.max_redirects)
}

async fn scan(config: PlainsightConfig, url: &str, json: bool) -> Result<ExitCode> {
    // A page that fails to load is reported through the scan as a page-access failure
    let page = Arc::new(PageSnapshot::capture(url, &config).await);

    let fetcher = Arc::new(HttpFetcher::new(extractor_config(&config))?);
    let extractor = Arc::new(ContentExtractor::new(fetcher));
    let analyzer = AnalyzerClient::new(AnalyzerConfig::from(&config))?;
    let evidence = EvidenceCollector::new(page.clone(), page.clone());
    let pipeline = Pipeline::new(page, evidence, extractor, analyzer);

    let mut updates = pipeline.board().subscribe();
    let progress = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let update = updates.borrow_and_update().clone();
            if !update.state.is_terminal() {
                info!(flow = %update.flow, "{}", render_state(&update.state));
            }
        }
    });

    let update = pipeline.run().await;
    // Dropping the pipeline closes the board, which ends the progress task
    drop(pipeline);
    let _ = progress.await;

    if json {
        println!("{}", serde_json::to_string_pretty(&update)?);
    } else {
        println!("{}", render_state(&update.state));
    }

    Ok(match &update.state {
        ScanState::Failed { failure } if !failure.is_no_op() => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

fn dashboard(config: &PlainsightConfig, url: Option<String>) -> Result<()> {
    let url = url.unwrap_or_else(|| config.dashboard_url.clone());
    info!(%url, "opening dashboard");
    open::that(&url).with_context(|| format!("failed to open {}", url))?;
    Ok(())
}

fn show_config(config: &PlainsightConfig, init: bool) -> Result<()> {
    let path = config.config_path();
    if init {
        if path.exists() {
            info!(path = %path.display(), "config file already exists");
        } else {
            PlainsightConfig::default().save()?;
            info!(path = %path.display(), "wrote default config");
        }
    }

    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = PlainsightConfig::load().context("failed to load configuration")?;
    debug!(?config, "loaded configuration");

    match cli.command {
        Command::Scan {
            url,
            json,
            analyzer_url,
            timeout,
            retries,
        } => {
            let mut config = config;
            if let Some(analyzer_url) = analyzer_url {
                config = config.with_analyzer_url(analyzer_url);
            }
            if let Some(timeout) = timeout {
                config = config.with_timeout(timeout);
            }
            if let Some(retries) = retries {
                config = config.with_max_retries(retries);
            }
            scan(config, &url, json).await
        }
        Command::Dashboard { url } => dashboard(&config, url).map(|_| ExitCode::SUCCESS),
        Command::Config { init } => show_config(&config, init).map(|_| ExitCode::SUCCESS),
    }
}
