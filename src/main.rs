use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use review_harvester::extraction::default_scrapers;
use review_harvester::infrastructure::config::{AppConfig, DEFAULT_CONFIG_PATH};
use review_harvester::infrastructure::{logging, HttpClient, RateLimiter, ReviewRepository};
use review_harvester::orchestrator::{OrchestratorConfig, ScrapeOrchestrator};

#[derive(Parser)]
#[command(name = "review-harvester", version, about = "Collect customer reviews from supported retail sites")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape product URLs (from --url or the configured target list).
    Scrape {
        /// Product URL; repeatable.
        #[arg(short, long = "url")]
        urls: Vec<String>,
    },
    /// Print stored-review statistics.
    Stats,
    /// Export all stored reviews as JSON.
    Export {
        /// Output file; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a sample configuration file.
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // init-config runs before logging so it works with no config present.
    if let Command::InitConfig = cli.command {
        let config = AppConfig::sample();
        config.save(&cli.config).await?;
        println!("wrote sample configuration to {}", cli.config.display());
        return Ok(());
    }

    let config = AppConfig::load(&cli.config).await?;
    logging::init(&config.logging)?;

    match cli.command {
        Command::Scrape { urls } => run_scrape(&config, urls).await,
        Command::Stats => run_stats(&config).await,
        Command::Export { output } => run_export(&config, output).await,
        Command::InitConfig => Ok(()),
    }
}

async fn run_scrape(config: &AppConfig, urls: Vec<String>) -> Result<()> {
    let urls = if urls.is_empty() {
        config.target_products.clone()
    } else {
        urls
    };
    if urls.is_empty() {
        bail!("no URLs given and no target_products configured");
    }

    let repository = ReviewRepository::connect(&config.database.path).await?;
    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit.max_requests,
        Duration::from_secs(config.rate_limit.time_window_secs),
    ));
    let client = HttpClient::new(&config.fetch, rate_limiter)?;

    let orchestrator = ScrapeOrchestrator::new(
        Arc::new(client),
        Arc::new(repository),
        default_scrapers(),
        OrchestratorConfig {
            batch_size: config.scraping.batch_size,
            concurrent_limit: config.scraping.concurrent_limit,
        },
    );

    let summary = orchestrator.scrape_all(&urls).await;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if summary.errors > 0 && summary.errors as usize == summary.results.len() {
        bail!("every URL failed");
    }
    Ok(())
}

async fn run_stats(config: &AppConfig) -> Result<()> {
    let repository = ReviewRepository::connect(&config.database.path).await?;
    let stats = repository.statistics().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

async fn run_export(config: &AppConfig, output: Option<PathBuf>) -> Result<()> {
    let repository = ReviewRepository::connect(&config.database.path).await?;
    let json = repository.export_json().await?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, &json)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "exported reviews");
        }
        None => println!("{json}"),
    }
    Ok(())
}
