use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recap_core::ToolRegistry;
use recap_providers::AnthropicProvider;
use recap_scrape::{CdpConfig, CdpLauncher, EpisodeScraper, Scraped, SessionManager};
use recap_tools::SummarizeEpisodeTool;

mod config;

use config::Config;

/// Log level for tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "recap")]
#[command(version, about = "Summarize a TV episode's plot from the season wiki", long_about = None)]
struct Cli {
    /// Episode number or title, matched exactly against the episode table
    episode: String,

    /// Print the extracted plot text without calling the model
    #[arg(long)]
    raw: bool,

    /// Model to use (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL for the API (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// API key (overrides config and $ANTHROPIC_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Index page with the episode table (overrides config)
    #[arg(long)]
    index_url: Option<String>,

    /// Config file path (default: ~/.config/recap/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter()));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = Config::load(cli.config.as_ref())?;
    debug!(headless = config.browser.headless, "configuration loaded");

    let launcher = Arc::new(CdpLauncher::new(CdpConfig {
        headless: config.browser.headless,
        executable: config.browser.executable.clone(),
        no_sandbox: config.browser.no_sandbox,
        ..Default::default()
    }));
    let sessions = Arc::new(SessionManager::new(launcher, config.session_ttl()));
    let scraper = EpisodeScraper::new(
        sessions.clone(),
        config.scrape_config(cli.index_url.as_deref()),
    );

    let exit_code = if cli.raw {
        run_raw(&scraper, &cli.episode).await
    } else {
        run_summary(&cli, &config, scraper).await?
    };

    // Best-effort: don't leave a chromium process behind.
    sessions.release().await;
    info!("done");

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

/// Scrape only; print the extracted plot text.
async fn run_raw(scraper: &EpisodeScraper, episode: &str) -> i32 {
    match scraper.fetch_plot(episode).await {
        Ok(Scraped::Found(text)) => {
            println!("{text}");
            0
        }
        Ok(Scraped::NotFound) => {
            println!("Couldn't find a plot summary for episode \"{episode}\".");
            0
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}

/// Full pipeline: scrape, summarize, print.
async fn run_summary(cli: &Cli, config: &Config, scraper: EpisodeScraper) -> Result<i32> {
    let api_key = config.api_key(cli.api_key.as_deref())?;

    let mut provider = AnthropicProvider::new(api_key);
    if let Some(base_url) = cli.base_url.as_deref().or(config.provider.base_url.as_deref()) {
        provider = provider.with_base_url(base_url);
    }
    if let Some(model) = &config.provider.model {
        provider = provider.with_default_model(model.clone());
    }

    let mut tool = SummarizeEpisodeTool::new(scraper, Arc::new(provider));
    if let Some(model) = &cli.model {
        tool = tool.with_model(model.clone());
    }

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(tool));
    for definition in registry.definitions() {
        debug!(tool = %definition.name, "registered tool");
    }
    let tool = registry
        .get("summarize_episode")
        .ok_or_else(|| anyhow::anyhow!("tool not registered"))?;

    let output = tool
        .execute(serde_json::json!({ "episode": cli.episode }))
        .await
        .map_err(|e| anyhow::anyhow!("tool invocation failed: {e}"))?;

    println!("{}", output.content);
    Ok(if output.is_error { 1 } else { 0 })
}
