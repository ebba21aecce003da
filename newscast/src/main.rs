/*
newscast - main.rs
This binary loads configuration, selects the AI provider once and starts the Rocket HTTP server.
*/

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use common::Config;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use newscast::ingestion::RssFeedSource;
use newscast::llm::{self, AiService};
use newscast::processing::BatchOptions;
use newscast::server::{launch_rocket, AppState};

#[derive(Parser, Debug)]
#[command(name = "newscast", about = "News summarization and voice assistant API")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // API keys usually live in a local .env during development
    if let Ok(path) = dotenvy::dotenv() {
        info!(path = ?path, "loaded environment file");
    }

    let config = load_config(args.config).await?;

    // Provider selection happens exactly once; handlers only ever see this instance
    let provider_name = config.provider_name();
    let provider = llm::build_provider(&config.ai, &provider_name, |name| std::env::var(name).ok());
    let ai = Arc::new(AiService::new(provider));

    let feed = RssFeedSource::new(
        config.feed_url(),
        config.feed.fetch_timeout_seconds.unwrap_or(10),
    )
    .context("failed to build feed client")?;
    info!(url = %feed.url(), limit = config.feed_limit(), "feed source configured");

    let state = AppState::new(
        ai,
        Arc::new(feed),
        config.feed_limit(),
        BatchOptions::from(&config.pipeline),
    );

    info!("Launching Rocket HTTP server");
    if let Err(e) = launch_rocket(state, &config).await {
        error!(%e, "Rocket server failed");
        return Err(e);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Resolve config paths: `config.default.toml`, then `--config` or `config.toml`,
/// then environment overrides.
async fn load_config(explicit: Option<PathBuf>) -> anyhow::Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = explicit {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    let mut config = Config::load_with_defaults(Some(&default_path), override_path.as_deref())
        .await
        .context("failed to load configuration")?;
    config.apply_env_overrides(|name| std::env::var(name).ok());

    info!(
        default_file = ?default_path,
        override_file = ?override_path,
        provider = %config.provider_name(),
        "configuration loaded"
    );
    Ok(config)
}
