use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use serde::Serialize;
use tokio::signal;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mangawatch_core::{
    build_registry, load_config, CallContext, Config, Connector, ConnectorError,
    ConnectorRegistry, MangaResult,
};

/// Latest-chapter lookups across manga and webtoon sites.
///
/// Configuration is read from `--config`, `$MANGAWATCH_CONFIG` or
/// `./mangawatch.toml`, with `MANGAWATCH_*` environment overrides.
#[derive(Debug, Parser)]
#[command(name = "mangawatch", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overall deadline for the command, in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List registered connectors.
    List,

    /// Health-check every connector.
    Health,

    /// Search one connector, or all of them.
    Search {
        /// Connector key, or `all`.
        key: String,

        /// Title to look for.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Maximum results per connector (0 uses the default).
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },

    /// Resolve a series page URL.
    Resolve {
        url: String,

        /// Only ask this connector instead of the first one owning the host.
        #[arg(long)]
        connector: Option<String>,
    },

    /// Resolve the URL of one chapter.
    Chapter {
        key: String,
        url: String,
        number: f64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Logs go to stderr; stdout carries the JSON output.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load(cli.config)?;
    let registry = build_registry(&config).context("Failed to build connector registry")?;

    let (mut ctx, cancel) = CallContext::cancellable();
    if let Some(secs) = cli.timeout {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            cancel.cancel();
        }
    });

    match cli.command {
        Commands::List => print_json(&registry.descriptors()),
        Commands::Health => print_json(&registry.health(&ctx).await),
        Commands::Search { key, query, limit } => {
            search(&registry, &ctx, &key, &query.join(" "), limit).await
        }
        Commands::Resolve { url, connector } => {
            resolve(&registry, &ctx, &url, connector.as_deref()).await
        }
        Commands::Chapter { key, url, number } => chapter(&registry, &ctx, &key, &url, number).await,
    }
}

fn load(explicit: Option<PathBuf>) -> Result<Config> {
    let config_path = explicit
        .or_else(|| std::env::var("MANGAWATCH_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("mangawatch.toml"));

    if config_path.exists() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))
    } else {
        debug!("No configuration at {:?}, using defaults", config_path);
        Ok(Config::default())
    }
}

fn connector(registry: &ConnectorRegistry, key: &str) -> Result<Arc<dyn Connector>> {
    registry
        .get(key)
        .ok_or_else(|| anyhow!("Unknown connector {:?} (known: {})", key, registry.keys().join(", ")))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct SourceResults {
    source: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    results: Vec<MangaResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn search(
    registry: &ConnectorRegistry,
    ctx: &CallContext,
    key: &str,
    query: &str,
    limit: usize,
) -> Result<()> {
    if key != "all" {
        let results = connector(registry, key)?
            .search_by_title(ctx, query, limit)
            .await?;
        return print_json(&results);
    }

    let connectors = registry.connectors();
    let searches = connectors.iter().map(|c| async move {
        match c.search_by_title(ctx, query, limit).await {
            Ok(results) => SourceResults {
                source: c.key().to_string(),
                results,
                error: None,
            },
            Err(e) => SourceResults {
                source: c.key().to_string(),
                results: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    });
    print_json(&join_all(searches).await)
}

async fn resolve(
    registry: &ConnectorRegistry,
    ctx: &CallContext,
    url: &str,
    only: Option<&str>,
) -> Result<()> {
    if let Some(key) = only {
        return print_json(&connector(registry, key)?.resolve_by_url(ctx, url).await?);
    }

    // The first connector that owns the host answers.
    for c in registry.connectors() {
        match c.resolve_by_url(ctx, url).await {
            Err(ConnectorError::HostMismatch { .. }) => continue,
            Ok(result) => return print_json(&result),
            Err(e) => return Err(anyhow!("{}: {}", c.key(), e)),
        }
    }
    bail!("No connector accepts {}", url)
}

async fn chapter(
    registry: &ConnectorRegistry,
    ctx: &CallContext,
    key: &str,
    url: &str,
    number: f64,
) -> Result<()> {
    let c = connector(registry, key)?;
    if !c.supports_chapter_urls() {
        bail!("{} does not resolve chapter URLs", c.key());
    }
    let href = c.resolve_chapter_url(ctx, url, number).await?;
    print_json(&serde_json::json!({ "source": c.key(), "chapter": number, "url": href }))
}
