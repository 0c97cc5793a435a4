mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reelscan_core::ai::{AiCache, AiConfig, GeminiClient};
use reelscan_core::{load_image, RetryPolicy, Session, SessionState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "reelscan")]
#[command(about = "Identify a movie from a still frame", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify the movie shown in an image
    Identify {
        /// Path to a JPEG, PNG or WebP image
        image: PathBuf,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
        /// Attempts per request (overrides REELSCAN_MAX_ATTEMPTS)
        #[arg(long)]
        max_attempts: Option<u32>,
        /// First backoff delay in milliseconds (overrides REELSCAN_BASE_DELAY_MS)
        #[arg(long)]
        base_delay_ms: Option<u64>,
        /// Skip the response cache
        #[arg(long)]
        no_cache: bool,
        /// Answer from the cache only
        #[arg(long, conflicts_with = "no_cache")]
        offline: bool,
    },
    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show how many responses are cached
    Stats,
    /// Delete every cached response
    Clear,
}

struct IdentifyArgs {
    image: PathBuf,
    json: bool,
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    no_cache: bool,
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Identify {
            image,
            json,
            max_attempts,
            base_delay_ms,
            no_cache,
            offline,
        } => {
            identify(IdentifyArgs {
                image,
                json,
                max_attempts,
                base_delay_ms,
                no_cache,
                offline,
            })
            .await
        }
        Commands::Cache { action } => {
            cache(action)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn identify(args: IdentifyArgs) -> Result<ExitCode> {
    let mut config = AiConfig::from_lookup(env_lookup(args.offline))?;
    apply_overrides(&mut config, &args);
    tracing::debug!(?config, "Resolved configuration");

    let data = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read {}", args.image.display()))?;
    let image = load_image(data, file_name(&args.image))
        .with_context(|| format!("Cannot use {}", args.image.display()))?;

    let client = GeminiClient::new(&config)?;
    let mut session = Session::new(Arc::new(client));

    let mut updates = session.subscribe();
    let quiet = args.json;
    let progress = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let busy = updates.borrow_and_update().is_busy();
            if busy && !quiet {
                eprintln!("Identifying...");
            }
        }
    });

    session.select(image)?;
    let state = session.submit().await?;
    progress.abort();

    match state {
        SessionState::Succeeded { outcome } => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print!("{}", output::render_outcome(&outcome));
            }
            Ok(ExitCode::SUCCESS)
        }
        SessionState::Failed { message } => {
            if args.json {
                println!("{}", serde_json::json!({ "error": message }));
            } else {
                eprintln!("{}", message);
            }
            Ok(ExitCode::FAILURE)
        }
        other => anyhow::bail!("Unexpected session state after submit: {}", other.name()),
    }
}

fn apply_overrides(config: &mut AiConfig, args: &IdentifyArgs) {
    if args.max_attempts.is_some() || args.base_delay_ms.is_some() {
        let max_attempts = args.max_attempts.unwrap_or(config.retry.max_attempts);
        let base_delay = args
            .base_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(config.retry.base_delay);
        config.retry = RetryPolicy::new(max_attempts, base_delay)
            .with_retry_rejected(config.retry.retry_rejected);
    }
    if args.no_cache {
        config.cache_dir = None;
    }
    if args.offline {
        config.offline = true;
    }
}

/// Environment lookup, with `--offline` standing in for `REELSCAN_AI_OFFLINE`
/// so the API key becomes optional.
fn env_lookup(offline: bool) -> impl Fn(&str) -> Option<String> {
    overlay_offline(offline, |name: &str| std::env::var(name).ok())
}

fn overlay_offline<F>(offline: bool, lookup: F) -> impl Fn(&str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    move |name: &str| {
        if offline && name == "REELSCAN_AI_OFFLINE" {
            Some("true".to_string())
        } else {
            lookup(name)
        }
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

fn cache(action: CacheAction) -> Result<()> {
    let Some(dir) = AiConfig::cache_dir_from_env() else {
        println!("Response cache is disabled (REELSCAN_AI_CACHE_DIR=none)");
        return Ok(());
    };
    let cache = AiCache::new(dir);
    tracing::debug!(dir = %cache.dir().display(), "Using response cache");

    match action {
        CacheAction::Stats => {
            let stats = cache.stats();
            println!(
                "{} cached responses in {}",
                stats.cached_responses,
                cache.dir().display()
            );
        }
        CacheAction::Clear => {
            cache
                .clear()
                .with_context(|| format!("Failed to clear {}", cache.dir().display()))?;
            println!("Cleared {}", cache.dir().display());
        }
    }

    Ok(())
}
