use anyhow::Result;
use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use siphon::commands;
use siphon::models::IngestionOptions;

#[derive(Parser)]
#[command(
    name = "siphon",
    version,
    about = "Newsletter feed archiver: ingests RSS/Atom feeds into a Markdown library",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch configured feeds and archive new articles
    Ingest {
        /// Sources file (TOML)
        #[arg(short, long, default_value = "sources.toml")]
        sources: PathBuf,

        /// Library root directory
        #[arg(short, long, default_value = "./library")]
        library: PathBuf,

        /// Ingest only the source with this slug
        #[arg(long)]
        source: Option<String>,

        /// Minimum delay between feed fetches, in milliseconds
        #[arg(long, default_value = "1000")]
        delay_ms: u64,

        /// Per-attempt HTTP timeout, in seconds
        #[arg(long, default_value = "30")]
        timeout_secs: u64,

        /// Fetch attempts per feed before giving up
        #[arg(long, default_value = "3")]
        max_attempts: u32,

        /// Convert articles without writing anything
        #[arg(long, default_value = "false")]
        dry_run: bool,

        /// Skip items published before this date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,

        /// Inspect at most this many items per publication
        #[arg(long)]
        max_articles: Option<usize>,

        /// Also mirror stored articles into this SQLite index
        #[arg(long)]
        index_db: Option<PathBuf>,

        /// Print the batch report as JSON instead of text
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// List stored publications, or one publication's articles
    List {
        /// Library root directory
        #[arg(short, long, default_value = "./library")]
        library: PathBuf,

        /// Publication slug to list
        publication: Option<String>,
    },

    /// Show aggregate library statistics
    Stats {
        /// Library root directory
        #[arg(short, long, default_value = "./library")]
        library: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    match cli.command {
        Commands::Ingest {
            sources,
            library,
            source,
            delay_ms,
            timeout_secs,
            max_attempts,
            dry_run,
            since,
            max_articles,
            index_db,
            json,
        } => {
            let since = since.as_deref().map(parse_since).transpose()?;
            let options = IngestionOptions {
                library_root: library,
                delay: Duration::from_millis(delay_ms),
                timeout: Duration::from_secs(timeout_secs),
                max_attempts,
                dry_run,
                verbose: cli.verbose,
                since,
                max_articles,
                index_db,
            };

            tracing::info!(
                sources = %sources.display(),
                library = %options.library_root.display(),
                dry_run = options.dry_run,
                "Starting ingestion"
            );

            let format = if json {
                commands::ReportFormat::Json
            } else {
                commands::ReportFormat::Text
            };
            let all_succeeded =
                commands::ingest(&sources, source.as_deref(), options, format).await?;
            if !all_succeeded {
                std::process::exit(1);
            }
        }

        Commands::List {
            library,
            publication,
        } => {
            commands::list(&library, publication.as_deref())?;
        }

        Commands::Stats { library } => {
            commands::stats(&library)?;
        }
    }

    Ok(())
}

/// Parse a `--since` date as midnight UTC
fn parse_since(raw: &str) -> Result<chrono::DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("Invalid --since date {raw:?} (expected YYYY-MM-DD): {e}"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid --since date {raw:?}"))?;
    Ok(Utc.from_utc_datetime(&midnight))
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("siphon=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("siphon=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}
