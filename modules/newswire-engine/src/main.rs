use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use newswire_common::{Config, RawNewsItem};
use newswire_engine::{deep_merge, run_grouper, run_pass, ClaudeJudge};
use newswire_store::Database;

#[derive(Parser)]
#[command(name = "newswire", about = "News deduplication and story clustering engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full pass over a batch of fetched items (JSON array file)
    Ingest {
        /// Path to a JSON file containing an array of fetched news items
        file: PathBuf,
    },

    /// Rebuild story clusters over the full corpus
    Group,

    /// Scan the corpus for dead-zone pairs and merge adjudicated matches
    DeepMerge,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    let store = Database::connect(&config.database_url).await?;
    let judge = ClaudeJudge::new(&config.anthropic_api_key, &config.model);

    match cli.command {
        Commands::Ingest { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let candidates: Vec<RawNewsItem> = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {}", file.display()))?;

            let stats = run_pass(&store, &judge, &config, candidates).await?;
            info!(
                fetched = stats.fetched,
                stored = stats.stored,
                groups = stats.groups,
                "Ingest complete"
            );
        }
        Commands::Group => {
            let groups = run_grouper(&store, config.group_threshold).await?;
            info!(groups, "Grouping complete");
        }
        Commands::DeepMerge => {
            let merged = deep_merge(
                &store,
                &judge,
                config.fuzzy_low,
                config.fuzzy_high,
                config.adjudication_batch_size,
            )
            .await?;
            info!(merged, "Deep merge complete");
        }
    }

    Ok(())
}
