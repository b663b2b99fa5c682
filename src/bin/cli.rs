//! CLI binary for litfuse.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use litfuse::{AppConfig, search_fixtures};
use tracing_subscriber::EnvFilter;

/// litfuse: federated medical literature search.
#[derive(Parser)]
#[command(name = "litfuse", version, about)]
struct Cli {
    /// Path to TOML configuration file. Defaults to
    /// `~/.config/litfuse/config.toml` when that file exists.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Run one query and print the report as JSON.
    Search {
        /// The research question.
        #[arg(short, long)]
        query: String,

        /// Number of results wanted. Defaults to the configured count.
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Directory of `<source>.json` fixture files to query.
        #[arg(short, long)]
        fixtures: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML.
    Config {
        /// Write it to the config path instead of printing it.
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("litfuse=info,litfuse_core=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            let path = AppConfig::default_config_path();
            AppConfig::load_or_default(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))?
        }
    };

    match cli.command {
        Command::Search {
            query,
            count,
            fixtures,
        } => run_search(config, &query, count, fixtures).await,
        Command::Config { write: false } => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Command::Config { write: true } => {
            let path = cli.config.unwrap_or_else(AppConfig::default_config_path);
            config
                .save_to_file(&path)
                .with_context(|| format!("failed to write config to {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote config");
            Ok(())
        }
    }
}

async fn run_search(
    config: AppConfig,
    query: &str,
    count: Option<usize>,
    fixtures: Option<PathBuf>,
) -> anyhow::Result<()> {
    let dir = fixtures
        .or_else(|| config.fixtures.dir.clone())
        .context("no fixture directory: pass --fixtures or set [fixtures] dir in the config")?;
    let count = count.unwrap_or(config.default_target_count);

    let report = search_fixtures(&config, &dir, query, count).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
