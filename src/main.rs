//! listing-pipeline - Typed item pipeline for scraped listings
//!
//! Ingests crawler feeds into a deduplicated SQLite store.

use anyhow::Result;
use clap::{Parser, Subcommand};
use listing_pipeline::commands::{CheckCommand, CountCommand, IngestCommand, KindsCommand};
use listing_pipeline::config::{Config, OutputFormat};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "listing-pipeline",
    version,
    about = "Typed item pipeline for scraped listings",
    long_about = "Resolves, normalizes, validates and persists items from crawler feed.json files."
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true, env = "LISTING_DATABASE")]
    database: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Items processed concurrently
    #[arg(short, long, global = true, env = "LISTING_JOBS")]
    jobs: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run feeds through the pipeline and persist the results
    #[command(alias = "i")]
    Ingest {
        /// Feed files or crawl directories (searched for feed.json)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Discriminator hint for items without one (default: from *_lst / *_src dirs)
        #[arg(short, long)]
        kind: Option<String>,

        /// Validate and report without writing to the database
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate feeds without persisting
    Check {
        /// Feed files or crawl directories (searched for feed.json)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Discriminator hint for items without one
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// List registered entity kinds
    Kinds,

    /// Count stored entities
    Count {
        /// Only count this kind
        #[arg(short, long)]
        kind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    config.format = cli.format;
    if let Some(database) = cli.database {
        config.database = database;
    }
    if let Some(jobs) = cli.jobs {
        config.jobs = jobs;
    }

    let output = match cli.command {
        Commands::Ingest { paths, kind, dry_run } => {
            IngestCommand::new(config).execute(&paths, kind.as_deref(), dry_run).await?
        }
        Commands::Check { paths, kind } => {
            CheckCommand::new(config).execute(&paths, kind.as_deref())?
        }
        Commands::Kinds => KindsCommand::new(config).execute()?,
        Commands::Count { kind } => CountCommand::new(config).execute(kind.as_deref()).await?,
    };

    println!("{}", output);

    Ok(())
}
