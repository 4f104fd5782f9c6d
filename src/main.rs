//! # stdcheck CLI
//!
//! The `stdcheck` binary drives the standards-review pipeline. It provides
//! commands for database initialization, job submission, report retrieval,
//! tabular export, and running the background consumer worker.
//!
//! ## Usage
//!
//! ```bash
//! stdcheck --config ./config/stdcheck.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `stdcheck init` | Create the SQLite database and run schema migrations |
//! | `stdcheck rules` | Print the active rule set |
//! | `stdcheck submit <path>` | Fingerprint a file or directory, check the cache, enqueue |
//! | `stdcheck report <fingerprint>` | Fetch a finished report as JSON |
//! | `stdcheck export <fingerprint>` | Write a report as a CSV artifact |
//! | `stdcheck worker` | Run the queue consumer until interrupted |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stdcheck::analyzer::{self, AnalysisBackend};
use stdcheck::config::load_config;
use stdcheck::consumer;
use stdcheck::export;
use stdcheck::migrate;
use stdcheck::rules;
use stdcheck::submit::{self, SubmitOutcome};
use stdcheck::{db, queue};

/// stdcheck — an asynchronous, LLM-backed coding-standards review pipeline.
#[derive(Parser)]
#[command(
    name = "stdcheck",
    about = "An asynchronous, LLM-backed coding-standards review pipeline",
    version,
    long_about = "stdcheck reviews source files against a configurable coding-standards \
    rule set using an external LLM backend. Submissions are deduplicated by content \
    fingerprint, queued durably, analyzed chunk by chunk in a background worker, and \
    collated into cached reports."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/stdcheck.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the report cache and job queue tables. Idempotent.
    Init,

    /// Print the active rule set.
    Rules,

    /// Submit a file or directory for review.
    ///
    /// Computes the content fingerprint and checks the report cache first:
    /// a hit prints the stored report without enqueuing anything.
    Submit {
        /// File or directory to review.
        path: PathBuf,
    },

    /// Fetch a finished report by content fingerprint.
    Report {
        /// Fingerprint returned by `submit`.
        fingerprint: String,
    },

    /// Export a finished report as a CSV artifact.
    Export {
        /// Fingerprint returned by `submit`.
        fingerprint: String,

        /// Output file; defaults to `<results_dir>/<base>_result.csv`.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run the queue consumer worker until interrupted.
    Worker,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&config.db.path).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized at {}", config.db.path.display());
        }

        Commands::Rules => {
            for rule in rules::active_rules(&config.rules) {
                println!("{}", rule);
            }
        }

        Commands::Submit { path } => {
            let pool = db::connect(&config.db.path).await?;
            queue::declare(&pool).await?;

            match submit::submit(&pool, &config.queue.name, &path).await? {
                SubmitOutcome::Cached(report) => {
                    println!("report already available");
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                SubmitOutcome::Enqueued(fingerprint) => {
                    println!("accepted, check later");
                    println!("  fingerprint: {}", fingerprint);
                }
                SubmitOutcome::Unidentified => {
                    println!("accepted, check later");
                    println!("  fingerprint: unavailable (content could not be read)");
                }
            }
            pool.close().await;
        }

        Commands::Report { fingerprint } => {
            let pool = db::connect(&config.db.path).await?;
            let report = submit::check_report(&pool, &fingerprint).await?;
            pool.close().await;

            match report {
                Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                None => anyhow::bail!("report not yet available"),
            }
        }

        Commands::Export {
            fingerprint,
            output,
        } => {
            export::run_export(&config, &fingerprint, output.as_deref()).await?;
        }

        Commands::Worker => {
            let backend: Arc<dyn AnalysisBackend> =
                analyzer::create_backend(&config.analyzer)?.into();
            let handle = consumer::spawn(config, backend)?;

            tokio::signal::ctrl_c().await?;
            info!("interrupt received, shutting down worker");
            handle.shutdown().await;
        }
    }

    Ok(())
}
