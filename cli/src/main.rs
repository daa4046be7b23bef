//! `sentinel`: ask the security assistant from a terminal.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sentinel_cli::commands::{self, ProviderKey, Runtime};
use sentinel_core::SentinelConfig;
use sentinel_store::SqliteStore;

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(about = "Security assistant that keeps answering offline", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Never touch the network; every question is answered locally and queued
    #[arg(long, global = true)]
    offline: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the configuration file and create the database
    Init {
        /// Directory for the database and learned knowledge
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Name the assistant addresses you by
        #[arg(long)]
        user_name: Option<String>,
    },

    /// Ask one question
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Chat interactively
    Chat,

    /// Re-ask questions that were answered offline
    Reconcile,

    /// Show connectivity, providers and the queue
    Status,

    /// Show recent chat messages
    History {
        /// Session to show; defaults to the configured one
        #[arg(long)]
        session: Option<String>,

        /// Number of messages
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show questions waiting for an online answer
    Pending {
        /// Number of questions
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show recent device scans
    Scans {
        /// Number of scans
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Store an API key for an online provider
    SetKey {
        /// Provider the key belongs to
        #[arg(value_enum)]
        provider: ProviderKey,

        /// The secret
        secret: String,
    },

    /// Set minutes between scheduled scans (0 disables them)
    SetScanInterval {
        /// Minutes; values under 5 are raised to 5
        minutes: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    sentinel_cli::init_tracing(&cli.log);

    let config_path = cli.config.unwrap_or_else(SentinelConfig::default_path);
    let config = SentinelConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    match cli.command {
        Commands::Init {
            data_dir,
            user_name,
        } => {
            let mut config = config;
            if let Some(dir) = data_dir {
                config = config.with_data_dir(dir);
            }
            if let Some(name) = user_name {
                config = config.with_user_name(name);
            }
            commands::init(&config_path, &config)
        }
        Commands::Ask { question } => {
            let mut runtime = Runtime::start(config, cli.offline).await?;
            let result = commands::ask(&mut runtime, &question.join(" ")).await;
            runtime.stop().await;
            result
        }
        Commands::Chat => {
            let mut runtime = Runtime::start(config, cli.offline).await?;
            let result = commands::chat(&mut runtime).await;
            runtime.stop().await;
            result
        }
        Commands::Reconcile => {
            let mut runtime = Runtime::start(config, cli.offline).await?;
            let result = commands::reconcile(&mut runtime).await;
            runtime.stop().await;
            result
        }
        Commands::Status => {
            let runtime = Runtime::start(config, cli.offline).await?;
            let result = commands::status(&runtime);
            runtime.stop().await;
            result
        }
        Commands::History { session, limit } => {
            let store = SqliteStore::open(config.database_path())?;
            let session = session.unwrap_or(config.session_id);
            commands::history(&store, &session, limit)
        }
        Commands::Pending { limit } => {
            let store = SqliteStore::open(config.database_path())?;
            commands::pending(&store, limit)
        }
        Commands::Scans { limit } => {
            let store = SqliteStore::open(config.database_path())?;
            commands::scans(&store, limit)
        }
        Commands::SetKey { provider, secret } => {
            let store = SqliteStore::open(config.database_path())?;
            commands::set_key(&store, provider, &secret)
        }
        Commands::SetScanInterval { minutes } => {
            let store = SqliteStore::open(config.database_path())?;
            commands::set_scan_interval(&store, minutes)
        }
    }
}
