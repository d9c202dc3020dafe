//! PCQ Relay - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use pcq_common::backup::BackupSink;
use pcq_common::intake::Intake;
use pcq_common::logging::{init_logging, LogConfig};
use pcq_common::store::QueueStore;
use pcq_relay::client::EnqueueClient;
use pcq_relay::reconciler::{Reconciler, DEFAULT_SYNC_INTERVAL_SECS};
use pcq_relay::source::{self, OriginFilter, DEFAULT_CHANNEL_DEPTH};
use pcq_relay::submit::{run_consumer, Submitter};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pcq-relay")]
#[command(author, version, about = "Piece-count relay: inbound consumer and fallback reconciler")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Ingestion API base URL
    #[arg(long, env = "PCQ_SERVER_URL", default_value = "http://127.0.0.1:3000")]
    server_url: String,

    /// Local fallback cache directory
    #[arg(long, env = "PCQ_FALLBACK_DIR", default_value = "./fallback")]
    fallback_dir: PathBuf,

    /// Directory for the failsafe backup tiers
    #[arg(long, env = "PCQ_BACKUP_DIR", default_value = "./backup")]
    backup_dir: PathBuf,

    /// Producer identity sent with every submission
    #[arg(long, env = "PCQ_PRODUCER_ID")]
    producer_id: Option<String>,

    /// Seconds between reconcile cycles
    #[arg(long, env = "PCQ_SYNC_INTERVAL_SECS", default_value_t = DEFAULT_SYNC_INTERVAL_SECS)]
    sync_interval_secs: u64,

    /// JSON file mapping allowed origin ids to display names
    #[arg(long, env = "PCQ_ALLOWED_ORIGINS")]
    allowed_origins: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Consume the inbound source (JSON-lines on stdin) and reconcile
    Run,
    /// Run a single reconcile cycle and exit
    Drain,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::for_binary("pcq-relay");
    if cli.verbose {
        log_config.level = "debug".to_string();
    }
    let log_config = log_config.from_env()?;
    let _log_guard = init_logging(&log_config)?;

    let producer_id = cli
        .producer_id
        .clone()
        .unwrap_or_else(|| format!("relay-{}", uuid::Uuid::new_v4()));

    // The fallback cache is the last durable line when the API is down;
    // refuse to start without it.
    let store = QueueStore::new(&cli.fallback_dir);
    store.probe_writable().map_err(|err| {
        anyhow::anyhow!(
            "fallback cache unusable at {}: {err}",
            cli.fallback_dir.display()
        )
    })?;

    let client = EnqueueClient::new(&cli.server_url, producer_id);

    match cli.command {
        Command::Run => run(&cli, store, client).await,
        Command::Drain => {
            let mut reconciler = Reconciler::new(store, client);
            let synced = reconciler.run_cycle().await;
            info!(synced, "drain complete");
            Ok(())
        }
    }
}

async fn run(cli: &Cli, store: QueueStore, client: EnqueueClient) -> Result<()> {
    info!(
        server = %cli.server_url,
        fallback = %cli.fallback_dir.display(),
        "relay starting"
    );

    let reconciler = Reconciler::new(store.clone(), client.clone());
    let reconcile_handle =
        tokio::spawn(reconciler.run(Duration::from_secs(cli.sync_interval_secs)));

    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_DEPTH);
    let source_handle = tokio::spawn(source::read_stdin(tx));

    let submitter = Submitter::new(
        Intake::new(store),
        client,
        OriginFilter::load(cli.allowed_origins.as_deref()),
        BackupSink::new(&cli.backup_dir),
    );

    tokio::select! {
        _ = run_consumer(rx, submitter) => info!("inbound source drained, shutting down"),
        _ = tokio::signal::ctrl_c() => info!("interrupt received, shutting down"),
    }

    source_handle.abort();
    reconcile_handle.abort();
    Ok(())
}
