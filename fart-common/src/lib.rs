//! Environment-driven configuration, structured logging setup, and a
//! cooperative shutdown signal shared by every FART binary.

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Settings shared by every binary in the workspace. Individual binaries
/// extend this with their own `#[derive(Parser)]` struct via `#[command(flatten)]`,
/// mirroring how `rsky-indexer`'s `IndexerConfig` layers defaults on top of
/// env-sourced values.
#[derive(Debug, Clone, Parser)]
pub struct Config {
    /// NATS JetStream endpoint.
    #[arg(long, env = "NATS_URI", default_value = "nats://nats:4222")]
    pub nats_uri: String,

    /// JetStream stream name.
    #[arg(long, env = "NATS_STREAM", default_value = "bsky")]
    pub nats_stream: String,

    /// Stream retention, in days.
    #[arg(long, env = "NATS_STREAM_MAX_AGE", default_value_t = 7)]
    pub nats_stream_max_age_days: u64,

    /// Stream retention, in gigabytes.
    #[arg(long, env = "NATS_STREAM_MAX_SIZE", default_value_t = 5)]
    pub nats_stream_max_size_gb: u64,

    /// MongoDB endpoint.
    #[arg(long, env = "MONGO_URI", default_value = "mongodb://mongodb:27017")]
    pub mongo_uri: String,

    /// Logical database name.
    #[arg(long, env = "FART_DB", default_value = "bsky")]
    pub fart_db: String,

    /// HTTP port for the query service.
    #[arg(long, env = "FART_PORT", default_value_t = 8000)]
    pub fart_port: u16,

    /// Shared API key; empty disables auth.
    #[arg(long, env = "FART_KEY", default_value = "")]
    pub fart_key: String,

    /// Internal subject prefix for republished firehose events.
    #[arg(
        long,
        env = "FIREHOSE_ENJOYER_SUBJECT_PREFIX",
        default_value = "firehose"
    )]
    pub firehose_subject_prefix: String,

    /// Cursor checkpoint stride.
    #[arg(long, env = "FIREHOSE_ENJOYER_CHECKPOINT", default_value_t = 1000)]
    pub firehose_checkpoint: u64,

    /// Capacity of the bounded channel between the ingest and publish tasks.
    #[arg(long, env = "FIREHOSE_CHANNEL_CAPACITY", default_value_t = 1000)]
    pub firehose_channel_capacity: usize,

    /// If false, the indexer drops writes after decoding (dry-run).
    #[arg(long, env = "INDEXER_ENABLE", default_value_t = false)]
    pub indexer_enable: bool,

    /// Durable consumer name used by the indexer.
    #[arg(long, env = "INDEXER_CONSUMER", default_value = "indexer")]
    pub indexer_consumer: String,

    /// Pull batch size for the indexer.
    #[arg(long, env = "INDEXER_BATCH_SIZE", default_value_t = 1000)]
    pub indexer_batch_size: usize,

    /// In-flight message concurrency for the indexer.
    #[arg(long, env = "INDEXER_CONCURRENCY", default_value_t = 100)]
    pub indexer_concurrency: usize,

    /// Prometheus `/metrics` + `/health` port for the subscriber and indexer.
    #[arg(long, env = "FART_METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,

    /// Counterparty avatars rendered by the circles image.
    #[arg(long, env = "CIRCLES_TOPK", default_value_t = 50)]
    pub circles_topk: usize,

    /// Cron schedule for the `top_interactions` leaderboard job.
    #[arg(
        long,
        env = "CHRONO_TRIGGER_TOP_INTERACTIONS_INTERVAL",
        default_value = "0 0 0/3 * * *"
    )]
    pub chrono_trigger_top_interactions_interval: String,

    /// Cron schedule for the `top_blocks` leaderboard job.
    #[arg(
        long,
        env = "CHRONO_TRIGGER_TOP_BLOCKS_INTERVAL",
        default_value = "0 0 0/3 * * *"
    )]
    pub chrono_trigger_top_blocks_interval: String,
}

impl Config {
    /// Loads `.env` if present, then parses from the environment. Any
    /// missing required value is a configuration error and the caller
    /// should treat it as fatal (spec error kind 6).
    pub fn load() -> anyhow::Result<Self> {
        match dotenvy::dotenv() {
            Ok(_) | Err(dotenvy::Error::Io(_)) => {}
            Err(e) => return Err(e.into()),
        }
        Ok(Config::parse())
    }
}

/// Installs a `tracing_subscriber` driven by `RUST_LOG`, defaulting to
/// `fart=info,warn` when unset, matching `rsky-firehose`'s inline setup.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fart=info,warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Cooperative shutdown signal shared across the ingest/publish/checkpoint
/// task trio (spec.md §5, §9 "Coroutine/event-loop control flow"). Wraps a
/// `CancellationToken` rather than the teacher's raw `AtomicBool` so that
/// `tokio::select!` can wait on cancellation instead of polling it.
#[derive(Clone)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Resolves once SIGINT or SIGTERM arrives, then triggers the token.
    /// Spawn this once per process.
    pub async fn listen_for_signals(self: Arc<Self>) {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {}
                _ = term.recv() => {}
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }

        tracing::info!("shutdown signal received");
        self.trigger();
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
