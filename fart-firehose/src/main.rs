//! Subscribes to the upstream repo event stream, decodes each frame, and
//! republishes normalized events onto the internal queue for the indexer to
//! consume. Grounded in `rsky-firehose/src/main.rs`'s connect/reconnect and
//! semaphore-gated spawn shape, with the queue publish and KV cursor
//! checkpoint swapped in for the teacher's HTTP push to a feed generator.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use fart_common::{Config, Shutdown};
use fart_firehose::decoder::{self, Frame};
use fart_firehose::metrics::Metrics;
use fart_queue::QueueClient;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

const CURSOR_BUCKET: &str = "firehose_cursor";
const CURSOR_KEY: &str = "cursor";

#[derive(Debug, Clone, Parser)]
struct SubscriberConfig {
    #[command(flatten)]
    common: Config,

    /// Upstream relay host, without scheme.
    #[arg(long, env = "FIREHOSE_HOST", default_value = "bsky.network")]
    upstream_host: String,

    /// Max backoff between reconnect attempts, in seconds.
    #[arg(long, env = "FIREHOSE_MAX_BACKOFF_SECS", default_value_t = 30)]
    max_backoff_secs: u64,

    /// In-flight message processing concurrency.
    #[arg(long, env = "FIREHOSE_CONCURRENCY", default_value_t = 100)]
    concurrency: usize,
}

fn websocket_url(host: &str, cursor: Option<i64>) -> Url {
    let raw = format!("wss://{host}/xrpc/com.atproto.sync.subscribeRepos");
    let mut url = Url::parse(&raw).expect("invalid websocket url");
    if let Some(cursor) = cursor {
        url.set_query(Some(&format!("cursor={cursor}")));
    }
    url
}

async fn load_cursor(kv: &async_nats::jetstream::kv::Store) -> Option<i64> {
    let entry = kv.get(CURSOR_KEY).await.ok().flatten()?;
    std::str::from_utf8(&entry).ok()?.parse().ok()
}

async fn store_cursor(kv: &async_nats::jetstream::kv::Store, sequence: i64) {
    if let Err(error) = kv.put(CURSOR_KEY, sequence.to_string().into()).await {
        tracing::warn!(%error, "failed to checkpoint cursor");
    }
}

struct Processor {
    queue: QueueClient,
    subject_prefix: String,
    metrics: Arc<Metrics>,
}

impl Processor {
    /// Decodes one websocket binary frame and republishes it, tagged under
    /// `{subject_prefix}.{collection}` so indexer consumers can filter by
    /// NSID (spec.md §5 "subject per collection").
    async fn process(&self, data: Vec<u8>) -> Option<i64> {
        self.metrics.bytes_total.inc_by(data.len() as u64);

        let frame = match decoder::decode_frame(&data) {
            Ok(Some(frame)) => frame,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(%error, "failed to decode firehose frame");
                return None;
            }
        };

        match frame {
            Frame::Commit(commit) => {
                let sequence = commit.sequence;
                let records = decoder::decode_commit_records(&commit);

                for op in &commit.ops {
                    let Some((collection, rkey)) = decoder::split_path(&op.path) else {
                        continue;
                    };
                    if !fart_firehose::is_interested(collection) {
                        continue;
                    }

                    self.metrics
                        .events_total
                        .with_label_values(&[op.action.as_str(), collection])
                        .inc();

                    let record = op.cid.as_ref().and_then(|cid| records.get(cid));
                    if collection == "app.bsky.feed.post" {
                        if let Some(record) = record {
                            if let Some(lang) = record
                                .get("langs")
                                .and_then(|v| v.as_array())
                                .and_then(|a| a.first())
                                .and_then(|v| v.as_str())
                            {
                                self.metrics.post_langs.with_label_values(&[lang]).inc();
                            }
                        }
                    }

                    let envelope = serde_json::json!({
                        "kind": "commit",
                        "operation": op.action,
                        "repo": commit.repo,
                        "collection": collection,
                        "rkey": rkey,
                        "sequence": sequence,
                        "time": commit.time,
                        "record": record,
                    });

                    let payload = match serde_json::to_vec(&envelope) {
                        Ok(payload) => payload,
                        Err(error) => {
                            tracing::warn!(%error, "failed to serialize envelope");
                            continue;
                        }
                    };

                    let subject = format!("{}.{collection}", self.subject_prefix);
                    if let Err(error) = self.queue.publish(subject, payload).await {
                        tracing::warn!(%error, "failed to publish event");
                    }
                }

                Some(sequence)
            }
            Frame::Account(account) => {
                self.metrics.accounts_total.inc();

                let envelope = serde_json::json!({
                    "kind": "account",
                    "did": account.did,
                    "active": account.active,
                    "status": account.status,
                    "sequence": account.sequence,
                    "time": account.time,
                });
                match serde_json::to_vec(&envelope) {
                    Ok(payload) => {
                        let subject = format!("{}.account", self.subject_prefix);
                        if let Err(error) = self.queue.publish(subject, payload).await {
                            tracing::warn!(%error, "failed to publish account event");
                        }
                    }
                    Err(error) => tracing::warn!(%error, "failed to serialize account envelope"),
                }

                Some(account.sequence)
            }
            Frame::Identity(identity) => {
                self.metrics.identities_total.inc();

                let envelope = serde_json::json!({
                    "kind": "identity",
                    "did": identity.did,
                    "handle": identity.handle,
                    "sequence": identity.sequence,
                    "time": identity.time,
                });
                match serde_json::to_vec(&envelope) {
                    Ok(payload) => {
                        let subject = format!("{}.identity", self.subject_prefix);
                        if let Err(error) = self.queue.publish(subject, payload).await {
                            tracing::warn!(%error, "failed to publish identity event");
                        }
                    }
                    Err(error) => tracing::warn!(%error, "failed to serialize identity envelope"),
                }

                Some(identity.sequence)
            }
        }
    }
}

async fn serve_metrics(port: u16, metrics: Arc<Metrics>, shutdown: Shutdown) {
    use warp::Filter;

    let metrics_route = warp::path("metrics").map(move || metrics.encode());
    let health_route = warp::path("health").map(|| "ok");
    let routes = metrics_route.or(health_route);

    let (_, server) = warp::serve(routes).bind_with_graceful_shutdown(
        ([0, 0, 0, 0], port),
        async move { shutdown.token().cancelled().await },
    );
    server.await;
}

/// Reads frames off the websocket and feeds them into the bounded channel.
/// Blocking on a full channel is the pipeline's back-pressure: a slow
/// publish stage stalls `tx.send` here rather than piling up unbounded work.
async fn ingest_task(
    mut read: futures::stream::SplitStream<WsStream>,
    tx: tokio::sync::mpsc::Sender<Vec<u8>>,
    shutdown: Shutdown,
) {
    loop {
        tokio::select! {
            _ = shutdown.token().cancelled() => return,
            message = read.next() => {
                let Some(message) = message else {
                    tracing::warn!("firehose connection closed by server");
                    return;
                };

                match message {
                    Ok(Message::Binary(data)) => {
                        if tx.send(data).await.is_err() {
                            return;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        tracing::warn!(?frame, "firehose connection closed");
                        return;
                    }
                    Ok(_) => {}
                    Err(error) => {
                        tracing::warn!(%error, "firehose websocket error");
                        return;
                    }
                }
            }
        }
    }
}

/// Pulls frames off the bounded channel with up to `concurrency` decodes in
/// flight, and hands every `checkpoint_every`th processed sequence to the
/// checkpoint task.
async fn publish_task(
    processor: Arc<Processor>,
    mut rx: tokio::sync::mpsc::Receiver<Vec<u8>>,
    checkpoint_tx: tokio::sync::mpsc::UnboundedSender<i64>,
    checkpoint_every: u64,
    concurrency: usize,
    shutdown: Shutdown,
) {
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let processed = Arc::new(AtomicI64::new(0));
    let mut workers = tokio::task::JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.token().cancelled() => break,
            data = rx.recv() => {
                let Some(data) = data else { break };
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let processor = processor.clone();
                let checkpoint_tx = checkpoint_tx.clone();
                let processed = processed.clone();

                workers.spawn(async move {
                    let _permit = permit;
                    if let Some(sequence) = processor.process(data).await {
                        let count = processed.fetch_add(1, Ordering::Relaxed) + 1;
                        if count as u64 % checkpoint_every == 0 {
                            let _ = checkpoint_tx.send(sequence);
                        }
                    }
                });
            }
        }
    }

    while workers.join_next().await.is_some() {}
}

/// Persists cursor checkpoints one at a time off the publish hot path. Only
/// the most recently sent sequence matters, so a burst of signals just
/// advances the cursor further with each store.
async fn checkpoint_task(
    kv: Arc<async_nats::jetstream::kv::Store>,
    mut rx: tokio::sync::mpsc::UnboundedReceiver<i64>,
    shutdown: Shutdown,
) {
    loop {
        tokio::select! {
            _ = shutdown.token().cancelled() => return,
            sequence = rx.recv() => {
                let Some(sequence) = sequence else { return };
                store_cursor(&kv, sequence).await;
            }
        }
    }
}

async fn run_connection(
    url: &Url,
    processor: Arc<Processor>,
    kv: Arc<async_nats::jetstream::kv::Store>,
    checkpoint_every: u64,
    concurrency: usize,
    channel_capacity: usize,
    shutdown: Shutdown,
) -> anyhow::Result<()> {
    let (socket, _response) = connect_async(url).await?;
    tracing::info!(%url, "connected to firehose");

    let (frame_tx, frame_rx) = tokio::sync::mpsc::channel::<Vec<u8>>(channel_capacity);
    let (checkpoint_tx, checkpoint_rx) = tokio::sync::mpsc::unbounded_channel::<i64>();

    let (_write, read) = split_socket(socket);

    let mut ingest = tokio::spawn(ingest_task(read, frame_tx, shutdown.clone()));
    let mut publish = tokio::spawn(publish_task(
        processor,
        frame_rx,
        checkpoint_tx,
        checkpoint_every,
        concurrency,
        shutdown.clone(),
    ));
    let mut checkpoint = tokio::spawn(checkpoint_task(kv, checkpoint_rx, shutdown.clone()));

    tokio::select! {
        _ = shutdown.token().cancelled() => {
            tracing::info!("shutdown requested, closing firehose connection");
        }
        _ = &mut ingest => {
            tracing::warn!("firehose ingest task ended, reconnecting");
        }
        _ = &mut publish => {
            tracing::warn!("firehose publish task ended, reconnecting");
        }
        _ = &mut checkpoint => {
            tracing::warn!("firehose checkpoint task ended, reconnecting");
        }
    }

    ingest.abort();
    publish.abort();
    checkpoint.abort();

    Ok(())
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn split_socket(
    socket: WsStream,
) -> (
    futures::stream::SplitSink<WsStream, Message>,
    futures::stream::SplitStream<WsStream>,
) {
    socket.split()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = SubscriberConfig::parse();
    fart_common::init_tracing();

    let shutdown = Arc::new(Shutdown::new());
    tokio::spawn(shutdown.clone().listen_for_signals());

    let queue = QueueClient::connect(&config.common.nats_uri).await?;
    queue
        .create_stream(
            &config.common.nats_stream,
            &[config.common.firehose_subject_prefix.clone()],
            config.common.nats_stream_max_age_days,
            config.common.nats_stream_max_size_gb,
        )
        .await?;
    let kv = Arc::new(queue.get_or_create_kv(CURSOR_BUCKET).await?);

    let metrics = Arc::new(Metrics::new());
    tokio::spawn(serve_metrics(
        config.common.metrics_port,
        metrics.clone(),
        (*shutdown).clone(),
    ));

    let processor = Arc::new(Processor {
        queue,
        subject_prefix: config.common.firehose_subject_prefix.clone(),
        metrics,
    });

    let mut backoff = Duration::from_millis(500);
    while !shutdown.is_triggered() {
        let cursor = load_cursor(&kv).await;
        let url = websocket_url(&config.upstream_host, cursor);

        match run_connection(
            &url,
            processor.clone(),
            kv.clone(),
            config.common.firehose_checkpoint,
            config.concurrency,
            config.common.firehose_channel_capacity,
            (*shutdown).clone(),
        )
        .await
        {
            Ok(()) if shutdown.is_triggered() => break,
            Ok(()) => {
                tracing::warn!("firehose connection ended, reconnecting");
                backoff = Duration::from_millis(500);
            }
            Err(error) => {
                tracing::warn!(%error, backoff_secs = backoff.as_secs(), "failed to connect, backing off");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(Duration::from_secs(config.max_backoff_secs));
            }
        }
    }

    tracing::info!("subscriber shut down");
    Ok(())
}
