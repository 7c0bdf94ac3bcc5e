//! Durable internal queue on top of NATS JetStream.
//!
//! Mirrors `original_source/backend/utils/nats.py`'s `NATSManager`: a single
//! shared connection per process, idempotent stream/KV creation, and a
//! durable pull-consumer per subject named `{service}-{subject_with_dots_as_underscores}`.

use std::time::Duration;

use async_nats::jetstream::{
    self,
    consumer::{pull::Config as PullConfig, AckPolicy, DeliverPolicy},
    kv::Store,
    stream::{DiscardPolicy, RetentionPolicy, StorageType, Stream},
};
use futures::StreamExt;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("connect: {0}")]
    Connect(#[from] async_nats::ConnectError),
    #[error("jetstream: {0}")]
    Context(#[from] async_nats::error::Error<async_nats::jetstream::context::CreateStreamErrorKind>),
    #[error("consumer: {0}")]
    Consumer(String),
    #[error("publish: {0}")]
    Publish(String),
    #[error("kv: {0}")]
    Kv(String),
}

/// One NATS connection + JetStream context, shared across the process
/// (spec.md §5 "one queue connection per process, shared").
#[derive(Clone)]
pub struct QueueClient {
    js: jetstream::Context,
}

impl QueueClient {
    pub async fn connect(uri: &str) -> Result<Self, QueueError> {
        let client = async_nats::connect(uri).await?;
        let js = jetstream::new(client);
        Ok(Self { js })
    }

    /// Idempotent stream creation. `subject_prefixes` become `{prefix}.>`
    /// wildcard subjects, matching `nats.py::create_stream`.
    pub async fn create_stream(
        &self,
        name: &str,
        subject_prefixes: &[String],
        max_age_days: u64,
        max_bytes_gb: u64,
    ) -> Result<Stream, QueueError> {
        let subjects = subject_prefixes
            .iter()
            .map(|p| format!("{p}.>"))
            .collect::<Vec<_>>();

        let config = jetstream::stream::Config {
            name: name.to_string(),
            subjects,
            retention: RetentionPolicy::Limits,
            discard: DiscardPolicy::Old,
            storage: StorageType::File,
            max_age: Duration::from_secs(max_age_days * 86_400),
            max_bytes: (max_bytes_gb * 1024 * 1024 * 1024) as i64,
            ..Default::default()
        };

        let stream = self
            .js
            .get_or_create_stream(config)
            .await
            .map_err(|e| QueueError::Consumer(e.to_string()))?;

        info!(stream = name, "queue stream ready");
        Ok(stream)
    }

    /// Named KV bucket for cursor persistence (spec.md §3 "Cursor state").
    pub async fn get_or_create_kv(&self, bucket: &str) -> Result<Store, QueueError> {
        match self.js.get_key_value(bucket).await {
            Ok(store) => Ok(store),
            Err(_) => self
                .js
                .create_key_value(jetstream::kv::Config {
                    bucket: bucket.to_string(),
                    ..Default::default()
                })
                .await
                .map_err(|e| QueueError::Kv(e.to_string())),
        }
    }

    pub async fn publish(&self, subject: String, payload: Vec<u8>) -> Result<(), QueueError> {
        self.js
            .publish(subject, payload.into())
            .await
            .map_err(|e| QueueError::Publish(e.to_string()))?
            .await
            .map_err(|e| QueueError::Publish(e.to_string()))?;
        Ok(())
    }

    /// Binds (creating if absent) a durable pull-consumer on `stream_name`
    /// filtered to `filter_subject`, named
    /// `{service_name}-{filter_subject.replace('.', '_')}` per
    /// `nats.py::pull_subscribe`.
    pub async fn pull_subscribe(
        &self,
        stream_name: &str,
        service_name: &str,
        filter_subject: &str,
    ) -> Result<PullSubscription, QueueError> {
        let stream = self
            .js
            .get_stream(stream_name)
            .await
            .map_err(|e| QueueError::Consumer(e.to_string()))?;

        let durable_name = format!("{service_name}-{}", filter_subject.replace('.', "_"));

        let consumer = stream
            .get_or_create_consumer(
                &durable_name,
                PullConfig {
                    durable_name: Some(durable_name.clone()),
                    filter_subject: filter_subject.to_string(),
                    deliver_policy: DeliverPolicy::All,
                    ack_policy: AckPolicy::All,
                    ack_wait: Duration::from_secs(60),
                    max_ack_pending: i64::MAX,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| QueueError::Consumer(e.to_string()))?;

        Ok(PullSubscription { consumer })
    }
}

/// One durable NATS pull-consumer. `fetch_batch` returns an ordered batch;
/// the caller acks only the last message (`AckPolicy::All` acks everything
/// up to and including it), matching spec.md §4.2/§4.4.
pub struct PullSubscription {
    consumer: async_nats::jetstream::consumer::Consumer<PullConfig>,
}

pub struct QueueMessage {
    pub subject: String,
    pub payload: Vec<u8>,
    inner: async_nats::jetstream::Message,
}

impl PullSubscription {
    /// Fetches up to `batch_size` messages, waiting at most `timeout` for
    /// the first one. An empty return means "no messages right now", never
    /// an error — callers should loop and re-poll (spec.md §4.2 "short
    /// fetch timeout + heartbeat").
    pub async fn fetch_batch(
        &self,
        batch_size: usize,
        timeout: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let mut batch = self
            .consumer
            .fetch()
            .max_messages(batch_size)
            .expires(timeout)
            .messages()
            .await
            .map_err(|e| QueueError::Consumer(e.to_string()))?;

        let mut out = Vec::with_capacity(batch_size);
        while let Some(msg) = batch.next().await {
            match msg {
                Ok(m) => {
                    let subject = m.subject.to_string();
                    let payload = m.payload.to_vec();
                    out.push(QueueMessage {
                        subject,
                        payload,
                        inner: m,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "error pulling message from consumer");
                    break;
                }
            }
        }

        debug!(count = out.len(), "fetched batch");
        Ok(out)
    }

    /// Acks the whole batch by acking its last message (`AckPolicy::All`).
    /// No-op on an empty batch.
    pub async fn ack_batch(&self, batch: &[QueueMessage]) -> Result<(), QueueError> {
        if let Some(last) = batch.last() {
            last.inner
                .ack()
                .await
                .map_err(|e| QueueError::Consumer(e.to_string()))?;
        }
        Ok(())
    }
}
