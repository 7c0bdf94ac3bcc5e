//! Batch consumer loop: pulls a batch of queued events, extracts write
//! operations per event, flushes them to the document store, acks the
//! batch. Grounded in `rsky-indexer/src/stream_indexer.rs`'s
//! read-batch/process/ack loop shape, with the Redis consumer group and
//! per-plugin Postgres upserts replaced by a NATS pull-consumer and
//! `fart-interactions::extract` respectively.

use std::sync::Arc;
use std::time::Duration;

use fart_common::Shutdown;
use fart_identity::IdentityResolver;
use fart_queue::PullSubscription;
use fart_store::{StoreClient, WriteBatch};
use futures::stream::{self, StreamExt};
use tracing::{debug, error, warn};

use crate::{metrics, IndexerError, QueuedEvent};

pub struct Indexer {
    subscription: PullSubscription,
    store: StoreClient,
    identity: Arc<IdentityResolver>,
    batch_size: usize,
    concurrency: usize,
    enabled: bool,
}

impl Indexer {
    pub fn new(
        subscription: PullSubscription,
        store: StoreClient,
        identity: Arc<IdentityResolver>,
        batch_size: usize,
        concurrency: usize,
        enabled: bool,
    ) -> Self {
        Self {
            subscription,
            store,
            identity,
            batch_size,
            concurrency,
            enabled,
        }
    }

    /// Runs until `shutdown` triggers. An empty fetch just loops back around
    /// (spec.md §4.2 "short fetch timeout + heartbeat").
    pub async fn run(&self, shutdown: &Shutdown) -> Result<(), IndexerError> {
        while !shutdown.is_triggered() {
            let batch = self
                .subscription
                .fetch_batch(self.batch_size, Duration::from_secs(2))
                .await?;

            if batch.is_empty() {
                continue;
            }

            let mut write_batch = WriteBatch::new();
            let mut touched_profiles = std::collections::HashSet::new();

            for message in &batch {
                let event: QueuedEvent = match serde_json::from_slice(&message.payload) {
                    Ok(event) => event,
                    Err(error) => {
                        metrics::ERRORS_TOTAL.inc();
                        warn!(%error, subject = %message.subject, "failed to parse queued event");
                        continue;
                    }
                };

                metrics::EVENTS_PROCESSED_TOTAL.inc();

                let writes = match event.kind.as_str() {
                    "commit" => {
                        let Some(op) = event.op() else { continue };
                        metrics::EVENTS_BY_COLLECTION_TOTAL
                            .with_label_values(&[&event.collection, &event.operation])
                            .inc();
                        touched_profiles.insert(event.repo.clone());
                        fart_interactions::extract(
                            &event.collection,
                            op,
                            &event.repo,
                            &event.rkey,
                            event.record.as_ref(),
                        )
                    }
                    "account" => {
                        let Some(did) = event.did.as_deref() else { continue };
                        metrics::EVENTS_BY_COLLECTION_TOTAL
                            .with_label_values(&["account", "update"])
                            .inc();
                        fart_interactions::extract_account(
                            did,
                            event.active.unwrap_or(true),
                            event.status.as_deref(),
                        )
                    }
                    "identity" => {
                        let Some(did) = event.did.as_deref() else { continue };
                        metrics::EVENTS_BY_COLLECTION_TOTAL
                            .with_label_values(&["identity", "update"])
                            .inc();
                        fart_interactions::extract_identity(did, event.handle.as_deref())
                    }
                    other => {
                        warn!(kind = other, "unknown queued event kind");
                        continue;
                    }
                };

                for (collection, write_op) in writes {
                    metrics::WRITE_OPS_TOTAL.inc();
                    write_batch.push(collection, write_op);
                }
            }

            metrics::BATCH_SIZE.set(write_batch.len() as i64);

            if self.enabled && !write_batch.is_empty() {
                self.store.flush(write_batch).await;
            }

            if self.enabled {
                stream::iter(touched_profiles)
                    .for_each_concurrent(self.concurrency, |did| async move {
                        if let Err(error) = self.identity.ensure_profile(&self.store, &did).await {
                            debug!(%error, %did, "profile refresh skipped");
                        }
                    })
                    .await;
            }

            if let Err(error) = self.subscription.ack_batch(&batch).await {
                error!(%error, "failed to ack batch");
            }
        }

        Ok(())
    }
}
