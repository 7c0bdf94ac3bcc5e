//! MongoDB-backed document store.
//!
//! Generalizes `rsky-indexer::indexing::plugins`' per-collection write
//! dispatch from direct Postgres SQL execution to an accumulated
//! [`WriteBatch`] flushed as one batch per target collection per indexer
//! tick, mirroring `original_source/backend/services/indexer/main.py`'s
//! `all_db_ops` accumulation followed by one `asyncio.gather(bulk_write)`.

use std::collections::HashMap;
use std::time::Duration;

use bson::{doc, Document};
use futures::future::join_all;
use mongodb::options::{UpdateModifications, WriteModel};
use mongodb::{Client, Collection, Database, IndexModel, Namespace};
use thiserror::Error;
use tracing::{error, info};

pub mod collections {
    pub const INTERACTIONS_LIKE: &str = "interactions.like";
    pub const INTERACTIONS_REPOST: &str = "interactions.repost";
    pub const INTERACTIONS_POST: &str = "interactions.post";
    pub const PROFILES: &str = "app.bsky.actor.profile";
    pub const BLOCKS: &str = "app.bsky.graph.block";
    pub const POSTS: &str = "app.bsky.feed.post";
    pub const DYNAMIC_DATA: &str = "dynamic_data";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mongodb: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

/// One write operation destined for a single collection. Kept deliberately
/// small: the extractor (`fart-interactions::extract`) builds these, the
/// indexer accumulates them into a [`WriteBatch`], `fart-store` only knows
/// how to execute them.
#[derive(Debug, Clone)]
pub enum WriteOp {
    InsertOne(Document),
    UpdateOne {
        filter: Document,
        update: Document,
        upsert: bool,
    },
    DeleteOne(Document),
    /// `$inc` a set of counters matched by `filter` (post-tally mutations).
    IncrementOne { filter: Document, inc: Document },
}

/// Accumulates write operations keyed by target collection across one
/// indexer batch (spec.md §4.4 point 2).
#[derive(Debug, Default)]
pub struct WriteBatch {
    ops: HashMap<String, Vec<WriteOp>>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, collection: impl Into<String>, op: WriteOp) {
        self.ops.entry(collection.into()).or_default().push(op);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.values().all(|v| v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.ops.values().map(|v| v.len()).sum()
    }
}

#[derive(Clone)]
pub struct StoreClient {
    db: Database,
}

impl StoreClient {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self {
            db: client.database(db_name),
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.db.collection(name)
    }

    /// Flushes every collection in the batch concurrently. A single
    /// collection's failure is logged and does not stop the others
    /// (spec.md §4.4 point 3, §7 error kind 3): "bulk-write error → log, do
    /// not retry the batch".
    pub async fn flush(&self, batch: WriteBatch) {
        let tasks = batch
            .ops
            .into_iter()
            .filter(|(_, ops)| !ops.is_empty())
            .map(|(name, ops)| self.flush_collection(name, ops));
        join_all(tasks).await;
    }

    /// Runs one `bulkWrite` for every op targeting `name` (spec.md §4.4 point
    /// 3: "issue one bulk-write per collection concurrently, ordered=false").
    async fn flush_collection(&self, name: String, ops: Vec<WriteOp>) {
        let count = ops.len();
        let namespace = Namespace::new(self.db.name(), name.as_str());

        let models: Vec<WriteModel> = ops
            .into_iter()
            .map(|op| match op {
                WriteOp::InsertOne(doc) => WriteModel::InsertOne {
                    namespace: namespace.clone(),
                    document: doc,
                },
                WriteOp::UpdateOne {
                    filter,
                    update,
                    upsert,
                } => WriteModel::UpdateOne {
                    namespace: namespace.clone(),
                    filter,
                    update: UpdateModifications::Document(update),
                    array_filters: None,
                    collation: None,
                    hint: None,
                    upsert: Some(upsert),
                },
                WriteOp::DeleteOne(filter) => WriteModel::DeleteOne {
                    namespace: namespace.clone(),
                    filter,
                    collation: None,
                    hint: None,
                },
                WriteOp::IncrementOne { filter, inc } => WriteModel::UpdateOne {
                    namespace: namespace.clone(),
                    filter,
                    update: UpdateModifications::Document(doc! { "$inc": inc }),
                    array_filters: None,
                    collation: None,
                    hint: None,
                    upsert: Some(true),
                },
            })
            .collect();

        match self.db.client().bulk_write(models).ordered(false).await {
            Ok(result) => info!(
                collection = %name,
                total = count,
                matched = result.matched_count,
                modified = result.modified_count,
                inserted = result.inserted_count,
                deleted = result.deleted_count,
                "flushed batch"
            ),
            Err(error) => error!(collection = %name, total = count, %error, "bulk write failed"),
        }
    }

    /// Runs an aggregation pipeline against `collection`, returning the raw
    /// result documents (spec.md §4.6).
    pub async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        use futures::TryStreamExt;
        let coll: Collection<Document> = self.db.collection(collection);
        let cursor = coll.aggregate(pipeline).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs)
    }

    /// Idempotent index creation at startup (spec.md §4.4 "Index creation").
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        for name in [
            collections::INTERACTIONS_LIKE,
            collections::INTERACTIONS_REPOST,
            collections::INTERACTIONS_POST,
        ] {
            let collection: Collection<Document> = self.db.collection(name);
            collection
                .create_index(IndexModel::builder().keys(doc! { "a": 1, "t": 1 }).build())
                .await?;
            collection
                .create_index(IndexModel::builder().keys(doc! { "s": 1, "t": 1 }).build())
                .await?;
            collection
                .create_index(
                    IndexModel::builder()
                        .keys(doc! { "t": 1 })
                        .options(
                            mongodb::options::IndexOptions::builder()
                                .expire_after(Duration::from_secs(15 * 86_400))
                                .build(),
                        )
                        .build(),
                )
                .await?;
        }

        let blocks: Collection<Document> = self.db.collection(collections::BLOCKS);
        blocks
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "author": 1, "created_at": 1 })
                    .build(),
            )
            .await?;
        blocks
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "subject": 1, "created_at": 1 })
                    .build(),
            )
            .await?;

        let posts: Collection<Document> = self.db.collection(collections::POSTS);
        posts
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "indexed_at": 1 })
                    .options(
                        mongodb::options::IndexOptions::builder()
                            .expire_after(Duration::from_secs(8 * 86_400))
                            .build(),
                    )
                    .build(),
            )
            .await?;

        info!("store indexes ensured");
        Ok(())
    }
}
