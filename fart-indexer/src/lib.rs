pub mod indexer;
pub mod metrics;

use thiserror::Error;

/// Error types for the indexer worker.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("queue error: {0}")]
    Queue(#[from] fart_queue::QueueError),

    #[error("store error: {0}")]
    Store(#[from] fart_store::StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// One normalized event as published onto the queue by `fart-subscriber`
/// (mirrors the envelopes built in `fart-firehose/src/main.rs::Processor::process`).
/// `kind` selects which of the three envelope shapes (`commit`, `account`,
/// `identity`) the remaining fields belong to; fields outside a given kind's
/// shape are left at their default.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct QueuedEvent {
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub collection: String,
    #[serde(default)]
    pub rkey: String,
    #[allow(dead_code)]
    pub sequence: i64,
    #[allow(dead_code)]
    pub time: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub record: Option<serde_json::Value>,
    #[serde(default)]
    pub did: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
}

fn default_kind() -> String {
    "commit".to_string()
}

impl QueuedEvent {
    pub fn op(&self) -> Option<fart_interactions::Operation> {
        match self.operation.as_str() {
            "create" => Some(fart_interactions::Operation::Create),
            "update" => Some(fart_interactions::Operation::Update),
            "delete" => Some(fart_interactions::Operation::Delete),
            _ => None,
        }
    }
}
