//! Shared process state, managed as Rocket-managed state instead of the
//! teacher's `#[database(...)]` connection-pool fairings — there is no
//! connection pool here, just one `StoreClient` and one `IdentityResolver`
//! per process (spec.md §5's shared-resource policy).

use std::sync::Arc;

use fart_identity::IdentityResolver;
use fart_interactions::Interactions;
use fart_store::StoreClient;
use moka::future::Cache;

/// `POST /interactions`'s cached response shape.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InteractionsResult {
    pub did: String,
    pub handle: String,
    pub interactions: Interactions,
}

pub struct AppState {
    pub store: StoreClient,
    pub identity: Arc<IdentityResolver>,
    pub http: reqwest::Client,
    pub api_key: String,
    pub circles_topk: usize,
    /// Marks a DID as "computation in flight" for the duration of one
    /// `POST /interactions` call (spec.md §4.7's semaphore-then-cache
    /// algorithm, grounded in `services/FART/main.py`).
    pub semaphore: Cache<String, ()>,
    pub interactions_cache: Cache<String, InteractionsResult>,
    /// `GET /dd/{name}` result cache, keyed by `name`.
    pub dynamic_data_cache: Cache<String, bson::Document>,
}

impl AppState {
    pub fn new(
        store: StoreClient,
        identity: Arc<IdentityResolver>,
        api_key: String,
        circles_topk: usize,
    ) -> Self {
        let ttl = std::time::Duration::from_secs(600);
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            store,
            identity,
            http,
            api_key,
            circles_topk,
            semaphore: Cache::builder().time_to_live(ttl).build(),
            interactions_cache: Cache::builder().time_to_live(ttl).build(),
            dynamic_data_cache: Cache::builder().time_to_live(ttl).build(),
        }
    }
}
