//! Batched profile hydration, matching `scheduler/main.py::fetch_profiles`'s
//! 25-DID chunking (there, a per-request limit on the upstream
//! `getProfiles` call; here, kept as the same chunk size against the local
//! store so the leaderboard documents this job writes look the same either
//! way).

use std::collections::HashMap;

use bson::{doc, Document};
use fart_store::{collections, StoreClient};
use futures::TryStreamExt;

const CHUNK_SIZE: usize = 25;

pub async fn fetch_profiles(store: &StoreClient, dids: &[String]) -> HashMap<String, Document> {
    let mut profiles = HashMap::new();

    for chunk in dids.chunks(CHUNK_SIZE) {
        let collection = store.collection::<Document>(collections::PROFILES);
        let cursor = match collection.find(doc! { "_id": { "$in": chunk } }).await {
            Ok(cursor) => cursor,
            Err(error) => {
                tracing::warn!(%error, "profile hydration chunk failed");
                continue;
            }
        };

        let docs: Vec<Document> = match cursor.try_collect().await {
            Ok(docs) => docs,
            Err(error) => {
                tracing::warn!(%error, "profile hydration chunk failed");
                continue;
            }
        };

        for doc in docs {
            if let Ok(did) = doc.get_str("_id") {
                profiles.insert(did.to_string(), doc.clone());
            }
        }
    }

    profiles
}
