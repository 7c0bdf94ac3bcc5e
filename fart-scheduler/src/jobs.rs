//! The two leaderboard jobs, one-to-one with
//! `scheduler/main.py::update_top_interactions` / `update_top_blocks`: fan
//! out aggregation pipelines, hydrate the distinct DIDs they surface, and
//! append a single snapshot document to `dynamic_data`.

use bson::{doc, Document};
use chrono::{Duration, Utc};
use fart_store::{collections, StoreClient};
use futures::future::join_all;

use crate::profiles;

/// Both jobs look back 1 day, distinct from the 7-day default the query
/// service's own aggregation uses (`scheduler/main.py`'s own
/// `timedelta(days=1)`, unrelated to `fart-interactions::aggregate`'s
/// window).
const WINDOW_DAYS: i64 = 1;

struct InteractionKind {
    name: &'static str,
    collection: &'static str,
    sum_characters: bool,
}

const KINDS: [InteractionKind; 3] = [
    InteractionKind {
        name: "like",
        collection: collections::INTERACTIONS_LIKE,
        sum_characters: false,
    },
    InteractionKind {
        name: "repost",
        collection: collections::INTERACTIONS_REPOST,
        sum_characters: false,
    },
    InteractionKind {
        name: "post",
        collection: collections::INTERACTIONS_POST,
        sum_characters: true,
    },
];

const SUBKEYS: [(&str, &str); 2] = [("author", "a"), ("subject", "s")];

async fn fetch_interaction_slice(
    store: &StoreClient,
    kind: &InteractionKind,
    subkey: &str,
    field: &str,
    start: bson::DateTime,
) -> Option<Document> {
    let mut group = doc! {
        "_id": format!("${field}"),
        "count": { "$sum": 1 },
    };
    if kind.sum_characters {
        group.insert("c", doc! { "$sum": "$c" });
    }

    let pipeline = vec![
        doc! { "$match": { "t": { "$gte": start } } },
        doc! { "$group": group },
        doc! { "$sort": { "count": -1 } },
        doc! { "$limit": 100 },
    ];

    match store.aggregate(kind.collection, pipeline).await {
        Ok(items) if !items.is_empty() => Some(doc! {
            "key": kind.name,
            "subkey": subkey,
            "items": items,
        }),
        Ok(_) => None,
        Err(error) => {
            tracing::warn!(
                kind = kind.name,
                subkey,
                %error,
                "update_top_interactions: aggregation failed"
            );
            None
        }
    }
}

fn distinct_dids(slices: &[Document]) -> Vec<String> {
    let mut dids: Vec<String> = slices
        .iter()
        .filter_map(|slice| slice.get_array("items").ok())
        .flatten()
        .filter_map(|item| item.as_document())
        .filter_map(|item| item.get_str("_id").ok().map(str::to_string))
        .collect();
    dids.sort();
    dids.dedup();
    dids
}

fn attach_profiles(
    slices: Vec<Document>,
    profiles: &std::collections::HashMap<String, Document>,
) -> Vec<Document> {
    slices
        .into_iter()
        .map(|mut slice| {
            if let Ok(items) = slice.get_array_mut("items") {
                for item in items.iter_mut() {
                    if let Some(item_doc) = item.as_document_mut() {
                        let profile = item_doc
                            .get_str("_id")
                            .ok()
                            .and_then(|did| profiles.get(did))
                            .cloned();
                        item_doc.insert(
                            "profile",
                            profile.map(bson::Bson::Document).unwrap_or(bson::Bson::Null),
                        );
                    }
                }
            }
            slice
        })
        .collect()
}

/// `update_top_interactions`: 6 pipelines (3 kinds × 2 directions) run
/// concurrently, their distinct DIDs hydrated, one `dynamic_data` document
/// named `top_interactions` appended.
pub async fn update_top_interactions(store: &StoreClient) -> Result<(), crate::SchedulerError> {
    tracing::info!("update_top_interactions: start");
    let start = bson::DateTime::from_chrono(Utc::now() - Duration::days(WINDOW_DAYS));

    let tasks = KINDS
        .iter()
        .flat_map(|kind| SUBKEYS.iter().map(move |(subkey, field)| (kind, *subkey, *field)))
        .map(|(kind, subkey, field)| fetch_interaction_slice(store, kind, subkey, field, start));

    let slices: Vec<Document> = join_all(tasks).await.into_iter().flatten().collect();

    let dids = distinct_dids(&slices);
    let profiles = profiles::fetch_profiles(store, &dids).await;
    let slices = attach_profiles(slices, &profiles);

    let snapshot = doc! {
        "name": "top_interactions",
        "data": slices,
        "generated_at": bson::DateTime::now(),
    };
    store
        .collection::<Document>(collections::DYNAMIC_DATA)
        .insert_one(snapshot)
        .await
        .map_err(fart_store::StoreError::from)?;

    tracing::info!("update_top_interactions: end");
    Ok(())
}

async fn fetch_block_slice(store: &StoreClient, field: &str, start: bson::DateTime) -> Option<Document> {
    let pipeline = vec![
        doc! { "$match": { "created_at": { "$gte": start } } },
        doc! { "$group": { "_id": format!("${field}"), "count": { "$sum": 1 } } },
        doc! { "$sort": { "count": -1 } },
        doc! { "$limit": 100 },
    ];

    match store.aggregate(collections::BLOCKS, pipeline).await {
        Ok(items) if !items.is_empty() => Some(doc! { "key": field, "items": items }),
        Ok(_) => None,
        Err(error) => {
            tracing::warn!(field, %error, "update_top_blocks: aggregation failed");
            None
        }
    }
}

/// `update_top_blocks`: 2 pipelines (author/subject) run concurrently,
/// same hydrate-then-append shape as [`update_top_interactions`].
pub async fn update_top_blocks(store: &StoreClient) -> Result<(), crate::SchedulerError> {
    tracing::info!("update_top_blocks: start");
    let start = bson::DateTime::from_chrono(Utc::now() - Duration::days(WINDOW_DAYS));

    let tasks = ["author", "subject"]
        .iter()
        .map(|field| fetch_block_slice(store, field, start));
    let slices: Vec<Document> = join_all(tasks).await.into_iter().flatten().collect();

    let dids = distinct_dids(&slices);
    let profiles = profiles::fetch_profiles(store, &dids).await;
    let slices = attach_profiles(slices, &profiles);

    let snapshot = doc! {
        "name": "top_blocks",
        "data": slices,
        "generated_at": bson::DateTime::now(),
    };
    store
        .collection::<Document>(collections::DYNAMIC_DATA)
        .insert_one(snapshot)
        .await
        .map_err(fart_store::StoreError::from)?;

    tracing::info!("update_top_blocks: end");
    Ok(())
}
