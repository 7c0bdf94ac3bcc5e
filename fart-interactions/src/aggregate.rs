//! Per-counterparty interaction aggregation.
//!
//! One-to-one with `original_source/backend/interactions/data.py::get_interactions`:
//! for each interaction kind, for each direction, match-group-sort-limit,
//! then merge the three kinds into one record per counterparty.

use std::collections::HashMap;

use bson::{doc, Document};
use chrono::{DateTime, Duration, Utc};
use fart_store::{collections, StoreClient};
use serde::Serialize;

/// `original_source/backend/interactions/data.py::get_interactions`'s
/// default window when the caller doesn't specify one (DESIGN.md Open
/// Question 2).
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

struct Kind {
    collection: &'static str,
    initial: &'static str,
    has_characters: bool,
}

const KINDS: [Kind; 3] = [
    Kind {
        collection: collections::INTERACTIONS_LIKE,
        initial: "l",
        has_characters: false,
    },
    Kind {
        collection: collections::INTERACTIONS_REPOST,
        initial: "r",
        has_characters: false,
    },
    Kind {
        collection: collections::INTERACTIONS_POST,
        initial: "p",
        has_characters: true,
    },
];

#[derive(Debug, Clone, Serialize, Default)]
pub struct RankedCounterparty {
    #[serde(rename = "_id")]
    pub id: String,
    pub l: i64,
    pub r: i64,
    pub p: i64,
    pub c: i64,
    pub t: i64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct Interactions {
    pub sent: Vec<RankedCounterparty>,
    pub rcvd: Vec<RankedCounterparty>,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Sent,
    Rcvd,
}

impl Direction {
    fn author_field(self) -> &'static str {
        "a"
    }

    fn counterparty_field(self) -> &'static str {
        match self {
            Direction::Sent => "s",
            Direction::Rcvd => "a",
        }
    }

    fn match_field(self) -> &'static str {
        match self {
            Direction::Sent => "a",
            Direction::Rcvd => "s",
        }
    }
}

fn pipeline(did: &str, start: DateTime<Utc>, direction: Direction, kind: &Kind) -> Vec<Document> {
    let _ = direction.author_field();
    let mut group = doc! {
        "_id": format!("${}", direction.counterparty_field()),
        kind.initial: { "$sum": 1 },
    };
    if kind.has_characters {
        group.insert("c", doc! { "$sum": "$c" });
    }

    vec![
        doc! {
            "$match": {
                direction.match_field(): did,
                "t": { "$gte": bson::DateTime::from_chrono(start) },
            }
        },
        doc! { "$group": group },
        doc! { "$sort": { kind.initial: -1 } },
        doc! { "$limit": 100 },
    ]
}

async fn aggregate_direction(
    store: &StoreClient,
    did: &str,
    start: DateTime<Utc>,
    direction: Direction,
) -> Vec<RankedCounterparty> {
    let mut merged: HashMap<String, RankedCounterparty> = HashMap::new();

    for kind in &KINDS {
        let docs = match store
            .aggregate(kind.collection, pipeline(did, start, direction, kind))
            .await
        {
            Ok(docs) => docs,
            Err(e) => {
                tracing::error!(collection = kind.collection, error = %e, "aggregation failed");
                continue;
            }
        };

        for doc in docs {
            let Some(id) = doc.get_str("_id").ok().map(str::to_string) else {
                continue;
            };
            let entry = merged.entry(id.clone()).or_insert_with(|| RankedCounterparty {
                id,
                ..Default::default()
            });
            let count = doc.get_i32(kind.initial).map(i64::from).unwrap_or(0);
            match kind.initial {
                "l" => entry.l += count,
                "r" => entry.r += count,
                "p" => {
                    entry.p += count;
                    entry.c += doc.get_i64("c").unwrap_or(0);
                }
                _ => {}
            }
        }
    }

    let mut out: Vec<RankedCounterparty> = merged
        .into_values()
        .map(|mut rc| {
            rc.t = rc.l + rc.r + rc.p;
            rc
        })
        .collect();
    out.sort_by(|a, b| b.t.cmp(&a.t));
    out
}

/// Aggregates interactions for `did` over `[start_date, now)`, defaulting to
/// the last 7 days when `start_date` is `None`.
pub async fn get_interactions(
    store: &StoreClient,
    did: &str,
    start_date: Option<DateTime<Utc>>,
) -> Interactions {
    let start = start_date.unwrap_or_else(|| Utc::now() - Duration::days(DEFAULT_WINDOW_DAYS));

    let sent = aggregate_direction(store, did, start, Direction::Sent).await;
    let rcvd = aggregate_direction(store, did, start, Direction::Rcvd).await;

    Interactions { sent, rcvd }
}
