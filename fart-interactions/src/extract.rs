//! Pure commit → interaction-edge extraction.
//!
//! Grounded in `original_source/backend/utils/interactions.py::parse_interaction`
//! for the subject-derivation priority order and
//! `original_source/backend/services/indexer/main.py::_handle_commit` for the
//! post-tally self-reference rules. Nothing in this module performs I/O; the
//! indexer worker is the only caller and owns flushing the returned
//! [`fart_store::WriteOp`]s.

use bson::{doc, Bson};
use chrono::{DateTime, Timelike, Utc};
use fart_store::{collections, WriteOp};
use rsky_syntax::aturi::AtUri;
use serde_json::Value;

pub const LIKE: &str = "app.bsky.feed.like";
pub const REPOST: &str = "app.bsky.feed.repost";
pub const POST: &str = "app.bsky.feed.post";
pub const BLOCK: &str = "app.bsky.graph.block";
pub const PROFILE: &str = "app.bsky.actor.profile";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// Decomposes an `at://did/collection/rkey` URI. Returns `None` for anything
/// that isn't a fully-qualified AT-URI (relative refs never appear in
/// firehose record bodies).
fn parse_at_uri(uri: &str) -> Option<(String, String, String)> {
    let parsed = AtUri::new(uri.to_string(), None).ok()?;
    let mut segments = parsed.pathname.trim_start_matches('/').splitn(2, '/');
    let collection = segments.next()?.to_string();
    let rkey = segments.next()?.to_string();
    Some((parsed.host, collection, rkey))
}

/// `record.createdAt` parsed as ISO-8601 then truncated to the hour
/// (spec.md §3/§4.3 — authoritative over
/// `original_source/backend/utils/interactions.py::get_date`'s day
/// truncation; see DESIGN.md Open Question 1).
fn hour_truncated(created_at: &str) -> Option<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(created_at).ok()?.with_timezone(&Utc);
    parsed
        .with_minute(0)?
        .with_second(0)?
        .with_nanosecond(0)
}

struct Subject {
    did: String,
    characters: Option<i64>,
}

/// Derives the interaction subject for a post, by first match
/// (spec.md §4.3):
/// 1. `record.reply.parent.uri`
/// 2. `record.embed` is a record-embed
/// 3. `record.embed` is a record-with-media whose `.record` is a record-embed
fn post_subject(record: &Value) -> Option<Subject> {
    let text_len = record
        .get("text")
        .and_then(Value::as_str)
        .map(|t| t.chars().count() as i64)
        .unwrap_or(0);

    if let Some(uri) = record
        .pointer("/reply/parent/uri")
        .and_then(Value::as_str)
    {
        let (did, _, _) = parse_at_uri(uri)?;
        return Some(Subject {
            did,
            characters: Some(text_len),
        });
    }

    let embed = record.get("embed")?;
    let embed_type = embed.get("$type").and_then(Value::as_str).unwrap_or("");

    if embed_type == "app.bsky.embed.record" {
        let uri = embed.pointer("/record/uri").and_then(Value::as_str)?;
        let (did, _, _) = parse_at_uri(uri)?;
        return Some(Subject {
            did,
            characters: Some(text_len),
        });
    }

    if embed_type == "app.bsky.embed.recordWithMedia" {
        let inner = embed.get("record")?;
        let inner_type = inner.get("$type").and_then(Value::as_str).unwrap_or("");
        if inner_type == "app.bsky.embed.record" {
            let uri = inner.pointer("/record/uri").and_then(Value::as_str)?;
            let (did, _, _) = parse_at_uri(uri)?;
            return Some(Subject {
                did,
                characters: Some(text_len),
            });
        }
    }

    None
}

fn like_or_repost_subject(record: &Value) -> Option<Subject> {
    let uri = record.pointer("/subject/uri").and_then(Value::as_str)?;
    let (did, _, _) = parse_at_uri(uri)?;
    Some(Subject {
        did,
        characters: None,
    })
}

fn interaction_document(id: &str, author: &str, subject: &str, t: DateTime<Utc>, c: Option<i64>) -> bson::Document {
    let mut doc = doc! {
        "_id": id,
        "a": author,
        "s": subject,
        "t": bson::DateTime::from_chrono(t),
    };
    if let Some(c) = c {
        doc.insert("c", c);
    }
    doc
}

fn tally_field(name: &str, self_reference: bool) -> String {
    if self_reference {
        format!("self_{name}")
    } else {
        name.to_string()
    }
}

/// Extracts zero or more store write operations for one commit op. The
/// caller (the indexer worker) accumulates these into a
/// [`fart_store::WriteBatch`] and flushes once per pulled batch.
pub fn extract(
    collection: &str,
    operation: Operation,
    repo: &str,
    rkey: &str,
    record: Option<&Value>,
) -> Vec<(String, WriteOp)> {
    let id = format!("{repo}/{rkey}");
    let block_id = format!("{repo}/{BLOCK}/{rkey}");

    match (collection, operation) {
        (LIKE, Operation::Create) => extract_edge(collections::INTERACTIONS_LIKE, &id, repo, record, like_or_repost_subject)
            .into_iter()
            .chain(tally_on_create(record, like_or_repost_subject, repo, "likes"))
            .collect(),
        (LIKE, Operation::Delete) => vec![(
            collections::INTERACTIONS_LIKE.to_string(),
            WriteOp::DeleteOne(doc! { "_id": &id }),
        )],

        (REPOST, Operation::Create) => extract_edge(collections::INTERACTIONS_REPOST, &id, repo, record, like_or_repost_subject)
            .into_iter()
            .chain(tally_on_create(record, like_or_repost_subject, repo, "reposts"))
            .collect(),
        (REPOST, Operation::Delete) => vec![(
            collections::INTERACTIONS_REPOST.to_string(),
            WriteOp::DeleteOne(doc! { "_id": &id }),
        )],

        (POST, Operation::Create) => extract_post_create(repo, rkey, &id, record),
        (POST, Operation::Delete) => vec![(
            collections::INTERACTIONS_POST.to_string(),
            WriteOp::DeleteOne(doc! { "_id": &id }),
        )],

        (BLOCK, Operation::Create) => {
            let Some(record) = record else { return vec![] };
            let subject = record
                .pointer("/subject")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let Some(created_at) = record.get("createdAt").and_then(Value::as_str) else {
                return vec![];
            };
            let Some(t) = DateTime::parse_from_rfc3339(created_at)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
            else {
                return vec![];
            };
            vec![(
                collections::BLOCKS.to_string(),
                WriteOp::InsertOne(doc! {
                    "_id": &block_id,
                    "author": repo,
                    "subject": subject,
                    "created_at": bson::DateTime::from_chrono(t),
                }),
            )]
        }
        (BLOCK, Operation::Delete) => vec![(
            collections::BLOCKS.to_string(),
            WriteOp::DeleteOne(doc! { "_id": &block_id }),
        )],

        (PROFILE, Operation::Create | Operation::Update) => {
            let Some(record) = record else { return vec![] };
            let mut set = bson::Document::new();
            if let Ok(Bson::Document(fields)) = bson::to_bson(record) {
                for (k, v) in fields {
                    if k != "avatar" && k != "banner" && k != "$type" {
                        set.insert(k, v);
                    }
                }
            }
            set.insert("updated_at", bson::DateTime::now());
            vec![(
                collections::PROFILES.to_string(),
                WriteOp::UpdateOne {
                    filter: doc! { "_id": repo },
                    update: doc! {
                        "$set": set,
                        "$setOnInsert": { "indexed_at": bson::DateTime::now() },
                    },
                    upsert: true,
                },
            )]
        }
        (PROFILE, Operation::Delete) => vec![(
            collections::PROFILES.to_string(),
            WriteOp::UpdateOne {
                filter: doc! { "_id": repo },
                update: doc! { "$set": { "deleted": true } },
                upsert: false,
            },
        )],

        _ => vec![],
    }
}

/// Upserts the cached `active`/`status` flags on an `#account` state-change
/// event (spec.md §4.4 point 1: every message tagged by `kind`, account
/// events included).
pub fn extract_account(did: &str, active: bool, status: Option<&str>) -> Vec<(String, WriteOp)> {
    let mut set = doc! { "active": active };
    match status {
        Some(status) => set.insert("status", status),
        None => set.insert("status", Bson::Null),
    };
    vec![(
        collections::PROFILES.to_string(),
        WriteOp::UpdateOne {
            filter: doc! { "_id": did },
            update: doc! {
                "$set": set,
                "$setOnInsert": { "indexed_at": bson::DateTime::now() },
            },
            upsert: true,
        },
    )]
}

/// Upserts the cached handle on an `#identity` state-change event. A
/// handle-less identity event (handle in the process of resolving) carries
/// nothing worth writing.
pub fn extract_identity(did: &str, handle: Option<&str>) -> Vec<(String, WriteOp)> {
    let Some(handle) = handle else { return vec![] };
    vec![(
        collections::PROFILES.to_string(),
        WriteOp::UpdateOne {
            filter: doc! { "_id": did },
            update: doc! {
                "$set": { "handle": handle },
                "$setOnInsert": { "indexed_at": bson::DateTime::now() },
            },
            upsert: true,
        },
    )]
}

fn extract_edge(
    target: &str,
    id: &str,
    repo: &str,
    record: Option<&Value>,
    subject_of: impl Fn(&Value) -> Option<Subject>,
) -> Vec<(String, WriteOp)> {
    let Some(record) = record else { return vec![] };
    let Some(subject) = subject_of(record) else {
        return vec![];
    };
    if subject.did == repo {
        return vec![];
    }
    let Some(created_at) = record.get("createdAt").and_then(Value::as_str) else {
        return vec![];
    };
    let Some(t) = hour_truncated(created_at) else {
        return vec![];
    };

    let doc = interaction_document(id, repo, &subject.did, t, subject.characters);
    vec![(
        target.to_string(),
        WriteOp::UpdateOne {
            filter: doc! { "_id": id },
            update: doc! { "$set": doc },
            upsert: true,
        },
    )]
}

fn extract_post_create(repo: &str, _rkey: &str, id: &str, record: Option<&Value>) -> Vec<(String, WriteOp)> {
    let Some(record) = record else { return vec![] };
    let mut ops = Vec::new();

    if let Some(subject) = post_subject(record) {
        if subject.did != repo {
            if let Some(created_at) = record.get("createdAt").and_then(Value::as_str) {
                if let Some(t) = hour_truncated(created_at) {
                    let doc = interaction_document(id, repo, &subject.did, t, subject.characters);
                    ops.push((
                        collections::INTERACTIONS_POST.to_string(),
                        WriteOp::UpdateOne {
                            filter: doc! { "_id": id },
                            update: doc! { "$set": doc },
                            upsert: true,
                        },
                    ));
                }
            }
        }
    }

    ops.extend(reply_tally(repo, record));
    ops.extend(quote_tally(repo, record));
    ops
}

/// Increments `replies`/`self_replies` on the parent post and
/// `root_replies`/`self_root_replies` on the thread root, if present and
/// distinct from the parent (spec.md §4.3 "Post-tally mutations").
fn reply_tally(repo: &str, record: &Value) -> Vec<(String, WriteOp)> {
    let mut ops = Vec::new();
    let parent_uri = record.pointer("/reply/parent/uri").and_then(Value::as_str);
    let root_uri = record.pointer("/reply/root/uri").and_then(Value::as_str);

    if let Some(uri) = parent_uri {
        if let Some((did, _, rkey)) = parse_at_uri(uri) {
            let field = tally_field("replies", did == repo);
            ops.push(increment_post(&did, &rkey, &field));
        }
    }

    if let Some(uri) = root_uri {
        if Some(uri) != parent_uri {
            if let Some((did, _, rkey)) = parse_at_uri(uri) {
                let field = tally_field("root_replies", did == repo);
                ops.push(increment_post(&did, &rkey, &field));
            }
        }
    }

    ops
}

fn quote_tally(repo: &str, record: &Value) -> Vec<(String, WriteOp)> {
    let Some(subject) = quoted_post_uri(record) else {
        return vec![];
    };
    let Some((did, _, rkey)) = parse_at_uri(&subject) else {
        return vec![];
    };
    let field = tally_field("quotes", did == repo);
    vec![increment_post(&did, &rkey, &field)]
}

fn quoted_post_uri(record: &Value) -> Option<String> {
    let embed = record.get("embed")?;
    let embed_type = embed.get("$type").and_then(Value::as_str).unwrap_or("");
    if embed_type == "app.bsky.embed.record" {
        return embed
            .pointer("/record/uri")
            .and_then(Value::as_str)
            .map(str::to_string);
    }
    if embed_type == "app.bsky.embed.recordWithMedia" {
        let inner = embed.get("record")?;
        if inner.get("$type").and_then(Value::as_str) == Some("app.bsky.embed.record") {
            return inner
                .pointer("/record/uri")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
    }
    None
}

fn tally_on_create(
    record: Option<&Value>,
    subject_of: impl Fn(&Value) -> Option<Subject>,
    repo: &str,
    field: &str,
) -> Vec<(String, WriteOp)> {
    let Some(record) = record else { return vec![] };
    let Some(uri) = record.pointer("/subject/uri").and_then(Value::as_str) else {
        return vec![];
    };
    let Some((did, _, rkey)) = parse_at_uri(uri) else {
        return vec![];
    };
    let _ = subject_of;
    let field = tally_field(field, did == repo);
    vec![increment_post(&did, &rkey, &field)]
}

fn increment_post(did: &str, rkey: &str, field: &str) -> (String, WriteOp) {
    let id = format!("{did}/{rkey}");
    (
        collections::POSTS.to_string(),
        WriteOp::IncrementOne {
            filter: doc! { "_id": id },
            inc: doc! { field: 1 },
        },
    )
}
