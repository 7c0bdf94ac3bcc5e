//! Upstream frame decoding.
//!
//! Grounded in `rsky-firehose/src/firehose.rs`'s header-dispatch shape, but
//! with locally-defined wire types matching spec.md §6 exactly (`Commit`,
//! `Account`, `Identity`) instead of depending on the teacher's
//! `rsky-lexicon` crate, which models a far larger surface than this
//! pipeline needs.

use std::collections::HashMap;
use std::io::Cursor;

use chrono::{DateTime, Utc};
use lexicon_cid::Cid;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::car;

#[derive(Debug, Deserialize)]
pub struct FrameHeader {
    #[serde(rename = "t")]
    pub type_: String,
    #[serde(rename = "op")]
    pub operation: u8,
}

#[derive(Debug, Deserialize)]
pub struct RepoOp {
    pub action: String,
    pub path: String,
    pub cid: Option<Cid>,
}

#[derive(Debug, Deserialize)]
pub struct CommitBody {
    #[serde(with = "serde_bytes")]
    pub blocks: Vec<u8>,
    pub repo: String,
    #[serde(rename = "seq")]
    pub sequence: i64,
    pub time: DateTime<Utc>,
    pub ops: Vec<RepoOp>,
}

#[derive(Debug, Deserialize)]
pub struct AccountBody {
    pub did: String,
    pub active: bool,
    pub status: Option<String>,
    #[serde(rename = "seq")]
    pub sequence: i64,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct IdentityBody {
    pub did: String,
    pub handle: Option<String>,
    #[serde(rename = "seq")]
    pub sequence: i64,
    pub time: DateTime<Utc>,
}

#[derive(Debug)]
pub enum Frame {
    Commit(CommitBody),
    Account(AccountBody),
    Identity(IdentityBody),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("header: {0}")]
    Header(#[from] ciborium::de::Error<std::io::Error>),
    #[error("body: {0}")]
    Body(#[from] serde_ipld_dagcbor::DecodeError<std::io::Error>),
}

/// Parses one websocket binary frame into a typed [`Frame`]. Returns `Ok(None)`
/// for frame types this pipeline does not act on (`#sync`, `#info`, legacy
/// `#handle`/`#tombstone`) and for unrecognized header types, matching
/// `rsky-firehose/src/firehose.rs::read`'s skip-and-log behavior (spec.md
/// §4.1 "malformed frame → log and skip").
pub fn decode_frame(data: &[u8]) -> Result<Option<Frame>, DecodeError> {
    let mut reader = Cursor::new(data);
    let header = ciborium::de::from_reader::<FrameHeader, _>(&mut reader)?;

    let frame = match header.type_.as_str() {
        "#commit" => Frame::Commit(serde_ipld_dagcbor::from_reader(&mut reader)?),
        "#account" => Frame::Account(serde_ipld_dagcbor::from_reader(&mut reader)?),
        "#identity" => Frame::Identity(serde_ipld_dagcbor::from_reader(&mut reader)?),
        "#sync" | "#info" | "#handle" | "#tombstone" => return Ok(None),
        other => {
            tracing::warn!(header = other, "unknown firehose frame type");
            return Ok(None);
        }
    };

    Ok(Some(frame))
}

/// Decodes the CAR-encoded blocks of a commit and returns, per op, the
/// JSON-decoded record body for ops whose `cid` is present (creates and
/// updates; deletes carry no block). Unreadable individual blocks are
/// skipped rather than failing the whole commit.
pub fn decode_commit_records(commit: &CommitBody) -> HashMap<Cid, Value> {
    let mut reader = Cursor::new(commit.blocks.as_slice());
    let Ok(_header) = car::read_header(&mut reader) else {
        return HashMap::new();
    };
    let Ok(blocks) = car::read_blocks(&mut reader) else {
        return HashMap::new();
    };

    blocks
        .into_iter()
        .filter_map(|(cid, bytes)| {
            serde_ipld_dagcbor::from_slice::<Value>(&bytes)
                .ok()
                .map(|value| (cid, value))
        })
        .collect()
}

/// Splits a commit op's `path` (`"<collection>/<rkey>"`) into its parts.
pub fn split_path(path: &str) -> Option<(&str, &str)> {
    path.split_once('/')
}
