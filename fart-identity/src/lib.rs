//! Identity resolver adapter.
//!
//! Grounded in `original_source/backend/FART/aux.py`: `get_did` resolves a
//! "handle or DID" actor string to a `(handle, did)` pair by branching on the
//! `did:` prefix, and `get_db_profile` refreshes a stored profile copy when
//! the upstream one is newer. `rsky-identity` supplies the actual DID/handle
//! resolution machinery (PLC, DID:web, DNS/HTTP handle verification); this
//! crate only adds the caching wrapper and the two-operation adapter shape
//! spec.md §4.5 names.

use std::sync::Arc;
use std::time::Duration;

use bson::{doc, Bson, Document};
use chrono::Utc;
use fart_store::{collections, StoreClient};
use moka::future::Cache;
use rsky_identity::types::{DidCache, IdentityResolverOpts};
use rsky_identity::IdResolver;
use thiserror::Error;
use tokio::sync::Mutex;

const GET_PROFILE_ENDPOINT: &str = "https://public.api.bsky.app/xrpc/app.bsky.actor.getProfile";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("actor not found")]
    NotFound,
    #[error("resolution failed: {0}")]
    Resolution(#[from] anyhow::Error),
    #[error("store error: {0}")]
    Store(#[from] fart_store::StoreError),
}

/// A resolved actor identity, mirroring `FART/aux.py::get_did`'s
/// `(handle, did)` tuple.
#[derive(Debug, Clone)]
pub struct Identity {
    pub handle: String,
    pub did: String,
}

/// Wraps `rsky_identity::IdResolver` behind a mutex (the handle resolver's
/// `resolve` takes `&mut self`) plus a small in-memory result cache, keeping
/// the library's own resolvers as the source of truth.
pub struct IdentityResolver {
    inner: Mutex<IdResolver>,
    cache: Cache<String, Identity>,
    http: reqwest::Client,
}

impl IdentityResolver {
    pub fn new() -> Self {
        let inner = IdResolver::new(IdentityResolverOpts {
            timeout: Some(Duration::from_millis(3000)),
            plc_url: None,
            did_cache: Some(DidCache {
                stale_ttl: Duration::from_secs(3600),
                max_ttl: Duration::from_secs(86_400),
                cache: Default::default(),
            }),
            backup_nameservers: None,
        });

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            inner: Mutex::new(inner),
            cache: Cache::builder()
                .time_to_live(Duration::from_secs(600))
                .max_capacity(10_000)
                .build(),
            http,
        }
    }

    /// `ensure_resolve_handle(h) -> DID` (spec.md §4.5).
    pub async fn ensure_resolve_handle(&self, handle: &str) -> Result<String, IdentityError> {
        let mut resolver = self.inner.lock().await;
        resolver
            .handle
            .resolve(&handle.to_string())
            .await?
            .ok_or(IdentityError::NotFound)
    }

    /// `ensure_resolve_did(d) -> {also_known_as}` returning the canonical
    /// handle with the `at://` prefix stripped (spec.md §4.5).
    pub async fn ensure_resolve_did(&self, did: &str) -> Result<String, IdentityError> {
        let mut resolver = self.inner.lock().await;
        let doc = resolver
            .did
            .ensure_resolve(&did.to_string(), None)
            .await?;
        let handle = doc
            .also_known_as
            .and_then(|aka| aka.into_iter().next())
            .ok_or(IdentityError::NotFound)?;
        Ok(handle.trim_start_matches("at://").to_string())
    }

    /// Resolves a "handle or DID" actor string into `(handle, did)`,
    /// matching `FART/aux.py::get_did`'s branching exactly: `did:`-prefixed
    /// input resolves DID→handle; otherwise the leading `@` is stripped and
    /// the remainder resolves handle→DID.
    pub async fn resolve_actor(&self, actor: &str) -> Result<Identity, IdentityError> {
        if actor.is_empty() {
            return Err(IdentityError::NotFound);
        }

        if let Some(cached) = self.cache.get(actor).await {
            return Ok(cached);
        }

        let identity = if let Some(did) = actor.strip_prefix("did:").map(|_| actor) {
            let handle = self.ensure_resolve_did(did).await?;
            Identity {
                handle,
                did: did.to_string(),
            }
        } else {
            let handle = actor.trim_start_matches('@');
            let did = self.ensure_resolve_handle(handle).await?;
            Identity {
                handle: handle.to_string(),
                did,
            }
        };

        self.cache.insert(actor.to_string(), identity.clone()).await;
        Ok(identity)
    }

    /// Refreshes the stored profile document for `did` when the saved copy
    /// is stale, mirroring `FART/aux.py::get_db_profile`'s staleness check
    /// followed by a real `ctx.bsky.app.bsky.actor.get_profile` call. A
    /// failed upstream fetch leaves the stored copy untouched (including its
    /// `updated_at`) so the next call retries rather than going dark.
    pub async fn ensure_profile(
        self: &Arc<Self>,
        store: &StoreClient,
        did: &str,
    ) -> Result<Document, IdentityError> {
        let profiles = store.collection::<Document>(collections::PROFILES);
        let existing = profiles
            .find_one(doc! { "_id": did })
            .await
            .ok()
            .flatten();

        let fresh_enough = existing
            .as_ref()
            .and_then(|doc| doc.get_datetime("updated_at").ok())
            .map(|updated| Utc::now().signed_duration_since(updated.to_chrono()).num_minutes() < 60)
            .unwrap_or(false);
        if fresh_enough {
            return Ok(existing.unwrap());
        }

        let Some(mut set) = self.fetch_upstream_profile(did).await else {
            return existing.ok_or(IdentityError::NotFound);
        };
        set.insert("updated_at", bson::DateTime::now());

        profiles
            .update_one(
                doc! { "_id": did },
                doc! {
                    "$set": set,
                    "$setOnInsert": { "indexed_at": bson::DateTime::now() },
                },
            )
            .upsert(true)
            .await
            .map_err(fart_store::StoreError::from)?;

        profiles
            .find_one(doc! { "_id": did })
            .await
            .map_err(fart_store::StoreError::from)?
            .ok_or(IdentityError::NotFound)
    }

    /// `GET app.bsky.actor.getProfile` against the public, unauthenticated
    /// AT Protocol API, returning the response as a document ready to merge
    /// into the stored profile (`_id`/`did` deliberately dropped so the
    /// caller's own `_id` filter stays the merge key).
    async fn fetch_upstream_profile(&self, did: &str) -> Option<Document> {
        let response = self
            .http
            .get(GET_PROFILE_ENDPOINT)
            .query(&[("actor", did)])
            .send()
            .await
            .ok()?;
        let profile: serde_json::Value = response.json().await.ok()?;
        match bson::to_bson(&profile).ok()? {
            Bson::Document(mut fields) => {
                fields.remove("did");
                Some(fields)
            }
            _ => None,
        }
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}
