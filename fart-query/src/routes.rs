//! The 5-route HTTP surface (spec.md §6): `GET /`, `POST /interactions`,
//! `GET /circles`, `GET /dd/{name}`, `GET /collStats`.

use std::sync::Arc;

use bson::{doc, Document};
use chrono::Utc;
use fart_interactions::{Interactions, RankedCounterparty};
use fart_store::collections;
use rocket::http::{ContentType, Status};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Responder, State};

use crate::auth::ApiKey;
use crate::models::{CirclesSource, CollStatsResponse, ErrorResponse, InteractionsRequest};
use crate::state::{AppState, InteractionsResult};

type ErrorJson = status::Custom<Json<ErrorResponse>>;

fn err(status: Status, code: &str, message: impl Into<String>) -> ErrorJson {
    status::Custom(status, Json(ErrorResponse::new(code, message)))
}

#[rocket::get("/")]
pub fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({}))
}

#[rocket::post("/interactions", format = "json", data = "<body>")]
pub async fn interactions(
    body: Json<InteractionsRequest>,
    _key: ApiKey,
    state: &State<Arc<AppState>>,
) -> Result<Json<InteractionsResult>, ErrorJson> {
    let identity = state
        .identity
        .resolve_actor(&body.handle)
        .await
        .map_err(|_| err(Status::BadRequest, "unknown_user", "user not found"))?;

    if let Some(cached) = state.interactions_cache.get(&identity.did).await {
        return Ok(Json(cached));
    }

    if state.semaphore.get(&identity.did).await.is_some() {
        return Err(err(
            Status::BadRequest,
            "in_flight",
            "request for this user is already in progress, try again shortly",
        ));
    }
    state.semaphore.insert(identity.did.clone(), ()).await;

    let interactions = fart_interactions::get_interactions(&state.store, &identity.did, None).await;
    let result = InteractionsResult {
        did: identity.did.clone(),
        handle: identity.handle.clone(),
        interactions,
    };

    state
        .interactions_cache
        .insert(identity.did.clone(), result.clone())
        .await;
    state.semaphore.invalidate(&identity.did).await;

    Ok(Json(result))
}

/// Merges `sent`/`rcvd` per `source`, matching `circles.py`'s
/// `_generate_image_interactions` (which always sums across both
/// directions) generalized to respect the `source` query param spec.md §6
/// names.
fn select_counterparties(interactions: &Interactions, source: &CirclesSource) -> Vec<RankedCounterparty> {
    let mut ranked = match source {
        CirclesSource::Sent => interactions.sent.clone(),
        CirclesSource::Rcvd => interactions.rcvd.clone(),
        CirclesSource::Both => {
            let mut merged: std::collections::HashMap<String, RankedCounterparty> =
                std::collections::HashMap::new();
            for rc in interactions.sent.iter().chain(interactions.rcvd.iter()) {
                let entry = merged
                    .entry(rc.id.clone())
                    .or_insert_with(|| RankedCounterparty {
                        id: rc.id.clone(),
                        ..Default::default()
                    });
                entry.l += rc.l;
                entry.r += rc.r;
                entry.p += rc.p;
                entry.c += rc.c;
                entry.t += rc.t;
            }
            merged.into_values().collect()
        }
    };
    ranked.sort_by(|a, b| b.t.cmp(&a.t));
    ranked
}

async fn avatar_url(store: &fart_store::StoreClient, did: &str) -> Option<String> {
    let profiles = store.collection::<Document>(collections::PROFILES);
    let doc = profiles.find_one(doc! { "_id": did }).await.ok().flatten()?;
    doc.get_str("avatar").ok().map(str::to_string)
}

async fn fetch_avatar(http: &reqwest::Client, url: Option<String>) -> Option<Vec<u8>> {
    let url = url?;
    let response = http.get(&url).send().await.ok()?;
    response.bytes().await.ok().map(|b| b.to_vec())
}

#[derive(Responder)]
#[response(content_type = "image/png")]
pub struct PngImage(Vec<u8>);

#[rocket::get("/circles?<actor>&<source>")]
pub async fn circles(
    actor: &str,
    source: Option<&str>,
    state: &State<Arc<AppState>>,
) -> Result<PngImage, ErrorJson> {
    let source: CirclesSource = source
        .and_then(|s| s.parse().ok())
        .unwrap_or(CirclesSource::Both);

    let identity = state
        .identity
        .resolve_actor(actor)
        .await
        .map_err(|_| err(Status::NotFound, "unknown_user", format!("user not found: {actor}")))?;

    let start_date = Utc::now() - chrono::Duration::days(fart_interactions::aggregate::DEFAULT_WINDOW_DAYS);
    let interactions = fart_interactions::get_interactions(&state.store, &identity.did, None).await;
    let ranked = select_counterparties(&interactions, &source);

    let topk: Vec<&RankedCounterparty> = ranked.iter().take(state.circles_topk).collect();
    if topk.len() <= 1 {
        return Err(err(
            Status::InternalServerError,
            "not_enough_data",
            format!("error generating circles {}@{}", identity.handle, identity.did),
        ));
    }

    let main_avatar_url = avatar_url(&state.store, &identity.did).await;
    let main_avatar = fetch_avatar(&state.http, main_avatar_url).await;

    let counterparty_avatars = futures::future::join_all(topk.iter().map(|rc| async move {
        let url = avatar_url(&state.store, &rc.id).await;
        fetch_avatar(&state.http, url).await
    }))
    .await;

    let png = fart_circles::render(
        main_avatar.as_deref(),
        &counterparty_avatars,
        start_date,
        "circles",
    )
    .map_err(|e| {
        err(
            Status::InternalServerError,
            "render_failed",
            format!("error generating circles {}@{}: {e}", identity.handle, identity.did),
        )
    })?;

    Ok(PngImage(png))
}

const DYNAMIC_DATA_NAMES: [&str; 2] = ["top_interactions", "top_blocks"];

#[rocket::get("/dd/<name>")]
pub async fn dynamic_data(name: &str, state: &State<Arc<AppState>>) -> Result<Json<Document>, ErrorJson> {
    if !DYNAMIC_DATA_NAMES.contains(&name) {
        return Err(err(Status::NotFound, "not_found", "unknown dynamic data name"));
    }

    if let Some(cached) = state.dynamic_data_cache.get(name).await {
        return Ok(Json(cached));
    }

    let collection = state.store.collection::<Document>(collections::DYNAMIC_DATA);
    let mut cursor = collection
        .find(doc! { "name": name })
        .sort(doc! { "generated_at": -1 })
        .limit(1)
        .await
        .map_err(|e| err(Status::InternalServerError, "store_error", e.to_string()))?;

    use futures::TryStreamExt;
    let latest = cursor
        .try_next()
        .await
        .map_err(|e| err(Status::InternalServerError, "store_error", e.to_string()))?
        .ok_or_else(|| err(Status::NotFound, "not_found", "no snapshot yet"))?;

    state
        .dynamic_data_cache
        .insert(name.to_string(), latest.clone())
        .await;

    Ok(Json(latest))
}

const STATS_COLLECTIONS: [&str; 6] = [
    collections::INTERACTIONS_LIKE,
    collections::INTERACTIONS_REPOST,
    collections::INTERACTIONS_POST,
    collections::PROFILES,
    collections::BLOCKS,
    collections::POSTS,
];

#[rocket::get("/collStats")]
pub async fn coll_stats(state: &State<Arc<AppState>>) -> Json<CollStatsResponse> {
    let mut stats = std::collections::HashMap::new();
    for name in STATS_COLLECTIONS {
        let collection = state.store.collection::<Document>(name);
        let count = collection.count_documents(doc! {}).await.unwrap_or(0);
        stats.insert(name.to_string(), count as i64);
    }
    Json(CollStatsResponse(stats))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<ErrorResponse> {
    Json(ErrorResponse::new("not_found", "Not Found"))
}

#[rocket::catch(400)]
pub fn bad_request() -> Json<ErrorResponse> {
    Json(ErrorResponse::new("bad_request", "The request was improperly formed."))
}

#[rocket::catch(401)]
pub fn unauthorized() -> Json<ErrorResponse> {
    Json(ErrorResponse::new("unauthorized", "Request could not be processed."))
}

#[rocket::catch(422)]
pub fn unprocessable_entity() -> Json<ErrorResponse> {
    Json(ErrorResponse::new(
        "validation_error",
        "The request was well-formed but unable to be followed due to semantic errors.",
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<ErrorResponse> {
    Json(ErrorResponse::new("internal_error", "Internal error."))
}

#[rocket::catch(default)]
pub fn default_catcher() -> Json<ErrorResponse> {
    Json(ErrorResponse::new("internal_error", "Internal error."))
}

/// Catches all OPTIONS requests so the CORS fairing's response headers get
/// attached (`rsky-feedgen::main.rs::all_options`, unchanged).
#[rocket::options("/<_..>")]
pub fn all_options() {}

pub fn content_type_png() -> ContentType {
    ContentType::PNG
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rc(id: &str, t: i64) -> RankedCounterparty {
        RankedCounterparty {
            id: id.to_string(),
            t,
            ..Default::default()
        }
    }

    #[test]
    fn sent_only_uses_sent_list() {
        let interactions = Interactions {
            sent: vec![rc("a", 3), rc("b", 1)],
            rcvd: vec![rc("c", 9)],
        };
        let selected = select_counterparties(&interactions, &CirclesSource::Sent);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].id, "a");
    }

    #[test]
    fn both_merges_and_sums_shared_counterparties() {
        let interactions = Interactions {
            sent: vec![rc("a", 3), rc("b", 1)],
            rcvd: vec![rc("a", 5)],
        };
        let selected = select_counterparties(&interactions, &CirclesSource::Both);
        assert_eq!(selected.len(), 2);
        let a = selected.iter().find(|r| r.id == "a").unwrap();
        assert_eq!(a.t, 8);
    }

    #[test]
    fn both_sorts_by_total_descending() {
        let interactions = Interactions {
            sent: vec![rc("a", 1)],
            rcvd: vec![rc("b", 10)],
        };
        let selected = select_counterparties(&interactions, &CirclesSource::Both);
        assert_eq!(selected[0].id, "b");
    }
}
