//! `X-API-Key` request guard, generalized from `rsky-feedgen::routes::ApiKey`
//! (header `X-RSKY-KEY`, key sourced from `env::var("RSKY_API_KEY")`) to read
//! the configured key from managed state instead of the environment
//! directly, and to treat an empty configured key as "auth disabled"
//! (spec.md §6: "Auth: header `X-API-Key` must equal configured key, or key
//! is empty (disabled)").

use std::sync::Arc;

use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};

use crate::state::AppState;

#[allow(dead_code)]
pub struct ApiKey;

#[derive(Debug)]
pub enum ApiKeyError {
    Missing,
    Invalid,
    Unconfigured,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ApiKey {
    type Error = ApiKeyError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(app_state) = req.guard::<&State<Arc<AppState>>>().await.succeeded() else {
            return Outcome::Error((Status::InternalServerError, ApiKeyError::Unconfigured));
        };

        if app_state.api_key.is_empty() {
            return Outcome::Success(ApiKey);
        }

        match req.headers().get_one("X-API-Key") {
            None => Outcome::Error((Status::Unauthorized, ApiKeyError::Missing)),
            Some(key) if key == app_state.api_key => Outcome::Success(ApiKey),
            Some(_) => Outcome::Error((Status::Unauthorized, ApiKeyError::Invalid)),
        }
    }
}
