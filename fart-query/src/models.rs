//! Request/response bodies for the HTTP surface, generalized from
//! `rsky-feedgen::models`'s per-route struct-per-shape convention
//! (`AlgoResponse`, `InternalErrorMessageResponse`, etc.) down to the
//! shapes spec.md §6 actually names.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct InteractionsRequest {
    pub handle: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CollStatsResponse(pub std::collections::HashMap<String, i64>);

#[derive(Debug, serde::Deserialize)]
pub enum CirclesSource {
    #[serde(rename = "from")]
    Sent,
    #[serde(rename = "to")]
    Rcvd,
    #[serde(rename = "both")]
    Both,
}

impl std::str::FromStr for CirclesSource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "from" => Ok(CirclesSource::Sent),
            "to" => Ok(CirclesSource::Rcvd),
            "both" => Ok(CirclesSource::Both),
            _ => Err(()),
        }
    }
}
