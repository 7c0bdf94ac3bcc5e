//! The query service: identity resolution, interaction aggregation, and the
//! circles renderer, served behind an authenticated HTTP API with a
//! semaphore + result cache collapsing concurrent duplicate requests.
//!
//! Generalized from `rsky-feedgen`'s feed-skeleton/cursor/queue API: same
//! `ApiKey` guard shape, CORS fairing, typed catchers, and figment launch,
//! aimed at a different route surface.

pub mod auth;
pub mod models;
pub mod routes;
pub mod state;
