//! Periodic leaderboard snapshots written to `dynamic_data`, grounded in
//! `original_source/backend/services/scheduler/main.py`.

pub mod jobs;
pub mod profiles;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("store error: {0}")]
    Store(#[from] fart_store::StoreError),
    #[error("cron job scheduling failed: {0}")]
    Cron(String),
}
