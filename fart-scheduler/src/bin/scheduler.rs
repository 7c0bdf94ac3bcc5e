use std::sync::Arc;

use anyhow::Result;
use fart_common::{Config, Shutdown};
use fart_scheduler::jobs;
use fart_store::StoreClient;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::load()?;
    fart_common::init_tracing();

    info!("starting scheduler");

    let shutdown = Arc::new(Shutdown::new());
    tokio::spawn(shutdown.clone().listen_for_signals());

    let store = Arc::new(StoreClient::connect(&config.mongo_uri, &config.fart_db).await?);

    let scheduler = JobScheduler::new().await?;

    let interactions_store = store.clone();
    scheduler
        .add(Job::new_async(
            config.chrono_trigger_top_interactions_interval.as_str(),
            move |_uuid, _lock| {
                let store = interactions_store.clone();
                Box::pin(async move {
                    if let Err(error) = jobs::update_top_interactions(&store).await {
                        error!(%error, "update_top_interactions failed");
                    }
                })
            },
        )?)
        .await?;

    let blocks_store = store.clone();
    scheduler
        .add(Job::new_async(
            config.chrono_trigger_top_blocks_interval.as_str(),
            move |_uuid, _lock| {
                let store = blocks_store.clone();
                Box::pin(async move {
                    if let Err(error) = jobs::update_top_blocks(&store).await {
                        error!(%error, "update_top_blocks failed");
                    }
                })
            },
        )?)
        .await?;

    scheduler.start().await?;

    while !shutdown.is_triggered() {
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }

    scheduler.shutdown().await?;
    info!("scheduler shut down");
    Ok(())
}
