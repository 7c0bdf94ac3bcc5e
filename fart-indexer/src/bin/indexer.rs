use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use fart_common::{Config, Shutdown};
use fart_identity::IdentityResolver;
use fart_indexer::{indexer::Indexer, metrics};
use fart_queue::QueueClient;
use fart_store::StoreClient;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();
    fart_common::init_tracing();

    info!("starting indexer");

    let shutdown = Arc::new(Shutdown::new());
    tokio::spawn(shutdown.clone().listen_for_signals());

    let queue = QueueClient::connect(&config.nats_uri).await?;
    let store = StoreClient::connect(&config.mongo_uri, &config.fart_db).await?;
    store.ensure_indexes().await?;

    let subscription = queue
        .pull_subscribe(
            &config.nats_stream,
            &config.indexer_consumer,
            &format!("{}.>", config.firehose_subject_prefix),
        )
        .await?;

    let identity = Arc::new(IdentityResolver::new());

    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        use warp::Filter;

        let metrics_route = warp::path!("metrics").map(|| match metrics::encode_metrics() {
            Ok(body) => warp::reply::with_status(body, warp::http::StatusCode::OK),
            Err(error) => {
                error!(%error, "failed to encode metrics");
                warp::reply::with_status(
                    error.to_string(),
                    warp::http::StatusCode::INTERNAL_SERVER_ERROR,
                )
            }
        });
        let health_route = warp::path!("health").map(|| "ok");

        info!(port = metrics_port, "metrics server starting");
        warp::serve(metrics_route.or(health_route))
            .run(([0, 0, 0, 0], metrics_port))
            .await;
    });

    if !config.indexer_enable {
        info!("INDEXER_ENABLE is false, running in dry-run mode (decode only, no writes)");
    }

    let worker = Indexer::new(
        subscription,
        store,
        identity,
        config.indexer_batch_size,
        config.indexer_concurrency,
        config.indexer_enable,
    );

    worker.run(&shutdown).await?;

    info!("indexer shut down");
    Ok(())
}
