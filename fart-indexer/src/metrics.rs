use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    pub static ref EVENTS_PROCESSED_TOTAL: IntCounter = register_int_counter!(
        "indexer_events_processed_total",
        "Total events processed by indexer"
    )
    .unwrap();

    pub static ref EVENTS_BY_COLLECTION_TOTAL: IntCounterVec = register_int_counter_vec!(
        "indexer_events_by_collection_total",
        "Events processed by collection and operation",
        &["collection", "operation"]
    )
    .unwrap();

    pub static ref WRITE_OPS_TOTAL: IntCounter = register_int_counter!(
        "indexer_write_ops_total",
        "Total WriteOps accumulated into batches"
    )
    .unwrap();

    pub static ref ERRORS_TOTAL: IntCounter =
        register_int_counter!("indexer_errors_total", "Total processing errors encountered")
            .unwrap();

    pub static ref BATCH_SIZE: IntGauge =
        register_int_gauge!("indexer_batch_size", "Size of the most recently flushed batch")
            .unwrap();
}

pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
