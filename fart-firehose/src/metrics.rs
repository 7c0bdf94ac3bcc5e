//! Observability counters (spec.md §4.1 "Observability counters"), served on
//! a `warp` `/metrics` + `/health` endpoint alongside the indexer's own,
//! mirroring `rsky-indexer`'s warp+prometheus pairing.

use prometheus::{HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

pub struct Metrics {
    pub registry: Registry,
    pub bytes_total: IntCounter,
    pub events_total: IntCounterVec,
    pub post_langs: IntCounterVec,
    pub accounts_total: IntCounter,
    pub identities_total: IntCounter,
    pub commit_lag: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let bytes_total = IntCounter::new("firehose_bytes_total", "bytes received").unwrap();
        let events_total = IntCounterVec::new(
            Opts::new("firehose_events_total", "events by operation and collection"),
            &["operation", "collection"],
        )
        .unwrap();
        let post_langs = IntCounterVec::new(
            Opts::new("firehose_post_languages_total", "post language histogram"),
            &["lang"],
        )
        .unwrap();
        let accounts_total = IntCounter::new("firehose_accounts_total", "account events").unwrap();
        let identities_total =
            IntCounter::new("firehose_identities_total", "identity events").unwrap();
        let commit_lag = HistogramVec::new(
            prometheus::HistogramOpts::new("firehose_commit_lag_seconds", "commit time lag"),
            &["source"],
        )
        .unwrap();

        registry.register(Box::new(bytes_total.clone())).unwrap();
        registry.register(Box::new(events_total.clone())).unwrap();
        registry.register(Box::new(post_langs.clone())).unwrap();
        registry.register(Box::new(accounts_total.clone())).unwrap();
        registry.register(Box::new(identities_total.clone())).unwrap();
        registry.register(Box::new(commit_lag.clone())).unwrap();

        Self {
            registry,
            bytes_total,
            events_total,
            post_langs,
            accounts_total,
            identities_total,
            commit_lag,
        }
    }

    pub fn encode(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&families, &mut buf).unwrap();
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
