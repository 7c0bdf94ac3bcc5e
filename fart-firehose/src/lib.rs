pub mod car;
pub mod decoder;
pub mod metrics;

/// NSIDs this pipeline indexes (spec.md §4.1 point 3 "interested set").
pub const INTERESTED_COLLECTIONS: [&str; 5] = [
    "app.bsky.actor.profile",
    "app.bsky.feed.like",
    "app.bsky.feed.post",
    "app.bsky.feed.repost",
    "app.bsky.graph.block",
];

pub fn is_interested(collection: &str) -> bool {
    INTERESTED_COLLECTIONS.contains(&collection)
}
