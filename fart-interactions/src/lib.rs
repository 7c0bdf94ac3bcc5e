pub mod aggregate;
pub mod extract;

pub use aggregate::{get_interactions, Interactions, RankedCounterparty};
pub use extract::{extract, extract_account, extract_identity, Operation};
