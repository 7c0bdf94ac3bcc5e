#[macro_use]
extern crate serde_derive;
extern crate serde;

pub mod aturi;
pub mod aturi_validation;
pub mod datetime;
pub mod did;
pub mod handle;
pub mod nsid;
pub mod record_key;
pub mod tid;
