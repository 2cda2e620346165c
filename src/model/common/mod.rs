//! Types shared between the API and database layers.

pub mod election;
pub mod wallet;
