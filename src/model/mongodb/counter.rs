use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::common::election::ElectionId;
use crate::model::mongodb::Coll;

/// ID of the counter that assigns election IDs.
pub const ELECTION_ID_COUNTER_ID: &str = "election_ids";

/// ID of the counter that assigns candidate IDs within the given election.
pub fn candidate_counter_id(election_id: ElectionId) -> String {
    format!("candidates_{election_id}")
}

/// A counter object used to implement auto-increment IDs, keyed by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u64,
}

impl Counter {
    /// Create a new `Counter` with the given ID, starting at the given value.
    pub fn new(id: impl Into<String>, start: u64) -> Self {
        Self {
            id: id.into(),
            next: start,
        }
    }

    /// Atomically retrieve the next value of the counter with the given ID.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u64> {
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options: FindOneAndUpdateOptions = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await?
            .ok_or_else(|| Error::not_found(format!("Counter '{id}'")))?;
        Ok(counter.next)
    }
}

/// Ensure the global election ID counter exists, starting at 1.
///
/// This operation is idempotent.
pub async fn ensure_election_id_counter_exists(counters: &Coll<Counter>) -> Result<()> {
    let update = doc! {
        "$setOnInsert": { "next": 1_i64 },
    };
    let options = UpdateOptions::builder().upsert(true).build();
    counters
        .update_one(doc! { "_id": ELECTION_ID_COUNTER_ID }, update, options)
        .await?;
    Ok(())
}
