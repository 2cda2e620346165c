use std::collections::HashMap;

use mongodb::bson::doc;
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    common::election::{CandidateId, ElectionId},
    db::{Election, Vote},
    mongodb::{u32_id_filter, Coll},
};

/// Look up an election by ID, regardless of its state.
pub async fn election_by_id(
    election_id: ElectionId,
    elections: &Coll<Election>,
) -> Result<Election> {
    elections
        .find_one(u32_id_filter(election_id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{}'", election_id)))
}

/// Count the admitted votes for each candidate in a single cursor pass.
/// Candidates with no votes do not appear in the map.
pub async fn candidate_counts(
    election_id: ElectionId,
    votes: &Coll<Vote>,
) -> Result<HashMap<CandidateId, u64>> {
    let filter = doc! {
        "election_id": election_id,
    };
    let mut counts = HashMap::new();
    let mut cursor = votes.find(filter, None).await?;
    while let Some(vote) = cursor.try_next().await? {
        *counts.entry(vote.candidate_id).or_insert(0) += 1;
    }
    Ok(counts)
}
