use chrono::Utc;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document},
    options::FindOptions,
};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{AuthToken, ElectionDescription, ElectionResults, ElectionSummary},
        common::election::ElectionId,
        db::{Election, Vote},
        mongodb::Coll,
    },
};

use super::common::{candidate_counts, election_by_id};

pub fn routes() -> Vec<Route> {
    routes![
        elections_admin,
        elections_non_admin,
        election_admin,
        election_non_admin,
        election_results,
    ]
}

/// List all elections, drafts included.
#[get("/elections", rank = 1)]
pub async fn elections_admin(
    _token: AuthToken,
    elections: Coll<Election>,
) -> Result<Json<Vec<ElectionSummary>>> {
    election_summaries(&elections, doc! {}).await
}

/// List the elections that have started.
#[get("/elections", rank = 2)]
pub async fn elections_non_admin(elections: Coll<Election>) -> Result<Json<Vec<ElectionSummary>>> {
    election_summaries(&elections, started_filter()).await
}

/// Get a specific election in full.
#[get("/elections/<election_id>", rank = 1)]
pub async fn election_admin(
    _token: AuthToken,
    election_id: ElectionId,
    elections: Coll<Election>,
) -> Result<Json<ElectionDescription>> {
    let election = election_by_id(election_id, &elections).await?;
    Ok(Json(election.into()))
}

/// Get a specific election in full, if it has started.
#[get("/elections/<election_id>", rank = 2)]
pub async fn election_non_admin(
    election_id: ElectionId,
    elections: Coll<Election>,
) -> Result<Json<ElectionDescription>> {
    let election = visible_election(election_id, &elections).await?;
    Ok(Json(election.into()))
}

/// Get the current tally for an election: live standings while it is active,
/// the outcome once it has closed.
///
/// Deliberately public. Visibility follows the election itself, so a draft's
/// results are as hidden as the draft.
#[get("/elections/<election_id>/results")]
pub async fn election_results(
    election_id: ElectionId,
    elections: Coll<Election>,
    votes: Coll<Vote>,
) -> Result<Json<ElectionResults>> {
    let election = visible_election(election_id, &elections).await?;
    let counts = candidate_counts(election_id, &votes).await?;
    Ok(Json(ElectionResults::assemble(
        &election,
        &counts,
        Utc::now(),
    )))
}

/// Elections whose start time has passed, i.e. everything except drafts.
fn started_filter() -> Document {
    doc! {
        "start_time": { "$lte": BsonDateTime::now() },
    }
}

async fn visible_election(election_id: ElectionId, elections: &Coll<Election>) -> Result<Election> {
    let mut filter = started_filter();
    filter.insert("_id", election_id);
    elections
        .find_one(filter, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))
}

async fn election_summaries(
    elections: &Coll<Election>,
    filter: Document,
) -> Result<Json<Vec<ElectionSummary>>> {
    let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
    let summaries = elections
        .find(filter, options)
        .await?
        .map_ok(ElectionSummary::from)
        .try_collect::<Vec<_>>()
        .await?;
    Ok(Json(summaries))
}
