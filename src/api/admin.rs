use chrono::Utc;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    Client,
};
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            AuthToken, CandidateDescription, CandidateSpec, ElectionDescription, ElectionResults,
            ElectionSpec,
        },
        common::election::{CandidateId, ElectionId, ElectionState},
        db::{Election, FinalizedTally, Vote},
        mongodb::{candidate_counter_id, Coll, Counter, ELECTION_ID_COUNTER_ID},
    },
};

use super::common::{candidate_counts, election_by_id};

pub fn routes() -> Vec<Route> {
    routes![create_election, add_candidate, finalize_election]
}

/// Create a new election from the given specification.
#[post("/elections", data = "<spec>", format = "json")]
pub async fn create_election(
    _token: AuthToken,
    spec: Json<ElectionSpec>,
    elections: Coll<Election>,
    counters: Coll<Counter>,
    db_client: &State<Client>,
) -> Result<Json<ElectionDescription>> {
    spec.validate()?;

    // The increment is atomic on its own; an aborted transaction below just
    // skips an ID.
    let election_id = Counter::next(&counters, ELECTION_ID_COUNTER_ID).await? as ElectionId;
    let election = spec.0.into_election(election_id);

    // The election and its candidate ID counter appear together or not at all.
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;
    elections
        .insert_one_with_session(&election, None, &mut session)
        .await?;
    counters
        .insert_one_with_session(
            Counter::new(candidate_counter_id(election_id), 1),
            None,
            &mut session,
        )
        .await?;
    session.commit_transaction().await?;

    info!(
        "Created election {} '{}'",
        election.id, election.metadata.title
    );
    Ok(Json(election.into()))
}

/// Add a candidate to an election that has not yet started.
#[post("/elections/<election_id>/candidates", data = "<spec>", format = "json")]
pub async fn add_candidate(
    _token: AuthToken,
    election_id: ElectionId,
    spec: Json<CandidateSpec>,
    elections: Coll<Election>,
    counters: Coll<Counter>,
) -> Result<Json<CandidateDescription>> {
    spec.validate()?;
    // Distinguish a missing election from a started one up front.
    election_by_id(election_id, &elections).await?;

    let candidate_id =
        Counter::next(&counters, &candidate_counter_id(election_id)).await? as CandidateId;
    let candidate = spec.0.into_candidate(candidate_id);

    // Only a not-yet-started election accepts the push; checking the window
    // inside the filter closes the race with the start time passing.
    let filter = doc! {
        "_id": election_id,
        "start_time": { "$gt": BsonDateTime::now() },
    };
    let update = doc! {
        "$push": { "candidates": candidate.clone() },
    };
    let result = elections.update_one(filter, update, None).await?;
    if result.modified_count != 1 {
        return Err(Error::Conflict(format!(
            "Election {election_id} has started; its candidate list is frozen"
        )));
    }

    info!(
        "Added candidate {} '{}' to election {}",
        candidate.id, candidate.name, election_id
    );
    Ok(Json(candidate.into()))
}

/// Tally a closed election and record the result.
///
/// Finalizing twice is allowed as long as the recorded winner would not
/// change; otherwise the second attempt is rejected.
#[post("/elections/<election_id>/finalize")]
pub async fn finalize_election(
    _token: AuthToken,
    election_id: ElectionId,
    elections: Coll<Election>,
    votes: Coll<Vote>,
) -> Result<Json<ElectionResults>> {
    let mut election = election_by_id(election_id, &elections).await?;

    let now = Utc::now();
    if election.metadata.state_at(now) < ElectionState::Closed {
        return Err(Error::State(format!(
            "Election {election_id} has not closed yet; cannot finalize"
        )));
    }

    let counts = candidate_counts(election_id, &votes).await?;
    let results = ElectionResults::assemble(&election, &counts, now);

    if let Some(existing) = &election.metadata.finalized {
        // Re-finalizing is idempotent only if it would record the same winner.
        if existing.winner_id == results.winner_id {
            return Ok(Json(results));
        }
        return Err(Error::Conflict(format!(
            "Election {election_id} is already finalized with a different winner"
        )));
    }

    let tally = FinalizedTally {
        winner_id: results.winner_id,
        total: results.total,
        finalized_at: now,
    };
    // First write wins; the filter refuses to overwrite an existing snapshot.
    let filter = doc! {
        "_id": election_id,
        "finalized": null,
    };
    let update = doc! {
        "$set": { "finalized": tally.clone() },
    };
    let result = elections.update_one(filter, update, None).await?;
    if result.modified_count != 1 {
        // Lost a race with a concurrent finalize; fetch what was recorded.
        let election = election_by_id(election_id, &elections).await?;
        let same_winner = election
            .metadata
            .finalized
            .as_ref()
            .map(|recorded| recorded.winner_id == results.winner_id)
            .unwrap_or(false);
        if same_winner {
            return Ok(Json(ElectionResults::assemble(&election, &counts, now)));
        }
        return Err(Error::Conflict(format!(
            "Election {election_id} is already finalized with a different winner"
        )));
    }

    election.metadata.finalized = Some(tally);
    info!(
        "Finalized election {} with winner {:?} over {} votes",
        election_id, results.winner_id, results.total
    );
    Ok(Json(ElectionResults::assemble(&election, &counts, now)))
}
