use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::{serde_helpers::chrono_datetime_as_bson_datetime, to_bson, Bson};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{
        election::{CandidateId, ElectionId},
        wallet::WalletAddress,
    },
    mongodb::Id,
};

/// Core vote data: the authoritative record of one voter's choice in one
/// election.
///
/// The unique index on `(election_id, voter_wallet)` makes the authority's
/// one-vote rule a database fact rather than a handler convention.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct VoteCore {
    /// The election voted in.
    pub election_id: ElectionId,
    /// The candidate voted for.
    pub candidate_id: CandidateId,
    /// The wallet that cast the vote.
    pub voter_wallet: WalletAddress,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
    /// Whether the ledger mirror write has succeeded yet. Always `Confirmed`
    /// when mirroring is disabled.
    pub ledger_state: LedgerState,
    /// Transaction ID of the ledger mirror write, if mirroring is enabled and
    /// the write has succeeded.
    pub ledger_txid: Option<String>,
}

impl VoteCore {
    /// Create a new vote, cast now, not yet mirrored.
    pub fn new(
        election_id: ElectionId,
        candidate_id: CandidateId,
        voter_wallet: WalletAddress,
    ) -> Self {
        Self {
            election_id,
            candidate_id,
            voter_wallet,
            cast_at: Utc::now(),
            ledger_state: LedgerState::Pending,
            ledger_txid: None,
        }
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

/// Mirror status of a vote on the external ledger.
///
/// A `Pending` vote still counts; the mirror is an audit trail, not the
/// source of truth.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerState {
    /// Not yet written to the ledger.
    Pending,
    /// Written to the ledger, or mirroring is disabled.
    Confirmed,
}

impl From<LedgerState> for Bson {
    fn from(state: LedgerState) -> Self {
        to_bson(&state).expect("Serialisation is infallible")
    }
}
