use chrono::{DateTime, Utc};
use mongodb::bson::{serde_helpers::chrono_datetime_as_bson_datetime, to_bson, Bson};
use serde::{Deserialize, Serialize};

use crate::model::common::election::{CandidateId, ElectionId, ElectionState};

/// An election, as stored in the database.
///
/// Unlike most collections, elections use sequential integer IDs so they can
/// appear in human-facing URLs.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Election {
    /// Unique ID.
    #[serde(rename = "_id")]
    pub id: ElectionId,
    /// Top-level metadata.
    #[serde(flatten)]
    pub metadata: ElectionMetadata,
    /// Candidates in ID order.
    pub candidates: Vec<Candidate>,
}

impl Election {
    /// Create a new election with no candidates yet.
    pub fn new(id: ElectionId, metadata: ElectionMetadata) -> Self {
        Self {
            id,
            metadata,
            candidates: Vec::new(),
        }
    }

    /// Look up a candidate by ID.
    pub fn candidate(&self, candidate_id: CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == candidate_id)
    }
}

/// A view on just the election's top-level metadata.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ElectionMetadata {
    /// Election title.
    pub title: String,
    /// Election start time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    /// Election end time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    /// The result snapshot, recorded at most once. `None` serialises to BSON
    /// null so update filters can match on it directly.
    pub finalized: Option<FinalizedTally>,
}

impl ElectionMetadata {
    /// The election's lifecycle state as of the given instant.
    ///
    /// States are never stored; they are fully determined by the voting window
    /// and the result snapshot. The window is inclusive at both ends.
    pub fn state_at(&self, now: DateTime<Utc>) -> ElectionState {
        if now < self.start_time {
            ElectionState::Draft
        } else if now <= self.end_time {
            ElectionState::Active
        } else if self.finalized.is_some() {
            ElectionState::Finalized
        } else {
            ElectionState::Closed
        }
    }
}

/// A candidate standing in a particular election.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique ID within this election, assigned in creation order.
    pub id: CandidateId,
    /// Candidate display name.
    pub name: String,
}

impl From<Candidate> for Bson {
    fn from(candidate: Candidate) -> Self {
        to_bson(&candidate).expect("Serialisation is infallible")
    }
}

/// The permanent record of an election's result.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct FinalizedTally {
    /// The winning candidate, absent if no votes were cast.
    pub winner_id: Option<CandidateId>,
    /// Total number of votes counted.
    pub total: u64,
    /// When the result was recorded.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub finalized_at: DateTime<Utc>,
}

impl From<FinalizedTally> for Bson {
    fn from(tally: FinalizedTally) -> Self {
        to_bson(&tally).expect("Serialisation is infallible")
    }
}
