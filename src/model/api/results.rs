use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::election::{CandidateId, ElectionId, ElectionState},
    db::Election,
};

/// Vote count for a single candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTally {
    /// Candidate unique ID within this election.
    pub candidate_id: CandidateId,
    /// Number of votes for this candidate.
    pub count: u64,
}

/// Tallied results for an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionResults {
    /// Election unique ID.
    pub election_id: ElectionId,
    /// Election state at the moment of tallying.
    pub state: ElectionState,
    /// Per-candidate counts in candidate ID order. Every candidate appears,
    /// including those with zero votes.
    pub per_candidate: Vec<CandidateTally>,
    /// Total number of votes cast.
    pub total: u64,
    /// The leading candidate. Absent when no votes have been cast or the
    /// election has no candidates; ties break to the lowest candidate ID.
    pub winner_id: Option<CandidateId>,
}

impl ElectionResults {
    /// Assemble results from raw per-candidate counts.
    pub fn assemble(
        election: &Election,
        counts: &HashMap<CandidateId, u64>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut per_candidate = election
            .candidates
            .iter()
            .map(|candidate| CandidateTally {
                candidate_id: candidate.id,
                count: counts.get(&candidate.id).copied().unwrap_or(0),
            })
            .collect::<Vec<_>>();
        per_candidate.sort_by_key(|tally| tally.candidate_id);

        let total = per_candidate.iter().map(|tally| tally.count).sum();
        let winner_id = if total == 0 {
            None
        } else {
            per_candidate
                .iter()
                .max_by_key(|tally| (tally.count, Reverse(tally.candidate_id)))
                .map(|tally| tally.candidate_id)
        };

        Self {
            election_id: election.id,
            state: election.metadata.state_at(now),
            per_candidate,
            total,
            winner_id,
        }
    }
}
