use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{
    common::election::{CandidateId, ElectionId, ElectionState},
    db::{Candidate, Election, ElectionMetadata, FinalizedTally},
};

pub const MIN_TITLE_LENGTH: usize = 3;
pub const MIN_CANDIDATE_NAME_LENGTH: usize = 2;

/// An election specification.
#[derive(Debug, Serialize, Deserialize)]
pub struct ElectionSpec {
    /// Election title.
    pub title: String,
    /// Election start time.
    pub start_time: DateTime<Utc>,
    /// Election end time.
    pub end_time: DateTime<Utc>,
}

impl ElectionSpec {
    /// Check the spec is acceptable: a meaningful title and a non-empty
    /// voting window.
    pub fn validate(&self) -> Result<(), Error> {
        if self.title.trim().len() < MIN_TITLE_LENGTH {
            return Err(Error::Validation(format!(
                "Election title must be at least {MIN_TITLE_LENGTH} characters"
            )));
        }
        if self.end_time <= self.start_time {
            return Err(Error::Validation(
                "Election end time must be after its start time".to_string(),
            ));
        }
        Ok(())
    }

    /// Convert this spec into a proper [`Election`] with the given unique ID.
    pub fn into_election(self, election_id: ElectionId) -> Election {
        Election::new(election_id, self.into())
    }
}

impl From<ElectionSpec> for ElectionMetadata {
    fn from(spec: ElectionSpec) -> Self {
        Self {
            title: spec.title,
            start_time: spec.start_time,
            end_time: spec.end_time,
            finalized: None,
        }
    }
}

/// A candidate specification.
#[derive(Debug, Serialize, Deserialize)]
pub struct CandidateSpec {
    /// Candidate display name.
    pub name: String,
}

impl CandidateSpec {
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.trim().len() < MIN_CANDIDATE_NAME_LENGTH {
            return Err(Error::Validation(format!(
                "Candidate name must be at least {MIN_CANDIDATE_NAME_LENGTH} characters"
            )));
        }
        Ok(())
    }

    /// Convert this spec into a candidate with the given unique ID.
    pub fn into_candidate(self, id: CandidateId) -> Candidate {
        Candidate {
            id,
            name: self.name,
        }
    }
}

/// An API-friendly election description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    /// Election unique ID.
    pub id: ElectionId,
    /// Election title.
    pub title: String,
    /// Election state, derived at the moment of description.
    pub state: ElectionState,
    /// Election start time.
    pub start_time: DateTime<Utc>,
    /// Election end time.
    pub end_time: DateTime<Utc>,
    /// Candidates in ID order.
    pub candidates: Vec<CandidateDescription>,
    /// The result snapshot, present once finalized.
    pub finalized: Option<FinalizedDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    /// Candidate unique ID within this election.
    pub id: CandidateId,
    /// Candidate display name.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedDescription {
    /// The winning candidate, absent if no votes were cast.
    pub winner_id: Option<CandidateId>,
    /// Total number of votes cast.
    pub total: u64,
    /// When the result was recorded.
    pub finalized_at: DateTime<Utc>,
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        let state = election.metadata.state_at(Utc::now());
        Self {
            id: election.id,
            title: election.metadata.title,
            state,
            start_time: election.metadata.start_time,
            end_time: election.metadata.end_time,
            candidates: election.candidates.into_iter().map(Into::into).collect(),
            finalized: election.metadata.finalized.map(Into::into),
        }
    }
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            name: candidate.name,
        }
    }
}

impl From<FinalizedTally> for FinalizedDescription {
    fn from(tally: FinalizedTally) -> Self {
        Self {
            winner_id: tally.winner_id,
            total: tally.total,
            finalized_at: tally.finalized_at,
        }
    }
}

/// A summary of an election, shorter than the full [`ElectionDescription`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSummary {
    /// Election unique ID.
    pub id: ElectionId,
    /// Election title.
    pub title: String,
    /// Election state, derived at the moment of description.
    pub state: ElectionState,
    /// Election start time.
    pub start_time: DateTime<Utc>,
    /// Election end time.
    pub end_time: DateTime<Utc>,
}

impl From<Election> for ElectionSummary {
    fn from(election: Election) -> Self {
        let state = election.metadata.state_at(Utc::now());
        Self {
            id: election.id,
            title: election.metadata.title,
            state,
            start_time: election.metadata.start_time,
            end_time: election.metadata.end_time,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use chrono::{Duration, Timelike};

    macro_rules! midnight_today {
        () => {{
            Utc::now()
                .with_hour(0)
                .and_then(|t| t.with_minute(0))
                .and_then(|t| t.with_second(0))
                .and_then(|t| t.with_nanosecond(0))
                .unwrap()
        }};
    }

    impl ElectionSpec {
        /// Started earlier today, ends in 30 days.
        pub fn current_example() -> Self {
            let start_time = midnight_today!();
            let end_time = start_time + Duration::days(30);
            Self {
                title: "Test Election 1".to_string(),
                start_time,
                end_time,
            }
        }

        /// Starts in 30 days.
        pub fn future_example() -> Self {
            let start_time = midnight_today!() + Duration::days(30);
            let end_time = start_time + Duration::days(30);
            Self {
                title: "Test Election 2".to_string(),
                start_time,
                end_time,
            }
        }

        /// Ended some weeks ago.
        pub fn past_example() -> Self {
            let start_time = midnight_today!() - Duration::days(30);
            let end_time = start_time + Duration::days(7);
            Self {
                title: "Test Election 3".to_string(),
                start_time,
                end_time,
            }
        }
    }

    impl CandidateSpec {
        pub fn example1() -> Self {
            Self {
                name: "John Smith".to_string(),
            }
        }

        pub fn example2() -> Self {
            Self {
                name: "Jane Doe".to_string(),
            }
        }

        pub fn example3() -> Self {
            Self {
                name: "Ann Other".to_string(),
            }
        }
    }
}
