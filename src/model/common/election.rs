use serde::{Deserialize, Serialize};

/// Our election IDs are integers.
pub type ElectionId = u32;

/// Our candidate IDs are integers, unique within their election and assigned
/// in creation order.
pub type CandidateId = u32;

/// Lifecycle phase of an election.
///
/// Never stored: always derived from the election's timestamps and finalize
/// snapshot at the moment of asking. The variants are ordered so that an
/// election can only ever move forwards through them as time passes.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub enum ElectionState {
    /// Before the start time: still under construction, only visible to admins.
    Draft,
    /// Between the start and end times inclusive: accepting votes.
    Active,
    /// Past the end time with no result snapshot yet.
    Closed,
    /// Past the end time with a recorded result snapshot.
    Finalized,
}
