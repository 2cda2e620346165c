//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in a DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.

pub mod admin;
pub use admin::{Admin, AdminCore, NewAdmin, DEFAULT_ADMIN_USERNAME};

pub mod credential;
pub use credential::{Credential, CredentialCore, NewCredential};

pub mod election;
pub use election::{Candidate, Election, ElectionMetadata, FinalizedTally};

pub mod vote;
pub use vote::{LedgerState, NewVote, Vote, VoteCore};

pub mod voter;
pub use voter::{NewVoter, Voter, VoterCore};
