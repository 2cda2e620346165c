//! Types sent to and from the REST API.
//!
//! Requests deserialise from JSON with validation baked into the types where
//! possible; responses serialise to JSON only.

mod admin;
pub use admin::{AdminCredentials, MIN_PASSWORD_LENGTH};

mod auth;
pub use auth::{AuthToken, AUTH_TOKEN_COOKIE};

mod code;
pub use code::Code;

mod election;
pub use election::{
    CandidateDescription, CandidateSpec, ElectionDescription, ElectionSpec, ElectionSummary,
    FinalizedDescription,
};

mod national_id;
pub use national_id::NationalId;

mod results;
pub use results::{CandidateTally, ElectionResults};

mod sms;
pub use sms::Sms;

mod verify;
pub use verify::{CompleteVerificationRequest, StartVerificationRequest, VoterDescription};

mod vote;
pub use vote::{ConfirmVoteRequest, VoteReceipt, VoteSpec};
