use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{
        election::{CandidateId, ElectionId},
        wallet::WalletAddress,
    },
    db::{LedgerState, Vote, VoteCore},
};

/// Body of a vote cast request.
#[derive(Debug, Serialize, Deserialize)]
pub struct VoteSpec {
    pub candidate_id: CandidateId,
    pub voter_wallet: WalletAddress,
}

/// Body of a ledger confirmation retry request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmVoteRequest {
    pub voter_wallet: WalletAddress,
}

/// A recorded vote, as reported back to the voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub election_id: ElectionId,
    pub candidate_id: CandidateId,
    pub voter_wallet: WalletAddress,
    pub cast_at: DateTime<Utc>,
    /// True when the vote is recorded here but its ledger mirror write has
    /// not yet succeeded; retry via the confirmation endpoint.
    pub pending_ledger_confirmation: bool,
    /// Transaction ID of the ledger mirror write, once confirmed with
    /// mirroring enabled.
    pub ledger_txid: Option<String>,
}

impl From<VoteCore> for VoteReceipt {
    fn from(vote: VoteCore) -> Self {
        Self {
            election_id: vote.election_id,
            candidate_id: vote.candidate_id,
            voter_wallet: vote.voter_wallet,
            cast_at: vote.cast_at,
            pending_ledger_confirmation: vote.ledger_state == LedgerState::Pending,
            ledger_txid: vote.ledger_txid,
        }
    }
}

impl From<Vote> for VoteReceipt {
    fn from(vote: Vote) -> Self {
        vote.vote.into()
    }
}
