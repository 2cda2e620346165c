use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{Code, NationalId},
    common::{election::ElectionId, wallet::WalletAddress},
    db::VoterCore,
};

/// Body of a verification start request.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartVerificationRequest {
    pub national_id: NationalId,
}

/// Body of a verification completion request.
#[derive(Debug, Serialize, Deserialize)]
pub struct CompleteVerificationRequest {
    pub national_id: NationalId,
    pub code: Code,
    pub wallet_address: WalletAddress,
    /// The election the voter intends to take part in; registration is
    /// refused if it doesn't exist.
    pub election_id: ElectionId,
}

/// A registered voter, as reported back to the caller. The identity digest is
/// the keyed hash, never the raw ID number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterDescription {
    pub identity_digest: String,
    pub wallet_address: WalletAddress,
    pub verified_at: DateTime<Utc>,
    /// Transaction ID of the ledger mirror write, when mirroring is enabled.
    pub ledger_txid: Option<String>,
}

impl VoterDescription {
    pub fn describe(voter: &VoterCore, ledger_txid: Option<String>) -> Self {
        Self {
            identity_digest: voter.identity_hmac.clone(),
            wallet_address: voter.wallet_address.clone(),
            verified_at: voter.verified_at,
            ledger_txid,
        }
    }
}
