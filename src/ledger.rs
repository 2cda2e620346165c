use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::common::{
    election::{CandidateId, ElectionId},
    wallet::WalletAddress,
};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// A write submitted to the ledger gateway. The gateway owns the contract
/// details (keys, gas, confirmation depth); we only name the operation.
#[derive(Serialize)]
struct WriteRequest<'a> {
    operation: &'static str,
    election_id: ElectionId,
    wallet: &'a WalletAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate_id: Option<CandidateId>,
}

#[derive(Deserialize)]
struct WriteResponse {
    txid: String,
}

/// Client for the opaque ledger collaborator that mirrors registrations and
/// votes on chain. When no URL is configured the mirror is disabled and all
/// writes succeed locally with no transaction ID.
pub struct LedgerClient {
    http: HttpClient,
    url: Option<String>,
}

impl LedgerClient {
    pub fn new(url: Option<String>) -> Self {
        Self {
            http: HttpClient::new(),
            url,
        }
    }

    /// The configured gateway URL, if the mirror is enabled.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Mirror a voter registration for the given election.
    pub async fn register_voter(
        &self,
        election_id: ElectionId,
        wallet: &WalletAddress,
    ) -> Result<Option<String>, LedgerError> {
        self.write(WriteRequest {
            operation: "register_voter",
            election_id,
            wallet,
            candidate_id: None,
        })
        .await
    }

    /// Mirror an admitted vote. The gateway deduplicates by
    /// `(election_id, wallet)`, so retrying a vote that already landed is safe.
    pub async fn cast_vote(
        &self,
        election_id: ElectionId,
        candidate_id: CandidateId,
        wallet: &WalletAddress,
    ) -> Result<Option<String>, LedgerError> {
        self.write(WriteRequest {
            operation: "vote",
            election_id,
            wallet,
            candidate_id: Some(candidate_id),
        })
        .await
    }

    async fn write(&self, request: WriteRequest<'_>) -> Result<Option<String>, LedgerError> {
        let url = match &self.url {
            Some(url) => url,
            None => return Ok(None),
        };
        let response = self
            .http
            .post(format!("{url}/transactions"))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<WriteResponse>()
            .await?;
        Ok(Some(response.txid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rocket::async_test]
    async fn disabled_mirror_writes_succeed_without_txid() {
        let ledger = LedgerClient::new(None);
        assert!(ledger.url().is_none());

        let wallet: WalletAddress = "0x66f9664f97F2b50F62D13eA064982f936dE76657"
            .parse()
            .unwrap();
        let registered = ledger.register_voter(1, &wallet).await.unwrap();
        assert_eq!(registered, None);
        let voted = ledger.cast_vote(1, 2, &wallet).await.unwrap();
        assert_eq!(voted, None);
    }
}
