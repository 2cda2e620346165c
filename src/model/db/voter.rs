use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{common::wallet::WalletAddress, mongodb::Id};

/// Core voter data: a verified identity bound to exactly one wallet.
///
/// Uniqueness of both `identity_hmac` and `wallet_address` is enforced by
/// database indexes, making the binding a bijection.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    /// Keyed digest of the verified identity.
    pub identity_hmac: String,
    /// The wallet this identity is bound to.
    pub wallet_address: WalletAddress,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub verified_at: DateTime<Utc>,
}

impl VoterCore {
    /// Create a new voter, verified now.
    pub fn new(identity_hmac: String, wallet_address: WalletAddress) -> Self {
        Self {
            identity_hmac,
            wallet_address,
            verified_at: Utc::now(),
        }
    }
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}
