use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{api::Code, mongodb::Id};
use crate::Config;

/// Core challenge credential data: proof that whoever echoes the matching
/// code controls the phone number on file for this identity.
///
/// The raw national ID never appears here; identities are tracked by keyed
/// digest only.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialCore {
    /// Keyed digest of the identity under verification.
    pub identity_hmac: String,
    /// The challenge code sent to the phone on file.
    pub code: Code,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub issued_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,
}

impl CredentialCore {
    /// Create a fresh credential for the given identity digest, valid for the
    /// configured challenge lifetime.
    pub fn new(identity_hmac: String, code: Code, config: &Config) -> Self {
        let issued_at = Utc::now();
        Self {
            identity_hmac,
            code,
            issued_at,
            expires_at: issued_at + config.otp_ttl(),
        }
    }

    /// Has this credential passed its expiry time?
    ///
    /// The TTL index sweeps expired credentials eventually, but only every
    /// minute or so; anything time-sensitive must check explicitly.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// A credential without an ID.
pub type NewCredential = CredentialCore;

/// A credential from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub credential: CredentialCore,
}

impl Deref for Credential {
    type Target = CredentialCore;

    fn deref(&self) -> &Self::Target {
        &self.credential
    }
}
