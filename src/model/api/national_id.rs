use crate::Config;
use data_encoding::HEXLOWER;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::str::FromStr;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// A national identity number: exactly twelve decimal digits.
///
/// Deliberately does not implement `Display`; anything that leaves the
/// process goes through [`NationalId::hmac`] or [`NationalId::redacted`].
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NationalId(String);

impl NationalId {
    pub const LENGTH: usize = 12;

    /// Keyed digest of this identity number, suitable for storage and lookup.
    pub fn hmac(&self, config: &Config) -> String {
        self.hmac_with_key(config.hmac_secret())
    }

    /// As [`NationalId::hmac`], but with an explicit key. Lower-case hex so
    /// digests compare bytewise in database indexes.
    pub fn hmac_with_key(&self, key: &[u8]) -> String {
        let mut hmac =
            HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
        hmac.update(self.0.as_bytes());
        HEXLOWER.encode(&hmac.finalize().into_bytes())
    }

    /// Log-safe rendering: all but the last four digits masked.
    pub fn redacted(&self) -> String {
        format!("********{}", &self.0[Self::LENGTH - 4..])
    }
}

impl FromStr for NationalId {
    type Err = ParseNationalIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.len() != Self::LENGTH || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(ParseNationalIdError);
        }
        Ok(Self(value.to_string()))
    }
}

impl TryFrom<String> for NationalId {
    type Error = ParseNationalIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NationalId> for String {
    fn from(id: NationalId) -> Self {
        id.0
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
#[error("National IDs are exactly {} decimal digits", NationalId::LENGTH)]
pub struct ParseNationalIdError;

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;
    use rocket::local::asynchronous::Client;

    impl NationalId {
        /// On the example identity roster.
        pub fn example() -> Self {
            "123456789012".parse().unwrap()
        }

        /// Also on the example identity roster.
        pub fn example2() -> Self {
            "210987654321".parse().unwrap()
        }

        /// Well-formed but absent from the example identity roster.
        pub fn unlisted_example() -> Self {
            "999999999999".parse().unwrap()
        }

        pub fn example_hmac(client: &Client) -> String {
            Self::example().hmac(client.rocket().state::<Config>().unwrap())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_requires_twelve_digits() {
        assert!("123456789012".parse::<NationalId>().is_ok());
        assert!("12345678901".parse::<NationalId>().is_err());
        assert!("1234567890123".parse::<NationalId>().is_err());
        assert!("12345678901a".parse::<NationalId>().is_err());
        assert!("".parse::<NationalId>().is_err());
    }

    #[test]
    fn redaction_keeps_only_the_tail() {
        assert_eq!(NationalId::example().redacted(), "********9012");
    }

    #[test]
    fn digests_are_hex_and_deterministic() {
        let key = b"test key";
        let digest = NationalId::example().hmac_with_key(key);
        // SHA-256 output, hex-encoded.
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(NationalId::example().hmac_with_key(key), digest);
        assert_ne!(NationalId::example2().hmac_with_key(key), digest);
    }
}
