use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// A blockchain wallet address: `0x` followed by 40 hex digits.
///
/// Addresses are normalised to lowercase on parse, so equality and the
/// database uniqueness constraint are case-insensitive.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// The normalised (lowercase) address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WalletAddress {
    type Err = ParseWalletAddressError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let digits = value.strip_prefix("0x").ok_or(ParseWalletAddressError)?;
        if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseWalletAddressError);
        }
        Ok(Self(value.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = ParseWalletAddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WalletAddress> for String {
    fn from(address: WalletAddress) -> Self {
        address.0
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
#[error("Wallet addresses are `0x` followed by 40 hex digits")]
pub struct ParseWalletAddressError;

#[cfg(test)]
mod examples {
    use super::*;

    impl WalletAddress {
        pub fn example() -> Self {
            "0x66f9664f97f2b50f62d13ea064982f936de76657"
                .parse()
                .unwrap()
        }

        pub fn example2() -> Self {
            "0x8ba1f109551bd432803012645ac136ddd64dba72"
                .parse()
                .unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalises_case() {
        let mixed: WalletAddress = "0x66f9664f97F2b50F62D13eA064982f936dE76657"
            .parse()
            .unwrap();
        assert_eq!(mixed, WalletAddress::example());
        assert_eq!(mixed.as_str(), "0x66f9664f97f2b50f62d13ea064982f936de76657");
    }

    #[test]
    fn parse_rejects_malformed_addresses() {
        // Missing prefix.
        assert!("66f9664f97f2b50f62d13ea064982f936de76657"
            .parse::<WalletAddress>()
            .is_err());
        // Too short.
        assert!("0x66f9664f".parse::<WalletAddress>().is_err());
        // Too long.
        assert!("0x66f9664f97f2b50f62d13ea064982f936de766570"
            .parse::<WalletAddress>()
            .is_err());
        // Non-hex characters.
        assert!("0x66f9664f97f2b50f62d13ea064982f936de7665g"
            .parse::<WalletAddress>()
            .is_err());
    }
}
