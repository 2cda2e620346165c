use std::collections::HashMap;
use std::path::Path;

use rocket::serde::json::serde_json;
use serde::Deserialize;
use thiserror::Error;

use crate::model::api::{NationalId, Sms};

/// One roster entry: a registered national ID and the phone number on file
/// for it. Entries only ever live in memory and in the roster file itself;
/// nothing from here is written to the database.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterEntry {
    pub national_id: NationalId,
    pub phone: Sms,
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Failed to read roster file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse roster file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Duplicate roster entry for ID ending {0}")]
    Duplicate(String),
}

/// The identity roster: the lookup table deciding which national IDs are
/// real and where their verification codes get sent. Loaded once at
/// ignition and managed as read-only state.
pub struct IdentityRoster {
    entries: HashMap<NationalId, Sms>,
}

impl IdentityRoster {
    /// Build a roster from entries, rejecting duplicate IDs.
    pub fn from_entries(
        entries: impl IntoIterator<Item = RosterEntry>,
    ) -> Result<Self, RosterError> {
        let mut map = HashMap::new();
        for entry in entries {
            if map.insert(entry.national_id.clone(), entry.phone).is_some() {
                return Err(RosterError::Duplicate(entry.national_id.redacted()));
            }
        }
        Ok(Self { entries: map })
    }

    /// Load a roster from a JSON file of `RosterEntry` objects.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RosterError> {
        let contents = std::fs::read_to_string(path)?;
        let entries: Vec<RosterEntry> = serde_json::from_str(&contents)?;
        Self::from_entries(entries)
    }

    /// The phone number on file for the given ID, if it is on the roster.
    pub fn phone_number(&self, national_id: &NationalId) -> Option<&Sms> {
        self.entries.get(national_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, phone: &str) -> RosterEntry {
        RosterEntry {
            national_id: id.parse().unwrap(),
            phone: phone.parse().unwrap(),
        }
    }

    #[test]
    fn lookup_hits_and_misses() {
        let roster = IdentityRoster::from_entries(vec![
            entry("123456789012", "+441234567890"),
            entry("210987654321", "+441234567891"),
        ])
        .unwrap();

        assert_eq!(roster.len(), 2);
        let hit = roster
            .phone_number(&"123456789012".parse().unwrap())
            .unwrap();
        assert_eq!(hit.to_string(), "+441234567890");
        assert!(roster
            .phone_number(&"999999999999".parse().unwrap())
            .is_none());
    }

    #[test]
    fn duplicate_ids_rejected() {
        let result = IdentityRoster::from_entries(vec![
            entry("123456789012", "+441234567890"),
            entry("123456789012", "+441234567891"),
        ]);
        assert!(matches!(result, Err(RosterError::Duplicate(_))));
    }
}
