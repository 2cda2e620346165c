use phonenumber::{Mode, PhoneNumber};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A valid telephone number for SMS delivery.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sms(PhoneNumber);

impl fmt::Display for Sms {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.format().mode(Mode::E164))
    }
}

impl FromStr for Sms {
    type Err = phonenumber::ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        phonenumber::parse(None, value).map(Self)
    }
}

impl TryFrom<String> for Sms {
    type Error = phonenumber::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Sms> for String {
    fn from(sms: Sms) -> Self {
        sms.to_string()
    }
}
