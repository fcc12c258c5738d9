use crate::error::RoomError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Number of digits in a room code.
pub const CODE_LENGTH: usize = 6;

const JOIN_QUERY_PARAM: &str = "join";

/// Short numeric code that scopes a two-party room.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Validates a user-entered code: exactly six ASCII digits.
    pub fn parse(input: &str) -> Result<Self, RoomError> {
        let trimmed = input.trim();
        if trimmed.len() != CODE_LENGTH || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RoomError::InvalidCode);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Builds a code from a number, zero-padded to six digits.
    pub fn from_number(value: u32) -> Result<Self, RoomError> {
        if value >= 1_000_000 {
            return Err(RoomError::InvalidCode);
        }
        Ok(Self(format!("{value:06}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join link carrying the code as the `join` query parameter (the QR payload).
    pub fn join_url(&self, base: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(base)?;
        url.query_pairs_mut()
            .append_pair(JOIN_QUERY_PARAM, &self.0);
        Ok(url)
    }

    /// Extracts the code from a scanned join link.
    pub fn from_join_url(link: &str) -> Result<Self, RoomError> {
        let url = Url::parse(link).map_err(|_| RoomError::InvalidCode)?;
        let (_, value) = url
            .query_pairs()
            .find(|(key, _)| key == JOIN_QUERY_PARAM)
            .ok_or(RoomError::InvalidCode)?;
        Self::parse(&value)
    }
}

impl FromStr for RoomCode {
    type Err = RoomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = RoomError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
