use {
    serde::{Deserialize, Serialize},
    std::{fmt, str::FromStr},
};

use crate::errors::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Vote {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum VoteRecordVersion {
    V1,
    V2,
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vote::Yes => write!(f, "Yes"),
            Vote::No => write!(f, "No"),
        }
    }
}

impl FromStr for Vote {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yes" => Ok(Vote::Yes),
            "No" => Ok(Vote::No),
            other => Err(Error::Serialization(format!("unknown vote: {}", other))),
        }
    }
}

impl fmt::Display for VoteRecordVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteRecordVersion::V1 => write!(f, "V1"),
            VoteRecordVersion::V2 => write!(f, "V2"),
        }
    }
}

impl FromStr for VoteRecordVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "V1" => Ok(VoteRecordVersion::V1),
            "V2" => Ok(VoteRecordVersion::V2),
            other => Err(Error::Serialization(format!(
                "unknown vote record version: {}",
                other
            ))),
        }
    }
}

/// A finished proposal mirrored from chain.
///
/// Vote weights are token amounts in natural units and serialize as strings,
/// since they do not fit a JSON number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProposalRow {
    pub pubkey: String,
    pub realm_pub_key: String,
    pub governance: String,
    pub governing_token_mint: String,
    pub name: String,
    pub description_link: String,
    pub state: String,
    /// Unix timestamp the proposal was drafted at
    pub created_at: i64,
    pub voting_completed_at: Option<i64>,
    #[serde(with = "u64_string")]
    pub yes_vote_weight: u64,
    #[serde(with = "u64_string")]
    pub no_vote_weight: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecordRow {
    pub realm_pub_key: String,
    pub member_pub_key: String,
    pub proposal_pubkey: String,
    pub vote: Vote,
    #[serde(with = "u64_string")]
    pub vote_weight: u64,
    pub version: VoteRecordVersion,
    pub proposal_created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RealmRow {
    pub pubkey: String,
    pub subscribed: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

mod u64_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.parse().map_err(de::Error::custom),
            Raw::Number(n) => Ok(n),
        }
    }
}
