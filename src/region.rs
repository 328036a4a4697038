use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MatchPoolError;

/// The closed set of geographic buckets a match can be formed in.
///
/// Matches never span regions; every queue entry and match row carries one of
/// these codes. Stored in Postgres as the `regions_enum` type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "regions_enum")]
pub enum Region {
    EUW,
    EUNE,
    NA,
    CHN,
    JPN,
    KR,
    OCE,
    BR,
    LAS,
    LAN,
}

impl Region {
    pub const ALL: [Region; 10] = [
        Region::EUW,
        Region::EUNE,
        Region::NA,
        Region::CHN,
        Region::JPN,
        Region::KR,
        Region::OCE,
        Region::BR,
        Region::LAS,
        Region::LAN,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::EUW => "EUW",
            Region::EUNE => "EUNE",
            Region::NA => "NA",
            Region::CHN => "CHN",
            Region::JPN => "JPN",
            Region::KR => "KR",
            Region::OCE => "OCE",
            Region::BR => "BR",
            Region::LAS => "LAS",
            Region::LAN => "LAN",
        }
    }

    /// Parse a comma-separated region list, e.g. `"EUW,NA,KR"`.
    pub fn parse_list(raw: &str) -> Result<Vec<Region>, MatchPoolError> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Region::from_str)
            .collect()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = MatchPoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EUW" => Ok(Region::EUW),
            "EUNE" => Ok(Region::EUNE),
            "NA" => Ok(Region::NA),
            "CHN" => Ok(Region::CHN),
            "JPN" => Ok(Region::JPN),
            "KR" => Ok(Region::KR),
            "OCE" => Ok(Region::OCE),
            "BR" => Ok(Region::BR),
            "LAS" => Ok(Region::LAS),
            "LAN" => Ok(Region::LAN),
            other => Err(MatchPoolError::UnknownRegion(other.to_string())),
        }
    }
}
