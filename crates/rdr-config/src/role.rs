use std::str::FromStr;

use serde::{Deserialize, Serialize};
use snafu::Snafu;

#[derive(Debug, PartialEq, Eq, Snafu)]
#[snafu(display("unknown cluster role {role:?}, expected one of \"primary\" or \"secondary\""))]
pub struct UnknownRoleError {
    role: String,
}

/// One of the two clusters taking part in a regional DR relationship.
///
/// Both roles go through the exact same resolution; the role only selects which part of the
/// chart values, overrides and fallback documents is used.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    strum::Display,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ClusterRole {
    Primary,
    Secondary,
}

/// Parses a role case-insensitively. Anything but `primary` and `secondary` is rejected.
impl FromStr for ClusterRole {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            _ => Err(UnknownRoleError { role: s.to_owned() }),
        }
    }
}
