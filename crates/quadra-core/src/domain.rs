//! Life domain enumeration.
//!
//! Quadra divides waking time into four fixed domains plus a sleep
//! reservation that sits outside all domain windows. The classifier is the
//! only component that decides which domain a task belongs to; everything
//! in this crate consumes the closed enum.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four fixed life domains.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Study, thesis, coursework.
    Academic,
    /// Paid work and income-producing projects.
    Income,
    /// Skill building, exercise, personal growth.
    Growth,
    /// Errands, chores, social life.
    Life,
}

impl Domain {
    /// Canonical packing order used by the optimizer.
    pub const ORDER: [Domain; 4] = [
        Domain::Academic,
        Domain::Income,
        Domain::Growth,
        Domain::Life,
    ];

    /// Stable lowercase name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Academic => "academic",
            Domain::Income => "income",
            Domain::Growth => "growth",
            Domain::Life => "life",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "academic" => Ok(Domain::Academic),
            "income" => Ok(Domain::Income),
            "growth" => Ok(Domain::Growth),
            "life" => Ok(Domain::Life),
            other => Err(UnknownDomain(other.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized domain name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown domain: {0}")]
pub struct UnknownDomain(pub String);

/// Minutes reserved for sleep each day, outside all domain windows.
pub const SLEEP_RESERVED_MINUTES: u32 = 480;

/// Default soft quota per domain per day, in minutes (the 4x4-hour model).
pub const DEFAULT_DOMAIN_QUOTA_MINUTES: u32 = 240;
