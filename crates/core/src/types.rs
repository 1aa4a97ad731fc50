use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

/// Airing status of a show, stored in the `show.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowStatus {
    Continuing,
    Ended,
    #[default]
    Unknown,
}

impl ShowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Continuing => "continuing",
            Self::Ended => "ended",
            Self::Unknown => "unknown",
        }
    }

    /// Map the free-text status reported by TheTVDB.
    ///
    /// Matches known keywords instead of guessing from the string length, so
    /// wording changes on the remote side degrade to `Unknown` rather than to a
    /// wrong status.
    pub fn from_tvdb(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "continuing" | "returning series" | "in production" => Self::Continuing,
            "ended" | "canceled" | "cancelled" => Self::Ended,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ShowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShowStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "continuing" => Ok(Self::Continuing),
            "ended" => Ok(Self::Ended),
            "unknown" => Ok(Self::Unknown),
            other => Err(UnknownVariant {
                kind: "show status",
                value: other.to_string(),
            }),
        }
    }
}

/// Per-episode user flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeFlag {
    Watched,
    Collected,
}

impl EpisodeFlag {
    /// Column in the `episode` table holding this flag.
    pub fn column(self) -> &'static str {
        match self {
            Self::Watched => "watched",
            Self::Collected => "collected",
        }
    }
}

impl std::fmt::Display for EpisodeFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}
