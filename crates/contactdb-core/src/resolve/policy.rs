//! Bulk resolution policy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome applied to every conflict of a bulk resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionPolicy {
    #[serde(rename = "keep_old_data", alias = "keep-old")]
    KeepOld,
    #[serde(rename = "save_incoming_data", alias = "save-incoming")]
    SaveIncoming,
}

impl ResolutionPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeepOld => "keep-old",
            Self::SaveIncoming => "save-incoming",
        }
    }
}

impl fmt::Display for ResolutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "keep-old" | "keep_old_data" => Ok(Self::KeepOld),
            "save-incoming" | "save_incoming_data" => Ok(Self::SaveIncoming),
            other => Err(format!(
                "unknown resolution policy: {other} (expected keep-old or save-incoming)"
            )),
        }
    }
}
