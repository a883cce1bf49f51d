//! Event registration model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ContactId, EventId, RegistrationId};

/// Where a registration stands in the accreditation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Nominated,
    Accredited,
    Registered,
}

impl RegistrationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nominated => "nominated",
            Self::Accredited => "accredited",
            Self::Registered => "registered",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nominated" => Ok(Self::Nominated),
            "accredited" => Ok(Self::Accredited),
            "registered" => Ok(Self::Registered),
            other => Err(format!("unknown registration status: {other}")),
        }
    }
}

/// A contact's registration to one event (at most one per contact and event)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub contact_id: ContactId,
    pub event_id: EventId,
    pub status: RegistrationStatus,
    /// When the registration was made (Unix ms)
    pub date: i64,
    pub is_funded: bool,
}

impl Registration {
    #[must_use]
    pub fn new(
        contact_id: ContactId,
        event_id: EventId,
        status: RegistrationStatus,
        date: i64,
    ) -> Self {
        Self {
            id: RegistrationId::new(),
            contact_id,
            event_id,
            status,
            date,
            is_funded: false,
        }
    }
}
