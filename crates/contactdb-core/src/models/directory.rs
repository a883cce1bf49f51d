//! Referenced directory entities: organizations, events and groups

use serde::{Deserialize, Serialize};

use super::{EventId, GroupId, OrganizationId};

/// An organization a contact may belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
}

impl Organization {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: OrganizationId::new(),
            name: name.into(),
        }
    }
}

/// A meeting contacts register for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// Short unique code, e.g. `POM-2023`
    pub code: String,
    pub title: String,
}

impl Event {
    #[must_use]
    pub fn new(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: EventId::new(),
            code: code.into(),
            title: title.into(),
        }
    }
}

/// A mailing or working group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

impl Group {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GroupId::new(),
            name: name.into(),
        }
    }
}
