//! Identifier newtypes
//!
//! Every entity is keyed by a UUID v7 so identifiers sort by creation time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new unique identifier using UUID v7
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Get the string representation of this ID
            #[must_use]
            pub fn as_str(&self) -> String {
                self.0.to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s.trim())?))
            }
        }
    };
}

entity_id!(
    /// A unique identifier for a contact
    ContactId
);
entity_id!(
    /// A unique identifier for a pending conflict
    ConflictId
);
entity_id!(
    /// A unique identifier for an event registration
    RegistrationId
);
entity_id!(
    /// A unique identifier for an event
    EventId
);
entity_id!(
    /// A unique identifier for an organization
    OrganizationId
);
entity_id!(
    /// A unique identifier for a contact group
    GroupId
);
