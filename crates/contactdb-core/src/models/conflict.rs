//! Conflict record model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Contact, ContactDetails, ContactId, ConflictId};

/// Which workflow raised a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSource {
    /// An administrator merged two local records
    Merge,
    /// A registry import disagreed with a local record
    Import,
}

impl ConflictSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Import => "import",
        }
    }
}

impl fmt::Display for ConflictSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge" => Ok(Self::Merge),
            "import" => Ok(Self::Import),
            other => Err(format!("unknown conflict source: {other}")),
        }
    }
}

/// Snapshot of a losing or incoming record's fields, pending human review
///
/// Lists and relations are never stored here: a merge has already folded
/// them into the surviving record before the snapshot is taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Conflict row identifier
    pub id: ConflictId,
    /// The record this snapshot disagrees with
    pub existing_contact_id: ContactId,
    pub source: ConflictSource,
    #[serde(flatten)]
    pub details: ContactDetails,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl ConflictRecord {
    /// Snapshot `details` as a conflict against `existing`
    #[must_use]
    pub fn new(existing: ContactId, source: ConflictSource, details: ContactDetails) -> Self {
        Self {
            id: ConflictId::new(),
            existing_contact_id: existing,
            source,
            details,
            created_at: crate::util::now_millis(),
        }
    }

    /// Snapshot the losing side of a merge
    #[must_use]
    pub fn from_loser(survivor: ContactId, loser: &Contact) -> Self {
        Self::new(survivor, ConflictSource::Merge, loser.details.clone())
    }

    /// Build an independent contact from the snapshot, dropping the back-reference
    #[must_use]
    pub fn to_contact(&self) -> Contact {
        Contact::new(self.details.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_loser_copies_details_only() {
        let survivor = ContactId::new();
        let loser = Contact::new(ContactDetails {
            department: "Treasury".to_string(),
            ..ContactDetails::named("Jane", "Eyre")
        })
        .with_emails(["jane@book.com"]);

        let conflict = ConflictRecord::from_loser(survivor, &loser);
        assert_eq!(conflict.existing_contact_id, survivor);
        assert_eq!(conflict.source, ConflictSource::Merge);
        assert_eq!(conflict.details.department, "Treasury");
    }

    #[test]
    fn test_to_contact_gets_fresh_identity() {
        let conflict = ConflictRecord::new(
            ContactId::new(),
            ConflictSource::Import,
            ContactDetails::named("Paul", "Atreides"),
        );
        let contact = conflict.to_contact();
        assert_ne!(contact.id, conflict.existing_contact_id);
        assert_eq!(contact.details, conflict.details);
        assert!(contact.external_ids.is_empty());
    }

    #[test]
    fn test_source_parse() {
        assert_eq!("merge".parse::<ConflictSource>(), Ok(ConflictSource::Merge));
        assert_eq!(
            ConflictSource::Import.as_str().parse::<ConflictSource>(),
            Ok(ConflictSource::Import)
        );
        assert!("lww".parse::<ConflictSource>().is_err());
    }
}
