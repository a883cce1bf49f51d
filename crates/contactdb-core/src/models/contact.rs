//! Contact model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ContactId, OrganizationId};
use crate::error::{Error, Result};

/// Every non-relational, non-list field of a contact.
///
/// This is also the exact shape a conflict snapshot stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactDetails {
    pub title: String,
    pub honorific: String,
    pub first_name: String,
    pub last_name: String,
    pub designation: String,
    pub department: String,
    pub affiliation: String,
    pub primary_lang: String,
    pub second_lang: String,
    pub third_lang: String,
    pub notes: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub birth_date: Option<NaiveDate>,
    pub organization_id: Option<OrganizationId>,
    pub is_in_mailing_list: bool,
    pub is_use_organization_address: bool,
    pub focal_point: bool,
    pub org_head: bool,
}

impl ContactDetails {
    /// Create details with just a first and last name
    #[must_use]
    pub fn named(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Self::default()
        }
    }

    /// "First Last", skipping whichever part is empty
    #[must_use]
    pub fn display_name(&self) -> String {
        [self.first_name.trim(), self.last_name.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Check the naming invariant: at least one of first/last name is set
    pub fn validate(&self) -> Result<()> {
        if self.first_name.trim().is_empty() && self.last_name.trim().is_empty() {
            return Err(Error::Validation(
                "contact needs a first or last name".to_string(),
            ));
        }
        Ok(())
    }
}

/// A canonical person record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Unique identifier
    pub id: ContactId,
    /// Scalar and boolean fields
    #[serde(flatten)]
    pub details: ContactDetails,
    pub emails: Vec<String>,
    pub email_ccs: Vec<String>,
    pub phones: Vec<String>,
    pub mobiles: Vec<String>,
    pub faxes: Vec<String>,
    /// Identifiers correlating this record to the external registry
    pub external_ids: Vec<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl Contact {
    /// Create a new contact with the given details and no list values
    #[must_use]
    pub fn new(details: ContactDetails) -> Self {
        let now = crate::util::now_millis();
        Self {
            id: ContactId::new(),
            details,
            emails: Vec::new(),
            email_ccs: Vec::new(),
            phones: Vec::new(),
            mobiles: Vec::new(),
            faxes: Vec::new(),
            external_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style helper to set the email list
    #[must_use]
    pub fn with_emails<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.emails = emails.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style helper to set the external identifiers
    #[must_use]
    pub fn with_external_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.external_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Whether this record is correlated to the external registry
    #[must_use]
    pub fn has_external_ids(&self) -> bool {
        !self.external_ids.is_empty()
    }

    /// Validate before persisting
    pub fn validate(&self) -> Result<()> {
        self.details.validate()
    }
}

/// Contact data as delivered by an import, keyed separately by external id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomingContact {
    #[serde(flatten)]
    pub details: ContactDetails,
    pub emails: Vec<String>,
    pub email_ccs: Vec<String>,
    pub phones: Vec<String>,
    pub mobiles: Vec<String>,
    pub faxes: Vec<String>,
}

impl IncomingContact {
    /// Incoming data with only details set
    #[must_use]
    pub fn from_details(details: ContactDetails) -> Self {
        Self {
            details,
            ..Self::default()
        }
    }

    /// Materialize a brand new local contact tied to `external_id`
    #[must_use]
    pub fn into_contact(self, external_id: &str) -> Contact {
        let mut contact = Contact::new(self.details);
        contact.emails = self.emails;
        contact.email_ccs = self.email_ccs;
        contact.phones = self.phones;
        contact.mobiles = self.mobiles;
        contact.faxes = self.faxes;
        contact.external_ids = vec![external_id.to_string()];
        contact
    }
}
