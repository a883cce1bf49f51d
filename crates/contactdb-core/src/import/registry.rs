//! External registry access

use std::collections::HashMap;
use std::path::Path;

use super::IncomingRecord;
use crate::error::{Error, Result};
use crate::models::IncomingContact;

/// Source of authoritative contact data keyed by external id
pub trait ExternalRegistry: Send + Sync {
    /// Current registry data for `external_id`, `None` when the registry
    /// does not know it
    fn fetch_contact(&self, external_id: &str) -> Result<Option<IncomingContact>>;
}

/// A registry dump held in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    records: HashMap<String, IncomingContact>,
}

impl RegistrySnapshot {
    /// Build from records; a later record for the same id replaces an earlier one
    pub fn from_records(records: impl IntoIterator<Item = IncomingRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.external_id.trim().to_string(), record.contact))
                .collect(),
        }
    }

    /// Load a JSON array of records
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_records(super::load_records(path)?))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ExternalRegistry for RegistrySnapshot {
    fn fetch_contact(&self, external_id: &str) -> Result<Option<IncomingContact>> {
        if external_id.trim().is_empty() {
            return Err(Error::Registry("empty external id".to_string()));
        }
        Ok(self.records.get(external_id.trim()).cloned())
    }
}
