//! Import reconciliation
//!
//! Each incoming registry record is matched to a local contact by external
//! id. Unknown ids create a contact and identical data is skipped. Any
//! difference, including list values the local record lacks, is parked as an
//! import conflict against the existing record, once per distinct snapshot.
//! The existing record itself is never modified here.

mod registry;

use std::path::Path;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::config::ImportConfig;
use crate::db::{
    ConflictRepository, ContactRepository, Database, SqliteConflictRepository,
    SqliteContactRepository,
};
use crate::error::{Error, Result};
use crate::models::{ConflictRecord, ConflictSource, ContactId, IncomingContact};
use crate::schema::{differing_details, lists_with_new_items, CONTACT_SCHEMA};

pub use registry::{ExternalRegistry, RegistrySnapshot};

/// One registry record as found in an import file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingRecord {
    pub external_id: String,
    #[serde(flatten)]
    pub contact: IncomingContact,
}

/// Read a JSON array of [`IncomingRecord`]s
pub fn load_records(path: &Path) -> Result<Vec<IncomingRecord>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// What reconciling one record did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// A new local contact was created
    Created { contact_id: ContactId },
    /// The matched contact already held the data, or an identical conflict
    /// is already pending against it
    Skipped { contact_id: ContactId },
    /// The data differed; a conflict awaits review
    Conflict { conflict: ConflictRecord },
}

/// A record that could not be reconciled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    pub external_id: String,
    pub error: String,
}

/// Totals of a batch import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub skipped: usize,
    pub conflicts: usize,
    pub failed: usize,
    pub failures: Vec<ImportFailure>,
    /// The batch stopped at the first failure
    pub aborted: bool,
}

impl ImportReport {
    pub fn record(&mut self, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Created { .. } => self.created += 1,
            ReconcileOutcome::Skipped { .. } => self.skipped += 1,
            ReconcileOutcome::Conflict { .. } => self.conflicts += 1,
        }
    }

    pub fn record_failure(&mut self, external_id: &str, error: &Error) {
        self.failed += 1;
        self.failures.push(ImportFailure {
            external_id: external_id.to_string(),
            error: error.to_string(),
        });
    }

    /// Number of records processed, failed ones included
    pub const fn total(&self) -> usize {
        self.created + self.skipped + self.conflicts + self.failed
    }

    pub fn log_summary(&self) {
        tracing::info!(
            "Import finished: {} created, {} skipped, {} conflicts, {} failed",
            self.created,
            self.skipped,
            self.conflicts,
            self.failed
        );
    }
}

/// Decides create / skip / conflict for incoming registry records
#[derive(Debug, Clone, Default)]
pub struct ImportReconciler {
    config: ImportConfig,
}

impl ImportReconciler {
    pub const fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    /// Reconcile one record in its own transaction
    pub fn reconcile(
        &self,
        db: &mut Database,
        external_id: &str,
        incoming: IncomingContact,
    ) -> Result<ReconcileOutcome> {
        let tx = db.transaction()?;
        let outcome = Self::reconcile_in(&tx, external_id, incoming)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Reconcile within a caller-owned transaction
    pub fn reconcile_in(
        conn: &Connection,
        external_id: &str,
        incoming: IncomingContact,
    ) -> Result<ReconcileOutcome> {
        let external_id = external_id.trim();
        if external_id.is_empty() {
            return Err(Error::InvalidInput(
                "incoming record has no external id".to_string(),
            ));
        }
        incoming.details.validate()?;

        let contacts = SqliteContactRepository::new(conn);
        let Some(mut existing) = contacts.find_by_external_id(external_id)? else {
            let contact = incoming.into_contact(external_id);
            contacts.insert(&contact)?;
            tracing::debug!("Created contact {} for {external_id}", contact.id);
            return Ok(ReconcileOutcome::Created {
                contact_id: contact.id,
            });
        };

        let mut snapshot = incoming.into_contact(external_id);
        let mut differing =
            differing_details(&CONTACT_SCHEMA, &existing.details, &snapshot.details)?;
        differing.extend(lists_with_new_items(&CONTACT_SCHEMA, &mut existing, &mut snapshot)?);
        if differing.is_empty() {
            tracing::debug!("Skipped {external_id}: contact {} is up to date", existing.id);
            return Ok(ReconcileOutcome::Skipped {
                contact_id: existing.id,
            });
        }

        // Lists never reach a snapshot, so pending conflicts compare on details only
        let conflicts = SqliteConflictRepository::new(conn);
        for pending in conflicts.list_for_contact(&existing.id)? {
            let changed = differing_details(&CONTACT_SCHEMA, &pending.details, &snapshot.details)?;
            if changed.is_empty() {
                tracing::debug!(
                    "Skipped {external_id}: already pending as conflict {}",
                    pending.id
                );
                return Ok(ReconcileOutcome::Skipped {
                    contact_id: existing.id,
                });
            }
        }

        let conflict = ConflictRecord::new(existing.id, ConflictSource::Import, snapshot.details);
        conflicts.insert(&conflict)?;
        tracing::info!(
            "Import of {external_id} conflicts with contact {} on {}",
            existing.id,
            differing.join(", ")
        );
        Ok(ReconcileOutcome::Conflict { conflict })
    }

    /// Reconcile records serially, each in its own transaction.
    ///
    /// A failing record is counted and logged; the batch goes on unless
    /// `fail_fast` is set.
    pub fn reconcile_batch(
        &self,
        db: &mut Database,
        records: impl IntoIterator<Item = IncomingRecord>,
    ) -> ImportReport {
        let mut report = ImportReport::default();

        for record in records {
            let result = self.reconcile(db, &record.external_id, record.contact);
            if !self.tally(&mut report, &record.external_id, result) {
                break;
            }
        }

        report.log_summary();
        report
    }

    /// Count one record's result; `false` when the batch has to stop
    pub fn tally(
        &self,
        report: &mut ImportReport,
        external_id: &str,
        result: Result<ReconcileOutcome>,
    ) -> bool {
        match result {
            Ok(outcome) => {
                report.record(&outcome);
                true
            }
            Err(error) => {
                tracing::warn!("Failed to import {external_id}: {error}");
                report.record_failure(external_id, &error);
                if self.config.fail_fast {
                    report.aborted = true;
                }
                !self.config.fail_fast
            }
        }
    }
}
