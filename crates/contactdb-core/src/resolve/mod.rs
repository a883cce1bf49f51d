//! Conflict resolution
//!
//! A pending [`ConflictRecord`] is settled in one of three ways: the
//! incoming values replace the existing record's, the existing record is
//! kept as is, or both are kept as separate records. Every resolution runs
//! in its own transaction and deletes the conflict it settles, so a second
//! attempt on the same conflict is `NotFound`.

mod policy;

use rusqlite::Connection;
use serde::Serialize;

use crate::db::{
    ConflictRepository, ContactRepository, Database, SqliteConflictRepository,
    SqliteContactRepository,
};
use crate::error::{Error, Result};
use crate::import::{ExternalRegistry, ImportReconciler, ImportReport, ReconcileOutcome};
use crate::merge::{transfer_children, TransferResolvers};
use crate::models::{ConflictId, ConflictRecord, Contact, ContactId};
use crate::schema::{copy_details, ChildKind, CONTACT_SCHEMA};

pub use policy::ResolutionPolicy;

/// What keeping both records produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum KeepBothOutcome {
    /// The snapshot became an independent local contact
    Materialized { contact_id: ContactId },
    /// The existing record was replaced by one fresh record per external id
    Reimported {
        replaced: ContactId,
        external_ids: Vec<String>,
        removed_conflicts: usize,
        /// Record that took over the replaced record's registrations and groups
        relations_moved_to: ContactId,
        report: ImportReport,
    },
}

/// A conflict `resolve_all` could not settle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveFailure {
    pub conflict_id: ConflictId,
    pub error: String,
}

/// Totals of a bulk resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveReport {
    pub policy: ResolutionPolicy,
    pub resolved: usize,
    pub failed: usize,
    pub failures: Vec<ResolveFailure>,
}

impl ResolveReport {
    pub const fn new(policy: ResolutionPolicy) -> Self {
        Self {
            policy,
            resolved: 0,
            failed: 0,
            failures: Vec::new(),
        }
    }

    /// Count the result of settling one conflict
    pub fn tally(&mut self, conflict_id: ConflictId, result: Result<()>) {
        match result {
            Ok(()) => self.resolved += 1,
            Err(error) => {
                tracing::warn!("Failed to resolve conflict {conflict_id}: {error}");
                self.failed += 1;
                self.failures.push(ResolveFailure {
                    conflict_id,
                    error: error.to_string(),
                });
            }
        }
    }

    pub fn log_summary(&self) {
        tracing::info!(
            "Resolved {} conflicts with {} ({} failed)",
            self.resolved,
            self.policy,
            self.failed
        );
    }
}

/// Applies resolution outcomes to pending conflicts
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver;

impl ConflictResolver {
    pub const fn new() -> Self {
        Self
    }

    /// Overwrite the existing record with every field of the conflict
    pub fn accept_incoming(&self, db: &mut Database, id: &ConflictId) -> Result<Contact> {
        let tx = db.transaction()?;
        let contact = Self::accept_incoming_in(&tx, id)?;
        tx.commit()?;
        Ok(contact)
    }

    /// Drop the conflict; the existing record stays untouched
    pub fn keep_old(&self, db: &mut Database, id: &ConflictId) -> Result<()> {
        let tx = db.transaction()?;
        SqliteConflictRepository::new(&tx).delete(id)?;
        tx.commit()?;
        tracing::info!("Kept existing data for conflict {id}");
        Ok(())
    }

    /// Keep the existing record and the conflicting data as separate records.
    ///
    /// When the existing record is tied to the external registry it is
    /// assumed to be the product of an earlier merge: all its pending
    /// conflicts are dropped and it is replaced by one record per external
    /// id, re-imported from `registry`. Its registrations and groups move to
    /// the record of its first external id. Every id must be known to the
    /// registry.
    pub fn keep_both(
        &self,
        db: &mut Database,
        id: &ConflictId,
        registry: &dyn ExternalRegistry,
    ) -> Result<KeepBothOutcome> {
        let tx = db.transaction()?;
        let outcome = Self::keep_both_in(&tx, id, registry)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Settle one conflict according to `policy`
    pub fn resolve(
        &self,
        db: &mut Database,
        id: &ConflictId,
        policy: ResolutionPolicy,
    ) -> Result<()> {
        match policy {
            ResolutionPolicy::KeepOld => self.keep_old(db, id),
            ResolutionPolicy::SaveIncoming => self.accept_incoming(db, id).map(|_| ()),
        }
    }

    /// Settle every pending conflict with `policy`, oldest first, each in
    /// its own transaction
    pub fn resolve_all(
        &self,
        db: &mut Database,
        policy: ResolutionPolicy,
    ) -> Result<ResolveReport> {
        let ids = SqliteConflictRepository::new(db.connection()).list_ids()?;
        let mut report = ResolveReport::new(policy);

        for id in ids {
            let result = self.resolve(db, &id, policy);
            report.tally(id, result);
        }

        report.log_summary();
        Ok(report)
    }

    fn load(conn: &Connection, id: &ConflictId) -> Result<(ConflictRecord, Contact)> {
        let conflict = SqliteConflictRepository::new(conn)
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("conflict {id}")))?;
        let existing = SqliteContactRepository::new(conn)
            .get(&conflict.existing_contact_id)?
            .ok_or_else(|| Error::NotFound(format!("contact {}", conflict.existing_contact_id)))?;
        Ok((conflict, existing))
    }

    fn accept_incoming_in(conn: &Connection, id: &ConflictId) -> Result<Contact> {
        let (conflict, mut existing) = Self::load(conn, id)?;

        let changed = copy_details(&CONTACT_SCHEMA, &conflict.details, &mut existing.details)?;
        SqliteContactRepository::new(conn).update(&mut existing)?;
        SqliteConflictRepository::new(conn).delete(id)?;

        tracing::info!(
            "Accepted incoming data for contact {} ({} fields changed)",
            existing.id,
            changed.len()
        );
        Ok(existing)
    }

    fn keep_both_in(
        conn: &Connection,
        id: &ConflictId,
        registry: &dyn ExternalRegistry,
    ) -> Result<KeepBothOutcome> {
        let (conflict, mut existing) = Self::load(conn, id)?;
        let contacts = SqliteContactRepository::new(conn);
        let conflicts = SqliteConflictRepository::new(conn);

        if !existing.has_external_ids() {
            let contact = conflict.to_contact();
            contacts.insert(&contact)?;
            conflicts.delete(id)?;
            tracing::info!(
                "Split conflict {id} into new contact {} beside {}",
                contact.id,
                existing.id
            );
            return Ok(KeepBothOutcome::Materialized {
                contact_id: contact.id,
            });
        }

        // Fetch everything before touching the store
        let mut fetched = Vec::with_capacity(existing.external_ids.len());
        for external_id in &existing.external_ids {
            let data = registry
                .fetch_contact(external_id)
                .map_err(|error| match error {
                    Error::Registry(_) => error,
                    other => Error::Registry(other.to_string()),
                })?
                .ok_or_else(|| {
                    Error::Registry(format!(
                        "registry has no record for {external_id} of contact {}",
                        existing.id
                    ))
                })?;
            fetched.push((external_id.clone(), data));
        }

        let removed_conflicts = conflicts.delete_for_contact(&existing.id)?;
        let external_ids = std::mem::take(&mut existing.external_ids);
        contacts.update(&mut existing)?;

        let mut report = ImportReport::default();
        let mut heir = None;
        for (external_id, data) in fetched {
            let outcome = ImportReconciler::reconcile_in(conn, &external_id, data)?;
            report.record(&outcome);
            heir.get_or_insert(match &outcome {
                ReconcileOutcome::Created { contact_id }
                | ReconcileOutcome::Skipped { contact_id } => *contact_id,
                ReconcileOutcome::Conflict { conflict } => conflict.existing_contact_id,
            });
        }
        let heir = heir.ok_or_else(|| {
            Error::Database(format!("contact {} lost its external ids", existing.id))
        })?;

        // Registrations and groups follow the record of the first external id
        let moved = transfer_children(
            conn,
            ChildKind::Registration,
            &existing.id,
            &heir,
            &TransferResolvers::default(),
        )?;
        contacts.copy_group_memberships(&existing.id, &heir)?;
        contacts.delete(&existing.id)?;

        tracing::info!(
            "Replaced contact {} with {} re-imported records ({} created, {} registrations moved to {})",
            existing.id,
            external_ids.len(),
            report.created,
            moved.moved,
            heir
        );
        Ok(KeepBothOutcome::Reimported {
            replaced: existing.id,
            external_ids,
            removed_conflicts,
            relations_moved_to: heir,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{IncomingRecord, RegistrySnapshot};
    use crate::db::{
        DirectoryRepository, RegistrationRepository, SqliteDirectoryRepository,
        SqliteRegistrationRepository,
    };
    use crate::models::{
        ConflictSource, ContactDetails, Event, Group, IncomingContact, Registration,
        RegistrationStatus,
    };
    use pretty_assertions::assert_eq;

    fn setup() -> (Database, Contact) {
        let db = Database::open_in_memory().unwrap();
        let existing = Contact::new(ContactDetails {
            department: "Finance".to_string(),
            ..ContactDetails::named("Jane", "Eyre")
        })
        .with_emails(["jane@book.com"]);
        SqliteContactRepository::new(db.connection())
            .insert(&existing)
            .unwrap();
        (db, existing)
    }

    fn raise(db: &Database, existing: &Contact, department: &str) -> ConflictRecord {
        let conflict = ConflictRecord::new(
            existing.id,
            ConflictSource::Merge,
            ContactDetails {
                department: department.to_string(),
                org_head: true,
                ..ContactDetails::named("Jane", "Eyre")
            },
        );
        SqliteConflictRepository::new(db.connection())
            .insert(&conflict)
            .unwrap();
        conflict
    }

    fn get(db: &Database, id: &ContactId) -> Option<Contact> {
        SqliteContactRepository::new(db.connection()).get(id).unwrap()
    }

    fn pending(db: &Database) -> usize {
        SqliteConflictRepository::new(db.connection()).count().unwrap()
    }

    #[test]
    fn test_accept_incoming_overwrites_details() {
        let (mut db, existing) = setup();
        let conflict = raise(&db, &existing, "Treasury");

        let updated = ConflictResolver::new()
            .accept_incoming(&mut db, &conflict.id)
            .unwrap();

        assert_eq!(updated.details, conflict.details);
        let stored = get(&db, &existing.id).unwrap();
        assert_eq!(stored.details.department, "Treasury");
        assert!(stored.details.org_head);
        // Lists are not part of a conflict and stay as they were
        assert_eq!(stored.emails, vec!["jane@book.com"]);
        assert_eq!(pending(&db), 0);
    }

    #[test]
    fn test_accept_incoming_twice_is_not_found() {
        let (mut db, existing) = setup();
        let conflict = raise(&db, &existing, "Treasury");
        let resolver = ConflictResolver::new();

        resolver.accept_incoming(&mut db, &conflict.id).unwrap();
        assert!(matches!(
            resolver.accept_incoming(&mut db, &conflict.id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_accept_incoming_rejects_nameless_snapshot() {
        let (mut db, existing) = setup();
        let conflict =
            ConflictRecord::new(existing.id, ConflictSource::Import, ContactDetails::default());
        SqliteConflictRepository::new(db.connection())
            .insert(&conflict)
            .unwrap();

        let result = ConflictResolver::new().accept_incoming(&mut db, &conflict.id);
        assert!(matches!(result, Err(Error::Validation(_))));
        // Nothing changed, the conflict is still pending
        assert_eq!(get(&db, &existing.id).unwrap(), existing);
        assert_eq!(pending(&db), 1);
    }

    #[test]
    fn test_keep_old_leaves_record_untouched() {
        let (mut db, existing) = setup();
        let conflict = raise(&db, &existing, "Treasury");

        ConflictResolver::new().keep_old(&mut db, &conflict.id).unwrap();

        assert_eq!(get(&db, &existing.id).unwrap(), existing);
        assert_eq!(pending(&db), 0);
        assert!(matches!(
            ConflictResolver::new().keep_old(&mut db, &conflict.id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_keep_both_materializes_local_record() {
        let (mut db, existing) = setup();
        let conflict = raise(&db, &existing, "Treasury");

        let outcome = ConflictResolver::new()
            .keep_both(&mut db, &conflict.id, &RegistrySnapshot::default())
            .unwrap();
        let KeepBothOutcome::Materialized { contact_id } = outcome else {
            panic!("expected a materialized record, got {outcome:?}");
        };

        let created = get(&db, &contact_id).unwrap();
        assert_ne!(created.id, existing.id);
        assert_eq!(created.details, conflict.details);
        assert_eq!(get(&db, &existing.id).unwrap(), existing);
        assert_eq!(pending(&db), 0);
    }

    fn registry() -> RegistrySnapshot {
        RegistrySnapshot::from_records([
            IncomingRecord {
                external_id: "contactid1".to_string(),
                contact: IncomingContact::from_details(ContactDetails::named("Jane", "Eyre")),
            },
            IncomingRecord {
                external_id: "contactid2".to_string(),
                contact: IncomingContact::from_details(ContactDetails {
                    department: "Treasury".to_string(),
                    ..ContactDetails::named("Jane", "Eyre")
                }),
            },
        ])
    }

    #[test]
    fn test_keep_both_reimports_registry_records() {
        let (mut db, mut existing) = setup();
        existing.external_ids = vec!["contactid1".to_string(), "contactid2".to_string()];
        SqliteContactRepository::new(db.connection())
            .update(&mut existing)
            .unwrap();
        let event = Event::new("POM-2023", "Plenary");
        let group = Group::new("Bureau");
        {
            let dirs = SqliteDirectoryRepository::new(db.connection());
            dirs.insert_event(&event).unwrap();
            dirs.insert_group(&group).unwrap();
        }
        let registration =
            Registration::new(existing.id, event.id, RegistrationStatus::Registered, 10);
        SqliteRegistrationRepository::new(db.connection())
            .insert(&registration)
            .unwrap();
        SqliteContactRepository::new(db.connection())
            .add_to_group(&existing.id, &group.id)
            .unwrap();
        let conflict = raise(&db, &existing, "Treasury");
        raise(&db, &existing, "Health");

        let outcome = ConflictResolver::new()
            .keep_both(&mut db, &conflict.id, &registry())
            .unwrap();
        let KeepBothOutcome::Reimported {
            replaced,
            external_ids,
            removed_conflicts,
            relations_moved_to,
            report,
        } = outcome
        else {
            panic!("expected a re-import, got {outcome:?}");
        };

        assert_eq!(replaced, existing.id);
        assert_eq!(external_ids, vec!["contactid1", "contactid2"]);
        assert_eq!(removed_conflicts, 2);
        assert_eq!(report.created, 2);
        assert_eq!(pending(&db), 0);
        assert!(get(&db, &existing.id).is_none());

        let contacts = SqliteContactRepository::new(db.connection());
        assert_eq!(contacts.count().unwrap(), 2);
        let first = contacts.find_by_external_id("contactid1").unwrap().unwrap();
        let second = contacts.find_by_external_id("contactid2").unwrap().unwrap();
        assert_eq!(first.external_ids, vec!["contactid1"]);
        assert_eq!(second.external_ids, vec!["contactid2"]);
        assert_eq!(second.details.department, "Treasury");

        assert_eq!(relations_moved_to, first.id);
        assert_eq!(
            SqliteRegistrationRepository::new(db.connection())
                .list_for_contact(&first.id)
                .unwrap()
                .len(),
            1
        );
        assert_eq!(contacts.list_group_ids(&first.id).unwrap(), vec![group.id]);
    }

    #[test]
    fn test_keep_both_requires_every_id_known() {
        let (mut db, mut existing) = setup();
        existing.external_ids = vec!["contactid1".to_string(), "legacy7".to_string()];
        SqliteContactRepository::new(db.connection())
            .update(&mut existing)
            .unwrap();
        let conflict = raise(&db, &existing, "Treasury");

        let result = ConflictResolver::new().keep_both(&mut db, &conflict.id, &registry());
        assert!(matches!(result, Err(Error::Registry(_))));

        assert_eq!(get(&db, &existing.id).unwrap(), existing);
        assert_eq!(pending(&db), 1);
    }

    struct OfflineRegistry;

    impl ExternalRegistry for OfflineRegistry {
        fn fetch_contact(&self, _external_id: &str) -> Result<Option<IncomingContact>> {
            Err(Error::Io(std::io::Error::other("registry offline")))
        }
    }

    #[test]
    fn test_keep_both_registry_failure_changes_nothing() {
        let (mut db, mut existing) = setup();
        existing.external_ids = vec!["contactid1".to_string()];
        SqliteContactRepository::new(db.connection())
            .update(&mut existing)
            .unwrap();
        let conflict = raise(&db, &existing, "Treasury");

        let result = ConflictResolver::new().keep_both(&mut db, &conflict.id, &OfflineRegistry);
        assert!(matches!(result, Err(Error::Registry(_))));

        assert_eq!(get(&db, &existing.id).unwrap(), existing);
        assert_eq!(pending(&db), 1);
    }

    #[test]
    fn test_resolve_all_applies_policy_in_order() {
        let (mut db, existing) = setup();
        raise(&db, &existing, "Treasury");
        raise(&db, &existing, "Health");

        let report = ConflictResolver::new()
            .resolve_all(&mut db, ResolutionPolicy::SaveIncoming)
            .unwrap();

        assert_eq!(report.resolved, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(pending(&db), 0);
        // Later conflicts are applied last
        assert_eq!(get(&db, &existing.id).unwrap().details.department, "Health");
    }

    #[test]
    fn test_resolve_all_isolates_failures() {
        let (mut db, existing) = setup();
        let bad =
            ConflictRecord::new(existing.id, ConflictSource::Import, ContactDetails::default());
        SqliteConflictRepository::new(db.connection())
            .insert(&bad)
            .unwrap();
        raise(&db, &existing, "Treasury");

        let report = ConflictResolver::new()
            .resolve_all(&mut db, ResolutionPolicy::SaveIncoming)
            .unwrap();

        assert_eq!(report.resolved, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].conflict_id, bad.id);
        assert_eq!(pending(&db), 1);
    }

    #[test]
    fn test_resolve_all_keep_old() {
        let (mut db, existing) = setup();
        raise(&db, &existing, "Treasury");
        let report = ConflictResolver::new()
            .resolve_all(&mut db, ResolutionPolicy::KeepOld)
            .unwrap();

        assert_eq!(report.resolved, 1);
        assert_eq!(get(&db, &existing.id).unwrap(), existing);
    }

    #[test]
    fn test_keep_both_on_import_conflict() {
        let mut db = Database::open_in_memory().unwrap();
        let reconciler = ImportReconciler::default();
        reconciler
            .reconcile(
                &mut db,
                "contactid1",
                IncomingContact::from_details(ContactDetails::named("Jane", "Eyre")),
            )
            .unwrap();
        let outcome = reconciler
            .reconcile(
                &mut db,
                "contactid1",
                IncomingContact::from_details(ContactDetails::named("Janet", "Eyre")),
            )
            .unwrap();
        let ReconcileOutcome::Conflict { conflict } = outcome else {
            panic!("expected a conflict, got {outcome:?}");
        };

        let registry = RegistrySnapshot::from_records([IncomingRecord {
            external_id: "contactid1".to_string(),
            contact: IncomingContact::from_details(ContactDetails::named("Janet", "Eyre")),
        }]);
        ConflictResolver::new()
            .keep_both(&mut db, &conflict.id, &registry)
            .unwrap();

        let reimported = SqliteContactRepository::new(db.connection())
            .find_by_external_id("contactid1")
            .unwrap()
            .unwrap();
        assert_eq!(reimported.details.first_name, "Janet");
        assert!(get(&db, &conflict.existing_contact_id).is_none());
    }
}
