//! Record merge engine
//!
//! Folds a losing contact into a surviving one field by field, following the
//! kind [`crate::schema::classify`] assigns to each descriptor. Values that
//! cannot be reconciled without a human are captured in a
//! [`ConflictRecord`] instead of being dropped. The loser is always deleted.

mod transfer;

use rusqlite::Connection;
use serde::Serialize;

use crate::db::{
    ConflictRepository, ContactRepository, Database, SqliteConflictRepository,
    SqliteContactRepository,
};
use crate::error::{Error, Result};
use crate::models::{ConflictRecord, Contact, ContactId};
use crate::schema::{
    classify_schema, EntitySchema, FieldAccess, FieldKind, RelationKind, CONTACT_SCHEMA,
};
use crate::util::union_into;

pub use transfer::{
    transfer_children, KeepExistingChild, LatestRegistrationWins, OwnedChild,
    ResolveTransferConflict, TransferAction, TransferResolvers, TransferStats,
};

/// Result of merging one loser into a survivor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    /// The survivor as persisted
    pub survivor: Contact,
    /// The deleted loser
    pub loser_id: ContactId,
    /// Snapshot of the loser when any field conflicted
    pub conflict: Option<ConflictRecord>,
    /// Fields that differed with both sides set
    pub conflicting_fields: Vec<&'static str>,
    /// Empty survivor fields filled from the loser
    pub filled_fields: Vec<&'static str>,
    /// List items appended to the survivor
    pub appended_items: usize,
    /// Owned children re-pointed to the survivor
    pub moved_children: usize,
    /// Owned children dropped on a collision
    pub discarded_children: usize,
    /// Group memberships gained by the survivor
    pub linked_relations: usize,
}

/// Merges contacts inside a single transaction
#[derive(Debug)]
pub struct MergeEngine {
    schema: &'static EntitySchema,
    resolvers: TransferResolvers,
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new(TransferResolvers::default())
    }
}

impl MergeEngine {
    /// Engine over the contact schema using `resolvers` for child collisions
    pub fn new(resolvers: TransferResolvers) -> Self {
        Self {
            schema: &CONTACT_SCHEMA,
            resolvers,
        }
    }

    /// Engine over a different field table of the contact entity
    #[must_use]
    pub fn with_schema(mut self, schema: &'static EntitySchema) -> Self {
        self.schema = schema;
        self
    }

    /// Merge `loser` into `survivor`, committing only if every step succeeds
    pub fn merge(
        &self,
        db: &mut Database,
        survivor: &ContactId,
        loser: &ContactId,
    ) -> Result<MergeOutcome> {
        let tx = db.transaction()?;
        let outcome = self.merge_in(&tx, survivor, loser)?;
        tx.commit()?;

        tracing::info!(
            "Merged contact {} into {} ({} conflicting, {} filled, {} children moved)",
            loser,
            survivor,
            outcome.conflicting_fields.len(),
            outcome.filled_fields.len(),
            outcome.moved_children
        );
        Ok(outcome)
    }

    /// Merge every record of `losers` into `survivor`, in order, as one
    /// transaction
    pub fn merge_many(
        &self,
        db: &mut Database,
        survivor: &ContactId,
        losers: &[ContactId],
    ) -> Result<Vec<MergeOutcome>> {
        if losers.is_empty() {
            return Err(Error::InvalidInput(
                "select at least one record to merge".to_string(),
            ));
        }

        let tx = db.transaction()?;
        let outcomes = losers
            .iter()
            .map(|loser| self.merge_in(&tx, survivor, loser))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;

        let conflicts = outcomes.iter().filter(|o| o.conflict.is_some()).count();
        tracing::info!(
            "Merged {} contacts into {} ({} conflicts raised)",
            outcomes.len(),
            survivor,
            conflicts
        );
        Ok(outcomes)
    }

    /// Merge within a caller-owned transaction
    pub fn merge_in(
        &self,
        conn: &Connection,
        survivor: &ContactId,
        loser: &ContactId,
    ) -> Result<MergeOutcome> {
        if survivor == loser {
            return Err(Error::InvalidInput(format!(
                "cannot merge contact {survivor} into itself"
            )));
        }

        // Classify up front so a bad schema aborts before any write
        let fields = classify_schema(self.schema)?;

        let contacts = SqliteContactRepository::new(conn);
        let mut kept = contacts
            .get(survivor)?
            .ok_or_else(|| Error::NotFound(format!("contact {survivor}")))?;
        let mut lost = contacts
            .get(loser)?
            .ok_or_else(|| Error::NotFound(format!("contact {loser}")))?;

        let mut outcome = MergeOutcome {
            survivor: kept.clone(),
            loser_id: *loser,
            conflict: None,
            conflicting_fields: Vec::new(),
            filled_fields: Vec::new(),
            appended_items: 0,
            moved_children: 0,
            discarded_children: 0,
            linked_relations: 0,
        };

        for field in &fields {
            let name = field.descriptor.name;
            match (field.kind, field.descriptor.access) {
                (FieldKind::Ignored, _) => {}
                (FieldKind::Relation, FieldAccess::Relation(RelationKind::Groups)) => {
                    outcome.linked_relations += contacts.copy_group_memberships(loser, survivor)?;
                }
                (FieldKind::OwnedRelation, FieldAccess::Relation(relation)) => {
                    let child = relation.child_kind().ok_or_else(|| {
                        Error::Schema(format!(
                            "{}.{name} is owned but has no child entity",
                            self.schema.entity
                        ))
                    })?;
                    let stats = transfer_children(conn, child, loser, survivor, &self.resolvers)?;
                    outcome.moved_children += stats.moved;
                    outcome.discarded_children += stats.discarded;
                }
                (FieldKind::Boolean, FieldAccess::Flag { get, .. }) => {
                    if get(&kept.details) != get(&lost.details) {
                        tracing::debug!("Flag {name} differs between {survivor} and {loser}");
                        outcome.conflicting_fields.push(name);
                    }
                }
                (FieldKind::Array, FieldAccess::List { items }) => {
                    let incoming = std::mem::take(items(&mut lost));
                    outcome.appended_items += union_into(items(&mut kept), incoming);
                }
                (FieldKind::Scalar, FieldAccess::Scalar { get, set }) => {
                    let ours = get(&kept.details);
                    let theirs = get(&lost.details);
                    if ours == theirs || theirs.is_empty() {
                        continue;
                    }
                    if ours.is_empty() {
                        tracing::debug!("Filling {name} of {survivor} with {theirs}");
                        set(&mut kept.details, theirs)?;
                        outcome.filled_fields.push(name);
                    } else {
                        tracing::debug!("Field {name} conflicts: {ours} vs {theirs}");
                        outcome.conflicting_fields.push(name);
                    }
                }
                (kind, access) => {
                    return Err(Error::Schema(format!(
                        "{}.{name} is classified {kind:?} but exposes {access:?}",
                        self.schema.entity
                    )));
                }
            }
        }

        contacts.update(&mut kept)?;

        if !outcome.conflicting_fields.is_empty() {
            let conflict = ConflictRecord::from_loser(*survivor, &lost);
            SqliteConflictRepository::new(conn).insert(&conflict)?;
            outcome.conflict = Some(conflict);
        }

        contacts.delete(loser)?;

        outcome.survivor = kept;
        Ok(outcome)
    }
}
