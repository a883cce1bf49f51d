//! Moving owned children between merging contacts
//!
//! Owned children (registrations, pending conflicts) are re-pointed from the
//! loser to the survivor one by one. When a move would break a uniqueness
//! rule scoped to the parent, the store reports a collision and a
//! [`ResolveTransferConflict`] strategy chosen by the child's kind decides
//! which of the two children survives.

use std::collections::HashMap;

use rusqlite::Connection;

use crate::db::{
    ConflictRepository, RegistrationRepository, Repoint, SqliteConflictRepository,
    SqliteRegistrationRepository,
};
use crate::error::{Error, Result};
use crate::models::{ConflictRecord, ContactId, Registration};
use crate::schema::ChildKind;

/// A child row owned by a contact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnedChild {
    Registration(Registration),
    Conflict(ConflictRecord),
}

impl OwnedChild {
    pub const fn kind(&self) -> ChildKind {
        match self {
            Self::Registration(_) => ChildKind::Registration,
            Self::Conflict(_) => ChildKind::Conflict,
        }
    }
}

/// Which child survives a collision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAction {
    /// Drop the loser's child
    KeepExisting,
    /// Drop the survivor's child and move the loser's in its place
    KeepIncoming,
}

/// Strategy deciding a re-point collision.
///
/// `incoming` belongs to the loser, `existing` to the survivor. Both always
/// have the same [`ChildKind`]. Implementations never fail.
pub trait ResolveTransferConflict: Send + Sync {
    fn resolve(&self, incoming: &OwnedChild, existing: &OwnedChild) -> TransferAction;
}

/// Fallback strategy: the survivor's child wins
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepExistingChild;

impl ResolveTransferConflict for KeepExistingChild {
    fn resolve(&self, _incoming: &OwnedChild, _existing: &OwnedChild) -> TransferAction {
        TransferAction::KeepExisting
    }
}

/// The more recent registration wins; ties keep the survivor's
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestRegistrationWins;

impl ResolveTransferConflict for LatestRegistrationWins {
    fn resolve(&self, incoming: &OwnedChild, existing: &OwnedChild) -> TransferAction {
        match (incoming, existing) {
            (OwnedChild::Registration(incoming), OwnedChild::Registration(existing))
                if incoming.date > existing.date =>
            {
                TransferAction::KeepIncoming
            }
            _ => TransferAction::KeepExisting,
        }
    }
}

/// Strategy table keyed by child kind, with a fallback
pub struct TransferResolvers {
    fallback: Box<dyn ResolveTransferConflict>,
    overrides: HashMap<ChildKind, Box<dyn ResolveTransferConflict>>,
}

impl TransferResolvers {
    /// A table where every kind uses `fallback`
    pub fn new(fallback: impl ResolveTransferConflict + 'static) -> Self {
        Self {
            fallback: Box::new(fallback),
            overrides: HashMap::new(),
        }
    }

    /// Use `resolver` for collisions between children of `kind`
    #[must_use]
    pub fn with(
        mut self,
        kind: ChildKind,
        resolver: impl ResolveTransferConflict + 'static,
    ) -> Self {
        self.register(kind, resolver);
        self
    }

    pub fn register(&mut self, kind: ChildKind, resolver: impl ResolveTransferConflict + 'static) {
        self.overrides.insert(kind, Box::new(resolver));
    }

    pub fn resolve(&self, incoming: &OwnedChild, existing: &OwnedChild) -> TransferAction {
        self.overrides
            .get(&incoming.kind())
            .unwrap_or(&self.fallback)
            .resolve(incoming, existing)
    }
}

impl Default for TransferResolvers {
    fn default() -> Self {
        Self::new(KeepExistingChild).with(ChildKind::Registration, LatestRegistrationWins)
    }
}

impl std::fmt::Debug for TransferResolvers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferResolvers")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Children moved and dropped by one transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub moved: usize,
    pub discarded: usize,
}

/// Per-kind access to owned child rows
struct ChildStore<'a> {
    conn: &'a Connection,
}

impl<'a> ChildStore<'a> {
    const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn list(&self, kind: ChildKind, owner: &ContactId) -> Result<Vec<OwnedChild>> {
        Ok(match kind {
            ChildKind::Registration => SqliteRegistrationRepository::new(self.conn)
                .list_for_contact(owner)?
                .into_iter()
                .map(OwnedChild::Registration)
                .collect(),
            ChildKind::Conflict => SqliteConflictRepository::new(self.conn)
                .list_for_contact(owner)?
                .into_iter()
                .map(OwnedChild::Conflict)
                .collect(),
        })
    }

    fn repoint(&self, child: &OwnedChild, to: &ContactId) -> Result<Repoint> {
        match child {
            OwnedChild::Registration(registration) => {
                SqliteRegistrationRepository::new(self.conn).repoint(&registration.id, to)
            }
            OwnedChild::Conflict(conflict) => {
                SqliteConflictRepository::new(self.conn).repoint(&conflict.id, to)?;
                Ok(Repoint::Moved)
            }
        }
    }

    /// The child of `owner` that `child` collided with
    fn colliding(&self, child: &OwnedChild, owner: &ContactId) -> Result<Option<OwnedChild>> {
        match child {
            OwnedChild::Registration(registration) => {
                Ok(SqliteRegistrationRepository::new(self.conn)
                    .find_for_event(owner, &registration.event_id)?
                    .map(OwnedChild::Registration))
            }
            OwnedChild::Conflict(_) => Ok(None),
        }
    }

    fn delete(&self, child: &OwnedChild) -> Result<()> {
        match child {
            OwnedChild::Registration(registration) => {
                SqliteRegistrationRepository::new(self.conn).delete(&registration.id)
            }
            OwnedChild::Conflict(conflict) => {
                SqliteConflictRepository::new(self.conn).delete(&conflict.id)
            }
        }
    }
}

/// Move every `kind` child of `from` to `to`, settling collisions with
/// `resolvers`
pub fn transfer_children(
    conn: &Connection,
    kind: ChildKind,
    from: &ContactId,
    to: &ContactId,
    resolvers: &TransferResolvers,
) -> Result<TransferStats> {
    let store = ChildStore::new(conn);
    let mut stats = TransferStats::default();

    for child in store.list(kind, from)? {
        if store.repoint(&child, to)? == Repoint::Moved {
            stats.moved += 1;
            continue;
        }

        let existing = store.colliding(&child, to)?.ok_or_else(|| {
            Error::Database(format!("{kind:?} collided on move but no counterpart exists"))
        })?;

        match resolvers.resolve(&child, &existing) {
            TransferAction::KeepExisting => {
                tracing::debug!("Dropping colliding {kind:?} of {from}");
                store.delete(&child)?;
            }
            TransferAction::KeepIncoming => {
                tracing::debug!("Replacing {kind:?} of {to} with the one from {from}");
                store.delete(&existing)?;
                if store.repoint(&child, to)? != Repoint::Moved {
                    return Err(Error::Database(format!(
                        "{kind:?} still collides after removing the counterpart"
                    )));
                }
                stats.moved += 1;
            }
        }
        stats.discarded += 1;
    }

    Ok(stats)
}
