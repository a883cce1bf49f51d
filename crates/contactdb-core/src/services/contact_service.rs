//! Shared database service wrapper used by every surface.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::EngineConfig;
use crate::db::{
    ConflictRepository, ContactRepository, Database, RegistrationRepository,
    SqliteConflictRepository, SqliteContactRepository, SqliteRegistrationRepository,
};
use crate::import::{
    ExternalRegistry, ImportReconciler, ImportReport, IncomingRecord, ReconcileOutcome,
};
use crate::merge::{MergeEngine, MergeOutcome};
use crate::models::{
    ConflictId, ConflictRecord, Contact, ContactId, IncomingContact, Registration,
};
use crate::resolve::{ConflictResolver, KeepBothOutcome, ResolutionPolicy, ResolveReport};
use crate::{Error, Result};

/// Thread-safe service for merges, imports and conflict resolution.
///
/// Every operation goes through one lock, so two operations touching the
/// same records never interleave. `SQLite` work runs on tokio's blocking pool
/// so callers on the async runtime are never stalled. Batch operations take
/// the lock per item.
#[derive(Clone)]
pub struct ContactService {
    db: Arc<Mutex<Database>>,
    engine: Arc<MergeEngine>,
    reconciler: ImportReconciler,
    resolver: ConflictResolver,
}

impl ContactService {
    /// Open a service on the database file at `db_path`.
    pub async fn open_path(db_path: impl Into<PathBuf>, config: &EngineConfig) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        tracing::debug!("Opened contact database at {}", db_path.display());
        Ok(Self::from_database(db, config))
    }

    /// Open an in-memory service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::from_database(db, &EngineConfig::default()))
    }

    fn from_database(db: Database, config: &EngineConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            engine: Arc::new(MergeEngine::default()),
            reconciler: ImportReconciler::new(config.import.clone()),
            resolver: ConflictResolver::new(),
        }
    }

    /// Run `operation` on a blocking thread while holding the database lock
    async fn with_db<T, F>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&mut Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut db = Arc::clone(&self.db).lock_owned().await;
        tokio::task::spawn_blocking(move || operation(&mut db))
            .await
            .map_err(|error| Error::Database(format!("database task failed: {error}")))?
    }

    /// Store a new contact.
    pub async fn insert_contact(&self, contact: &Contact) -> Result<()> {
        let contact = contact.clone();
        self.with_db(move |db| SqliteContactRepository::new(db.connection()).insert(&contact))
            .await
    }

    /// Fetch a contact by id.
    pub async fn get_contact(&self, id: &ContactId) -> Result<Option<Contact>> {
        let id = *id;
        self.with_db(move |db| SqliteContactRepository::new(db.connection()).get(&id))
            .await
    }

    /// List contacts oldest-first.
    pub async fn list_contacts(&self, limit: usize, offset: usize) -> Result<Vec<Contact>> {
        self.with_db(move |db| SqliteContactRepository::new(db.connection()).list(limit, offset))
            .await
    }

    /// Registrations held by a contact.
    pub async fn list_registrations(&self, contact: &ContactId) -> Result<Vec<Registration>> {
        let contact = *contact;
        self.with_db(move |db| {
            SqliteRegistrationRepository::new(db.connection()).list_for_contact(&contact)
        })
        .await
    }

    /// Fetch a pending conflict by id.
    pub async fn get_conflict(&self, id: &ConflictId) -> Result<Option<ConflictRecord>> {
        let id = *id;
        self.with_db(move |db| SqliteConflictRepository::new(db.connection()).get(&id))
            .await
    }

    /// List pending conflicts oldest-first.
    pub async fn list_conflicts(&self, limit: usize, offset: usize) -> Result<Vec<ConflictRecord>> {
        self.with_db(move |db| SqliteConflictRepository::new(db.connection()).list(limit, offset))
            .await
    }

    /// Pending conflicts raised against one contact.
    pub async fn list_conflicts_for(&self, contact: &ContactId) -> Result<Vec<ConflictRecord>> {
        let contact = *contact;
        self.with_db(move |db| {
            SqliteConflictRepository::new(db.connection()).list_for_contact(&contact)
        })
        .await
    }

    /// Merge `loser` into `survivor`.
    pub async fn merge(&self, survivor: &ContactId, loser: &ContactId) -> Result<MergeOutcome> {
        let (survivor, loser) = (*survivor, *loser);
        let engine = Arc::clone(&self.engine);
        self.with_db(move |db| engine.merge(db, &survivor, &loser))
            .await
    }

    /// Merge a selected set into `survivor` as one unit.
    pub async fn merge_many(
        &self,
        survivor: &ContactId,
        losers: &[ContactId],
    ) -> Result<Vec<MergeOutcome>> {
        let survivor = *survivor;
        let losers = losers.to_vec();
        let engine = Arc::clone(&self.engine);
        self.with_db(move |db| engine.merge_many(db, &survivor, &losers))
            .await
    }

    /// Reconcile one incoming registry record.
    pub async fn reconcile(
        &self,
        external_id: &str,
        incoming: IncomingContact,
    ) -> Result<ReconcileOutcome> {
        let external_id = external_id.to_string();
        let reconciler = self.reconciler.clone();
        self.with_db(move |db| reconciler.reconcile(db, &external_id, incoming))
            .await
    }

    /// Reconcile a batch of records, locking per record.
    pub async fn reconcile_batch(&self, records: Vec<IncomingRecord>) -> ImportReport {
        let mut report = ImportReport::default();

        for record in records {
            let result = self.reconcile(&record.external_id, record.contact).await;
            if !self.reconciler.tally(&mut report, &record.external_id, result) {
                break;
            }
        }

        report.log_summary();
        report
    }

    /// Replace the existing record's fields with the conflict's.
    pub async fn accept_incoming(&self, id: &ConflictId) -> Result<Contact> {
        let (id, resolver) = (*id, self.resolver);
        self.with_db(move |db| resolver.accept_incoming(db, &id))
            .await
    }

    /// Drop a conflict, keeping the existing record.
    pub async fn keep_old(&self, id: &ConflictId) -> Result<()> {
        let (id, resolver) = (*id, self.resolver);
        self.with_db(move |db| resolver.keep_old(db, &id)).await
    }

    /// Keep both sides of a conflict as separate records.
    pub async fn keep_both(
        &self,
        id: &ConflictId,
        registry: Arc<dyn ExternalRegistry>,
    ) -> Result<KeepBothOutcome> {
        let (id, resolver) = (*id, self.resolver);
        self.with_db(move |db| resolver.keep_both(db, &id, registry.as_ref()))
            .await
    }

    /// Settle one conflict with a policy.
    pub async fn resolve(&self, id: &ConflictId, policy: ResolutionPolicy) -> Result<()> {
        let (id, resolver) = (*id, self.resolver);
        self.with_db(move |db| resolver.resolve(db, &id, policy))
            .await
    }

    /// Settle every pending conflict with `policy`, locking per conflict.
    pub async fn resolve_all(&self, policy: ResolutionPolicy) -> Result<ResolveReport> {
        let ids = self
            .with_db(|db| SqliteConflictRepository::new(db.connection()).list_ids())
            .await?;
        let mut report = ResolveReport::new(policy);

        for id in ids {
            let result = self.resolve(&id, policy).await;
            report.tally(id, result);
        }

        report.log_summary();
        Ok(report)
    }
}
