//! End-to-end merge, import and resolution scenarios against an in-memory store

use contactdb_core::db::{
    ConflictRepository, ContactRepository, Database, DirectoryRepository,
    RegistrationRepository, SqliteConflictRepository, SqliteContactRepository,
    SqliteDirectoryRepository, SqliteRegistrationRepository,
};
use contactdb_core::import::RegistrySnapshot;
use contactdb_core::models::{
    Contact, ContactDetails, Event, IncomingContact, Registration, RegistrationStatus,
};
use contactdb_core::resolve::KeepBothOutcome;
use contactdb_core::{
    ConflictResolver, Error, ImportReconciler, IncomingRecord, MergeEngine, ReconcileOutcome,
    ResolutionPolicy,
};
use pretty_assertions::assert_eq;

fn store(db: &Database, contact: &Contact) {
    SqliteContactRepository::new(db.connection())
        .insert(contact)
        .unwrap();
}

fn fetch(db: &Database, contact: &Contact) -> Option<Contact> {
    SqliteContactRepository::new(db.connection())
        .get(&contact.id)
        .unwrap()
}

fn pending(db: &Database) -> usize {
    SqliteConflictRepository::new(db.connection())
        .count()
        .unwrap()
}

fn jane(department: &str) -> Contact {
    Contact::new(ContactDetails {
        department: department.to_string(),
        ..ContactDetails::named("Jane", "Eyre")
    })
}

#[test]
fn scenario_a_list_fields_are_unioned_without_conflict() {
    let mut db = Database::open_in_memory().unwrap();
    let survivor = jane("Finance").with_emails(["a@x.com"]);
    let loser = jane("Finance").with_emails(["a@x.com", "b@x.com"]);
    store(&db, &survivor);
    store(&db, &loser);

    let outcome = MergeEngine::default()
        .merge(&mut db, &survivor.id, &loser.id)
        .unwrap();

    assert_eq!(outcome.survivor.emails, vec!["a@x.com", "b@x.com"]);
    assert!(outcome.conflict.is_none());
    assert_eq!(pending(&db), 0);
}

#[test]
fn scenario_b_differing_scalar_raises_a_conflict() {
    let mut db = Database::open_in_memory().unwrap();
    let survivor = jane("Finance");
    let loser = jane("Treasury");
    store(&db, &survivor);
    store(&db, &loser);

    let outcome = MergeEngine::default()
        .merge(&mut db, &survivor.id, &loser.id)
        .unwrap();

    let conflict = outcome.conflict.unwrap();
    assert_eq!(conflict.details.department, "Treasury");
    assert_eq!(conflict.existing_contact_id, survivor.id);
    assert_eq!(fetch(&db, &survivor).unwrap().details.department, "Finance");
    assert_eq!(
        SqliteConflictRepository::new(db.connection())
            .list_for_contact(&survivor.id)
            .unwrap(),
        vec![conflict]
    );
}

#[test]
fn scenario_c_later_registration_wins_on_collision() {
    let mut db = Database::open_in_memory().unwrap();
    let survivor = jane("Finance");
    let loser = jane("Finance");
    store(&db, &survivor);
    store(&db, &loser);
    let event = Event::new("POM-2023", "Plenary");
    SqliteDirectoryRepository::new(db.connection())
        .insert_event(&event)
        .unwrap();

    let older = Registration::new(survivor.id, event.id, RegistrationStatus::Registered, 100);
    let newer = Registration::new(loser.id, event.id, RegistrationStatus::Accredited, 200);
    {
        let registrations = SqliteRegistrationRepository::new(db.connection());
        registrations.insert(&older).unwrap();
        registrations.insert(&newer).unwrap();
    }

    MergeEngine::default()
        .merge(&mut db, &survivor.id, &loser.id)
        .unwrap();

    let registrations = SqliteRegistrationRepository::new(db.connection());
    let kept = registrations.list_for_contact(&survivor.id).unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].id, newer.id);
    assert_eq!(kept[0].date, 200);
    assert_eq!(registrations.count().unwrap(), 1);
}

#[test]
fn scenario_d_identical_import_is_skipped() {
    let mut db = Database::open_in_memory().unwrap();
    let reconciler = ImportReconciler::default();
    let record = || IncomingRecord {
        external_id: "contactid1".to_string(),
        contact: IncomingContact::from_details(ContactDetails {
            department: "Finance".to_string(),
            ..ContactDetails::named("Jane", "Eyre")
        }),
    };

    let report = reconciler.reconcile_batch(&mut db, [record(), record()]);

    assert_eq!(report.created, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.conflicts, 0);
    assert_eq!(pending(&db), 0);
}

#[test]
fn scenario_e_keep_both_splits_a_prior_merge_product() {
    let mut db = Database::open_in_memory().unwrap();
    let survivor = jane("Finance").with_external_ids(["contactid1"]);
    let loser = jane("Treasury").with_external_ids(["contactid2"]);
    store(&db, &survivor);
    store(&db, &loser);

    let outcome = MergeEngine::default()
        .merge(&mut db, &survivor.id, &loser.id)
        .unwrap();
    assert_eq!(outcome.survivor.external_ids, vec!["contactid1", "contactid2"]);
    let conflict = outcome.conflict.unwrap();

    let registry = RegistrySnapshot::from_records([
        IncomingRecord {
            external_id: "contactid1".to_string(),
            contact: IncomingContact::from_details(survivor.details.clone()),
        },
        IncomingRecord {
            external_id: "contactid2".to_string(),
            contact: IncomingContact::from_details(loser.details.clone()),
        },
    ]);
    let result = ConflictResolver::new()
        .keep_both(&mut db, &conflict.id, &registry)
        .unwrap();
    assert!(matches!(result, KeepBothOutcome::Reimported { .. }));

    let contacts = SqliteContactRepository::new(db.connection());
    let all = contacts.list(10, 0).unwrap();
    assert_eq!(all.len(), 2);
    let mut ids: Vec<_> = all.iter().map(|contact| contact.external_ids.clone()).collect();
    ids.sort();
    assert_eq!(
        ids,
        vec![vec!["contactid1".to_string()], vec!["contactid2".to_string()]]
    );
    assert_eq!(pending(&db), 0);
}

#[test]
fn merged_loser_no_longer_exists() {
    let mut db = Database::open_in_memory().unwrap();
    let survivor = jane("Finance");
    let loser = jane("Treasury");
    store(&db, &survivor);
    store(&db, &loser);

    MergeEngine::default()
        .merge(&mut db, &survivor.id, &loser.id)
        .unwrap();

    assert!(fetch(&db, &loser).is_none());
    let again = MergeEngine::default().merge(&mut db, &survivor.id, &loser.id);
    assert!(matches!(again, Err(Error::NotFound(_))));
}

#[test]
fn every_resolution_removes_its_conflict() {
    let mut db = Database::open_in_memory().unwrap();
    let existing = jane("Finance");
    store(&db, &existing);
    let resolver = ConflictResolver::new();

    for policy in [ResolutionPolicy::KeepOld, ResolutionPolicy::SaveIncoming] {
        let loser = jane("Treasury");
        store(&db, &loser);
        let conflict = MergeEngine::default()
            .merge(&mut db, &existing.id, &loser.id)
            .unwrap()
            .conflict
            .unwrap();

        resolver.resolve(&mut db, &conflict.id, policy).unwrap();
        assert!(SqliteConflictRepository::new(db.connection())
            .get(&conflict.id)
            .unwrap()
            .is_none());
    }

    let loser = jane("Health");
    store(&db, &loser);
    let conflict = MergeEngine::default()
        .merge(&mut db, &existing.id, &loser.id)
        .unwrap()
        .conflict
        .unwrap();
    resolver
        .keep_both(&mut db, &conflict.id, &RegistrySnapshot::default())
        .unwrap();
    assert_eq!(pending(&db), 0);
}

#[test]
fn conflict_is_raised_only_when_both_sides_are_set_and_differ() {
    let cases = [
        ("Finance", "Finance", false),
        ("Finance", "", false),
        ("", "Treasury", false),
        ("Finance", "Treasury", true),
    ];

    for (kept, merged, expect_conflict) in cases {
        let mut db = Database::open_in_memory().unwrap();
        let survivor = jane(kept);
        let loser = jane(merged);
        store(&db, &survivor);
        store(&db, &loser);

        let outcome = MergeEngine::default()
            .merge(&mut db, &survivor.id, &loser.id)
            .unwrap();
        assert_eq!(
            outcome.conflict.is_some(),
            expect_conflict,
            "survivor {kept:?}, loser {merged:?}"
        );
    }
}

#[test]
fn loser_scalars_survive_in_record_or_conflict() {
    let mut db = Database::open_in_memory().unwrap();
    let survivor = Contact::new(ContactDetails {
        department: "Finance".to_string(),
        ..ContactDetails::named("Jane", "Eyre")
    });
    let loser = Contact::new(ContactDetails {
        department: "Treasury".to_string(),
        city: "Thornfield".to_string(),
        notes: "prefers post".to_string(),
        ..ContactDetails::named("Jane", "Eyre")
    });
    store(&db, &survivor);
    store(&db, &loser);

    let outcome = MergeEngine::default()
        .merge(&mut db, &survivor.id, &loser.id)
        .unwrap();

    let kept = fetch(&db, &survivor).unwrap().details;
    let snapshot = outcome.conflict.unwrap().details;
    for (field, value) in [
        ("department", &loser.details.department),
        ("city", &loser.details.city),
        ("notes", &loser.details.notes),
    ] {
        let stored = match field {
            "department" => (&kept.department, &snapshot.department),
            "city" => (&kept.city, &snapshot.city),
            _ => (&kept.notes, &snapshot.notes),
        };
        assert!(
            stored.0 == value || stored.1 == value,
            "{field} value {value:?} was lost"
        );
    }
}

#[test]
fn merging_equal_lists_changes_nothing() {
    let mut db = Database::open_in_memory().unwrap();
    let survivor = jane("Finance").with_emails(["a@x.com", "b@x.com"]);
    let loser = jane("Finance").with_emails(["b@x.com", "a@x.com"]);
    store(&db, &survivor);
    store(&db, &loser);

    let outcome = MergeEngine::default()
        .merge(&mut db, &survivor.id, &loser.id)
        .unwrap();

    assert_eq!(outcome.survivor.emails, survivor.emails);
    assert_eq!(outcome.appended_items, 0);
}

#[test]
fn import_disagreement_is_resolved_in_bulk() {
    let mut db = Database::open_in_memory().unwrap();
    let reconciler = ImportReconciler::default();
    let incoming = |department: &str| {
        IncomingContact::from_details(ContactDetails {
            department: department.to_string(),
            ..ContactDetails::named("Jane", "Eyre")
        })
    };

    reconciler
        .reconcile(&mut db, "contactid1", incoming("Finance"))
        .unwrap();
    let outcome = reconciler
        .reconcile(&mut db, "contactid1", incoming("Treasury"))
        .unwrap();
    let ReconcileOutcome::Conflict { conflict } = outcome else {
        panic!("expected a conflict, got {outcome:?}");
    };

    let report = ConflictResolver::new()
        .resolve_all(&mut db, ResolutionPolicy::SaveIncoming)
        .unwrap();
    assert_eq!(report.resolved, 1);

    let contact = SqliteContactRepository::new(db.connection())
        .get(&conflict.existing_contact_id)
        .unwrap()
        .unwrap();
    assert_eq!(contact.details.department, "Treasury");
    assert_eq!(pending(&db), 0);
}
