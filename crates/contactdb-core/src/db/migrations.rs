//! Database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub fn run(conn: &mut Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Migration to version 1: Initial schema
fn migrate_v1(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS organizations (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE
        );

        CREATE TABLE IF NOT EXISTS events (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS contact_groups (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE
        );

        CREATE TABLE IF NOT EXISTS contacts (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL DEFAULT '',
            honorific TEXT NOT NULL DEFAULT '',
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            designation TEXT NOT NULL DEFAULT '',
            department TEXT NOT NULL DEFAULT '',
            affiliation TEXT NOT NULL DEFAULT '',
            primary_lang TEXT NOT NULL DEFAULT '',
            second_lang TEXT NOT NULL DEFAULT '',
            third_lang TEXT NOT NULL DEFAULT '',
            notes TEXT NOT NULL DEFAULT '',
            address TEXT NOT NULL DEFAULT '',
            city TEXT NOT NULL DEFAULT '',
            state TEXT NOT NULL DEFAULT '',
            country TEXT NOT NULL DEFAULT '',
            postal_code TEXT NOT NULL DEFAULT '',
            birth_date TEXT,
            organization_id TEXT REFERENCES organizations(id) ON DELETE SET NULL,
            is_in_mailing_list INTEGER NOT NULL DEFAULT 0,
            is_use_organization_address INTEGER NOT NULL DEFAULT 0,
            focal_point INTEGER NOT NULL DEFAULT 0,
            org_head INTEGER NOT NULL DEFAULT 0,
            emails TEXT NOT NULL DEFAULT '[]',
            email_ccs TEXT NOT NULL DEFAULT '[]',
            phones TEXT NOT NULL DEFAULT '[]',
            mobiles TEXT NOT NULL DEFAULT '[]',
            faxes TEXT NOT NULL DEFAULT '[]',
            external_ids TEXT NOT NULL DEFAULT '[]',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_contacts_created ON contacts(created_at);

        CREATE TABLE IF NOT EXISTS group_memberships (
            contact_id TEXT NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
            group_id TEXT NOT NULL REFERENCES contact_groups(id) ON DELETE CASCADE,
            PRIMARY KEY (contact_id, group_id)
        );
        CREATE INDEX IF NOT EXISTS idx_group_memberships_group ON group_memberships(group_id);

        CREATE TABLE IF NOT EXISTS registrations (
            id TEXT PRIMARY KEY,
            contact_id TEXT NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
            event_id TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            status TEXT NOT NULL,
            date INTEGER NOT NULL,
            is_funded INTEGER NOT NULL DEFAULT 0,
            UNIQUE (contact_id, event_id)
        );
        CREATE INDEX IF NOT EXISTS idx_registrations_contact ON registrations(contact_id);

        CREATE TABLE IF NOT EXISTS conflicts (
            id TEXT PRIMARY KEY,
            existing_contact_id TEXT NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
            source TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            honorific TEXT NOT NULL DEFAULT '',
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            designation TEXT NOT NULL DEFAULT '',
            department TEXT NOT NULL DEFAULT '',
            affiliation TEXT NOT NULL DEFAULT '',
            primary_lang TEXT NOT NULL DEFAULT '',
            second_lang TEXT NOT NULL DEFAULT '',
            third_lang TEXT NOT NULL DEFAULT '',
            notes TEXT NOT NULL DEFAULT '',
            address TEXT NOT NULL DEFAULT '',
            city TEXT NOT NULL DEFAULT '',
            state TEXT NOT NULL DEFAULT '',
            country TEXT NOT NULL DEFAULT '',
            postal_code TEXT NOT NULL DEFAULT '',
            birth_date TEXT,
            organization_id TEXT REFERENCES organizations(id) ON DELETE SET NULL,
            is_in_mailing_list INTEGER NOT NULL DEFAULT 0,
            is_use_organization_address INTEGER NOT NULL DEFAULT 0,
            focal_point INTEGER NOT NULL DEFAULT 0,
            org_head INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_conflicts_existing ON conflicts(existing_contact_id);
        CREATE INDEX IF NOT EXISTS idx_conflicts_created ON conflicts(created_at);

        INSERT INTO schema_version (version) VALUES (1);",
    )?;

    tx.commit()?;

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_migrations() {
        let mut conn = setup();
        run(&mut conn).unwrap();

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migrations_idempotent() {
        let mut conn = setup();
        run(&mut conn).unwrap();
        run(&mut conn).unwrap(); // Should not fail

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_conflicts_table_has_no_list_columns() {
        let mut conn = setup();
        run(&mut conn).unwrap();

        let mut stmt = conn
            .prepare("SELECT name FROM pragma_table_info('conflicts')")
            .unwrap();
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();

        assert!(columns.contains(&"existing_contact_id".to_string()));
        assert!(columns.contains(&"department".to_string()));
        for list_column in ["emails", "phones", "external_ids"] {
            assert!(!columns.contains(&list_column.to_string()));
        }
    }
}
