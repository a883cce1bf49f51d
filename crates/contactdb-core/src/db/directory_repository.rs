//! Organizations, events and groups

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::{Event, Group, Organization, OrganizationId};

/// Trait for the reference data contacts point at
pub trait DirectoryRepository {
    fn insert_organization(&self, organization: &Organization) -> Result<()>;

    fn get_organization(&self, id: &OrganizationId) -> Result<Option<Organization>>;

    fn insert_event(&self, event: &Event) -> Result<()>;

    /// Look up an event by its unique code
    fn find_event(&self, code: &str) -> Result<Option<Event>>;

    fn insert_group(&self, group: &Group) -> Result<()>;
}

/// `SQLite` implementation of `DirectoryRepository`
pub struct SqliteDirectoryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteDirectoryRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl DirectoryRepository for SqliteDirectoryRepository<'_> {
    fn insert_organization(&self, organization: &Organization) -> Result<()> {
        self.conn.execute(
            "INSERT INTO organizations (id, name) VALUES (?, ?)",
            params![organization.id, organization.name],
        )?;
        Ok(())
    }

    fn get_organization(&self, id: &OrganizationId) -> Result<Option<Organization>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name FROM organizations WHERE id = ?",
                params![id],
                |row| {
                    Ok(Organization {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn insert_event(&self, event: &Event) -> Result<()> {
        self.conn.execute(
            "INSERT INTO events (id, code, title) VALUES (?, ?, ?)",
            params![event.id, event.code, event.title],
        )?;
        Ok(())
    }

    fn find_event(&self, code: &str) -> Result<Option<Event>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, code, title FROM events WHERE code = ?",
                params![code],
                |row| {
                    Ok(Event {
                        id: row.get(0)?,
                        code: row.get(1)?,
                        title: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    fn insert_group(&self, group: &Group) -> Result<()> {
        self.conn.execute(
            "INSERT INTO contact_groups (id, name) VALUES (?, ?)",
            params![group.id, group.name],
        )?;
        Ok(())
    }
}
