//! Registration repository implementation

use rusqlite::{params, Connection, OptionalExtension};

use super::sql::is_unique_violation;
use crate::error::{Error, Result};
use crate::models::{ContactId, EventId, Registration, RegistrationId};

/// What happened when a registration was moved to another contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repoint {
    Moved,
    /// The target already holds a registration for the same event
    Collision,
}

/// Trait for registration storage operations
pub trait RegistrationRepository {
    fn insert(&self, registration: &Registration) -> Result<()>;

    fn get(&self, id: &RegistrationId) -> Result<Option<Registration>>;

    /// Registrations held by a contact, oldest first
    fn list_for_contact(&self, contact: &ContactId) -> Result<Vec<Registration>>;

    /// The registration a contact holds for an event, if any
    fn find_for_event(&self, contact: &ContactId, event: &EventId) -> Result<Option<Registration>>;

    /// Move a registration to `contact`, reporting a uniqueness collision
    /// instead of failing
    fn repoint(&self, id: &RegistrationId, contact: &ContactId) -> Result<Repoint>;

    fn delete(&self, id: &RegistrationId) -> Result<()>;

    fn count(&self) -> Result<usize>;
}

/// `SQLite` implementation of `RegistrationRepository`
pub struct SqliteRegistrationRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteRegistrationRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a registration from a database row
    fn parse_registration(row: &rusqlite::Row<'_>) -> rusqlite::Result<Registration> {
        Ok(Registration {
            id: row.get(0)?,
            contact_id: row.get(1)?,
            event_id: row.get(2)?,
            status: row.get(3)?,
            date: row.get(4)?,
            is_funded: row.get(5)?,
        })
    }
}

impl RegistrationRepository for SqliteRegistrationRepository<'_> {
    fn insert(&self, registration: &Registration) -> Result<()> {
        self.conn.execute(
            "INSERT INTO registrations (id, contact_id, event_id, status, date, is_funded)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                registration.id,
                registration.contact_id,
                registration.event_id,
                registration.status,
                registration.date,
                registration.is_funded,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &RegistrationId) -> Result<Option<Registration>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, contact_id, event_id, status, date, is_funded
                 FROM registrations WHERE id = ?",
                params![id],
                Self::parse_registration,
            )
            .optional()?)
    }

    fn list_for_contact(&self, contact: &ContactId) -> Result<Vec<Registration>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, contact_id, event_id, status, date, is_funded
             FROM registrations WHERE contact_id = ?
             ORDER BY date ASC, id ASC",
        )?;
        let registrations = stmt
            .query_map(params![contact], Self::parse_registration)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(registrations)
    }

    fn find_for_event(&self, contact: &ContactId, event: &EventId) -> Result<Option<Registration>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, contact_id, event_id, status, date, is_funded
                 FROM registrations WHERE contact_id = ? AND event_id = ?",
                params![contact, event],
                Self::parse_registration,
            )
            .optional()?)
    }

    fn repoint(&self, id: &RegistrationId, contact: &ContactId) -> Result<Repoint> {
        match self.conn.execute(
            "UPDATE registrations SET contact_id = ? WHERE id = ?",
            params![contact, id],
        ) {
            Ok(0) => Err(Error::NotFound(format!("registration {id}"))),
            Ok(_) => Ok(Repoint::Moved),
            Err(error) if is_unique_violation(&error) => Ok(Repoint::Collision),
            Err(error) => Err(error.into()),
        }
    }

    fn delete(&self, id: &RegistrationId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM registrations WHERE id = ?", params![id])?;

        if rows == 0 {
            return Err(Error::NotFound(format!("registration {id}")));
        }
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM registrations", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
