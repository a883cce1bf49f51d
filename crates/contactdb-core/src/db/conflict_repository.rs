//! Conflict store

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET

use rusqlite::{params, Connection, OptionalExtension, ToSql};

use super::sql::{detail_params, placeholders, read_details, DETAIL_COLUMNS};
use crate::error::{Error, Result};
use crate::models::{ConflictId, ConflictRecord, ContactId};

/// Trait for pending conflict storage
pub trait ConflictRepository {
    fn insert(&self, conflict: &ConflictRecord) -> Result<()>;

    fn get(&self, id: &ConflictId) -> Result<Option<ConflictRecord>>;

    /// Delete a conflict; `NotFound` when it was already resolved
    fn delete(&self, id: &ConflictId) -> Result<()>;

    /// Pending conflicts in creation order
    fn list(&self, limit: usize, offset: usize) -> Result<Vec<ConflictRecord>>;

    /// Every pending conflict id in creation order
    fn list_ids(&self) -> Result<Vec<ConflictId>>;

    /// Pending conflicts raised against one contact
    fn list_for_contact(&self, contact: &ContactId) -> Result<Vec<ConflictRecord>>;

    /// Drop every pending conflict raised against one contact
    fn delete_for_contact(&self, contact: &ContactId) -> Result<usize>;

    /// Point a conflict at a different existing contact
    fn repoint(&self, id: &ConflictId, contact: &ContactId) -> Result<()>;

    fn count(&self) -> Result<usize>;
}

/// `SQLite` implementation of `ConflictRepository`
pub struct SqliteConflictRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteConflictRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn select_columns() -> String {
        format!(
            "id, existing_contact_id, source, {}, created_at",
            DETAIL_COLUMNS.join(", ")
        )
    }

    /// Parse a conflict from a database row
    fn parse_conflict(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConflictRecord> {
        Ok(ConflictRecord {
            id: row.get(0)?,
            existing_contact_id: row.get(1)?,
            source: row.get(2)?,
            details: read_details(row, 3)?,
            created_at: row.get(3 + DETAIL_COLUMNS.len())?,
        })
    }

    fn query(
        &self,
        filter: &str,
        tail: &str,
        values: &[&dyn ToSql],
    ) -> Result<Vec<ConflictRecord>> {
        let sql = format!(
            "SELECT {} FROM conflicts {filter} ORDER BY created_at ASC, id ASC {tail}",
            Self::select_columns()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let conflicts = stmt
            .query_map(values, Self::parse_conflict)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(conflicts)
    }
}

impl ConflictRepository for SqliteConflictRepository<'_> {
    fn insert(&self, conflict: &ConflictRecord) -> Result<()> {
        let mut values: Vec<&dyn ToSql> =
            vec![&conflict.id, &conflict.existing_contact_id, &conflict.source];
        values.extend(detail_params(&conflict.details));
        values.push(&conflict.created_at);

        let sql = format!(
            "INSERT INTO conflicts ({}) VALUES ({})",
            Self::select_columns(),
            placeholders(values.len())
        );
        self.conn.execute(&sql, values.as_slice())?;
        Ok(())
    }

    fn get(&self, id: &ConflictId) -> Result<Option<ConflictRecord>> {
        let sql = format!("SELECT {} FROM conflicts WHERE id = ?", Self::select_columns());
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::parse_conflict)
            .optional()?)
    }

    fn delete(&self, id: &ConflictId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM conflicts WHERE id = ?", params![id])?;

        if rows == 0 {
            return Err(Error::NotFound(format!("conflict {id}")));
        }
        Ok(())
    }

    fn list(&self, limit: usize, offset: usize) -> Result<Vec<ConflictRecord>> {
        self.query("", "LIMIT ? OFFSET ?", params![limit as i64, offset as i64])
    }

    fn list_ids(&self) -> Result<Vec<ConflictId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM conflicts ORDER BY created_at ASC, id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn list_for_contact(&self, contact: &ContactId) -> Result<Vec<ConflictRecord>> {
        self.query("WHERE existing_contact_id = ?", "", params![contact])
    }

    fn delete_for_contact(&self, contact: &ContactId) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM conflicts WHERE existing_contact_id = ?",
            params![contact],
        )?;
        Ok(rows)
    }

    fn repoint(&self, id: &ConflictId, contact: &ContactId) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE conflicts SET existing_contact_id = ? WHERE id = ?",
            params![contact, id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(format!("conflict {id}")));
        }
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM conflicts", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
