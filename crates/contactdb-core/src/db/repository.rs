//! Contact repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET

use rusqlite::{params, Connection, OptionalExtension, ToSql};

use super::sql::{
    assignments, detail_params, list_to_sql, placeholders, read_details, read_list,
    DETAIL_COLUMNS,
};
use crate::error::{Error, Result};
use crate::models::{Contact, ContactId, GroupId};

/// Trait for contact storage operations
pub trait ContactRepository {
    /// Insert a new contact after validating it
    fn insert(&self, contact: &Contact) -> Result<()>;

    /// Get a contact by ID
    fn get(&self, id: &ContactId) -> Result<Option<Contact>>;

    /// Validate and write every column of `contact`, bumping `updated_at`
    fn update(&self, contact: &mut Contact) -> Result<()>;

    /// Hard delete a contact; owned rows cascade
    fn delete(&self, id: &ContactId) -> Result<()>;

    /// List contacts, oldest first
    fn list(&self, limit: usize, offset: usize) -> Result<Vec<Contact>>;

    /// Oldest contact carrying `external_id`
    fn find_by_external_id(&self, external_id: &str) -> Result<Option<Contact>>;

    /// Number of stored contacts
    fn count(&self) -> Result<usize>;

    /// Add a contact to a group (no-op when already a member)
    fn add_to_group(&self, contact: &ContactId, group: &GroupId) -> Result<()>;

    /// Groups a contact belongs to
    fn list_group_ids(&self, contact: &ContactId) -> Result<Vec<GroupId>>;

    /// Give `to` every group membership `from` has; returns new memberships
    fn copy_group_memberships(&self, from: &ContactId, to: &ContactId) -> Result<usize>;
}

/// `SQLite` implementation of `ContactRepository`
pub struct SqliteContactRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteContactRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn select_columns() -> String {
        format!(
            "id, {}, emails, email_ccs, phones, mobiles, faxes, external_ids, created_at, updated_at",
            DETAIL_COLUMNS.join(", ")
        )
    }

    /// Parse a contact from a database row
    fn parse_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
        let offset = 1 + DETAIL_COLUMNS.len();
        Ok(Contact {
            id: row.get(0)?,
            details: read_details(row, 1)?,
            emails: read_list(row, offset)?,
            email_ccs: read_list(row, offset + 1)?,
            phones: read_list(row, offset + 2)?,
            mobiles: read_list(row, offset + 3)?,
            faxes: read_list(row, offset + 4)?,
            external_ids: read_list(row, offset + 5)?,
            created_at: row.get(offset + 6)?,
            updated_at: row.get(offset + 7)?,
        })
    }

    fn list_columns(contact: &Contact) -> Result<[String; 6]> {
        Ok([
            list_to_sql(&contact.emails)?,
            list_to_sql(&contact.email_ccs)?,
            list_to_sql(&contact.phones)?,
            list_to_sql(&contact.mobiles)?,
            list_to_sql(&contact.faxes)?,
            list_to_sql(&contact.external_ids)?,
        ])
    }
}

impl ContactRepository for SqliteContactRepository<'_> {
    fn insert(&self, contact: &Contact) -> Result<()> {
        contact.validate()?;

        let lists = Self::list_columns(contact)?;
        let mut values: Vec<&dyn ToSql> = vec![&contact.id];
        values.extend(detail_params(&contact.details));
        values.extend(lists.iter().map(|list| list as &dyn ToSql));
        values.push(&contact.created_at);
        values.push(&contact.updated_at);

        let sql = format!(
            "INSERT INTO contacts ({}) VALUES ({})",
            Self::select_columns(),
            placeholders(values.len())
        );
        self.conn.execute(&sql, values.as_slice())?;
        Ok(())
    }

    fn get(&self, id: &ContactId) -> Result<Option<Contact>> {
        let sql = format!("SELECT {} FROM contacts WHERE id = ?", Self::select_columns());
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::parse_contact)
            .optional()?)
    }

    fn update(&self, contact: &mut Contact) -> Result<()> {
        contact.validate()?;
        contact.updated_at = crate::util::now_millis().max(contact.updated_at);

        let lists = Self::list_columns(contact)?;
        let mut columns: Vec<&str> = DETAIL_COLUMNS.to_vec();
        columns.extend([
            "emails",
            "email_ccs",
            "phones",
            "mobiles",
            "faxes",
            "external_ids",
            "updated_at",
        ]);

        let mut values: Vec<&dyn ToSql> = detail_params(&contact.details).to_vec();
        values.extend(lists.iter().map(|list| list as &dyn ToSql));
        values.push(&contact.updated_at);
        values.push(&contact.id);

        let sql = format!("UPDATE contacts SET {} WHERE id = ?", assignments(&columns));
        let rows = self.conn.execute(&sql, values.as_slice())?;

        if rows == 0 {
            return Err(Error::NotFound(format!("contact {}", contact.id)));
        }
        Ok(())
    }

    fn delete(&self, id: &ContactId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM contacts WHERE id = ?", params![id])?;

        if rows == 0 {
            return Err(Error::NotFound(format!("contact {id}")));
        }
        Ok(())
    }

    fn list(&self, limit: usize, offset: usize) -> Result<Vec<Contact>> {
        let sql = format!(
            "SELECT {} FROM contacts ORDER BY created_at ASC, id ASC LIMIT ? OFFSET ?",
            Self::select_columns()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let contacts = stmt
            .query_map(params![limit as i64, offset as i64], Self::parse_contact)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(contacts)
    }

    fn find_by_external_id(&self, external_id: &str) -> Result<Option<Contact>> {
        let sql = format!(
            "SELECT {} FROM contacts
             WHERE EXISTS (SELECT 1 FROM json_each(contacts.external_ids) WHERE value = ?)
             ORDER BY created_at ASC, id ASC
             LIMIT 1",
            Self::select_columns()
        );
        Ok(self
            .conn
            .query_row(&sql, params![external_id], Self::parse_contact)
            .optional()?)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM contacts", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn add_to_group(&self, contact: &ContactId, group: &GroupId) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO group_memberships (contact_id, group_id) VALUES (?, ?)",
            params![contact, group],
        )?;
        Ok(())
    }

    fn list_group_ids(&self, contact: &ContactId) -> Result<Vec<GroupId>> {
        let mut stmt = self.conn.prepare(
            "SELECT group_id FROM group_memberships WHERE contact_id = ? ORDER BY group_id",
        )?;
        let groups = stmt
            .query_map(params![contact], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(groups)
    }

    fn copy_group_memberships(&self, from: &ContactId, to: &ContactId) -> Result<usize> {
        let rows = self.conn.execute(
            "INSERT OR IGNORE INTO group_memberships (contact_id, group_id)
             SELECT ?1, group_id FROM group_memberships WHERE contact_id = ?2",
            params![to, from],
        )?;
        Ok(rows)
    }
}
