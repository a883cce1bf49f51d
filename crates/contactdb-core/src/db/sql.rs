//! Column mapping shared by the repositories

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef};
use rusqlite::{Row, ToSql};

use crate::models::{
    ConflictId, ConflictSource, ContactDetails, ContactId, EventId, GroupId, OrganizationId,
    RegistrationId, RegistrationStatus,
};

macro_rules! sql_text {
    ($($ty:ty => $to_text:ident),* $(,)?) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.$to_text().to_string()))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    value
                        .as_str()?
                        .parse()
                        .map_err(|error| FromSqlError::Other(format!("{error}").into()))
                }
            }
        )*
    };
}

sql_text!(
    ContactId => as_str,
    ConflictId => as_str,
    RegistrationId => as_str,
    EventId => as_str,
    OrganizationId => as_str,
    GroupId => as_str,
    ConflictSource => as_str,
    RegistrationStatus => as_str,
);

/// Detail columns, in `ContactDetails` field order
pub const DETAIL_COLUMNS: [&str; 22] = [
    "title",
    "honorific",
    "first_name",
    "last_name",
    "designation",
    "department",
    "affiliation",
    "primary_lang",
    "second_lang",
    "third_lang",
    "notes",
    "address",
    "city",
    "state",
    "country",
    "postal_code",
    "birth_date",
    "organization_id",
    "is_in_mailing_list",
    "is_use_organization_address",
    "focal_point",
    "org_head",
];

/// Bind values matching [`DETAIL_COLUMNS`]
pub fn detail_params(details: &ContactDetails) -> [&dyn ToSql; 22] {
    [
        &details.title,
        &details.honorific,
        &details.first_name,
        &details.last_name,
        &details.designation,
        &details.department,
        &details.affiliation,
        &details.primary_lang,
        &details.second_lang,
        &details.third_lang,
        &details.notes,
        &details.address,
        &details.city,
        &details.state,
        &details.country,
        &details.postal_code,
        &details.birth_date,
        &details.organization_id,
        &details.is_in_mailing_list,
        &details.is_use_organization_address,
        &details.focal_point,
        &details.org_head,
    ]
}

/// Read [`DETAIL_COLUMNS`] starting at column `offset`
pub fn read_details(row: &Row<'_>, offset: usize) -> rusqlite::Result<ContactDetails> {
    Ok(ContactDetails {
        title: row.get(offset)?,
        honorific: row.get(offset + 1)?,
        first_name: row.get(offset + 2)?,
        last_name: row.get(offset + 3)?,
        designation: row.get(offset + 4)?,
        department: row.get(offset + 5)?,
        affiliation: row.get(offset + 6)?,
        primary_lang: row.get(offset + 7)?,
        second_lang: row.get(offset + 8)?,
        third_lang: row.get(offset + 9)?,
        notes: row.get(offset + 10)?,
        address: row.get(offset + 11)?,
        city: row.get(offset + 12)?,
        state: row.get(offset + 13)?,
        country: row.get(offset + 14)?,
        postal_code: row.get(offset + 15)?,
        birth_date: row.get(offset + 16)?,
        organization_id: row.get(offset + 17)?,
        is_in_mailing_list: row.get(offset + 18)?,
        is_use_organization_address: row.get(offset + 19)?,
        focal_point: row.get(offset + 20)?,
        org_head: row.get(offset + 21)?,
    })
}

/// Serialize a list column
pub fn list_to_sql(items: &[String]) -> crate::Result<String> {
    Ok(serde_json::to_string(items)?)
}

/// Deserialize a list column
pub fn read_list(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(error))
    })
}

/// `?, ?, ?` with `count` placeholders
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// `a = ?, b = ?` for an UPDATE statement
pub fn assignments(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether `error` is a UNIQUE/PRIMARY KEY constraint violation
pub fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(1), "?");
    }

    #[test]
    fn test_assignments() {
        assert_eq!(assignments(&["a", "b"]), "a = ?, b = ?");
    }

    #[test]
    fn test_detail_columns_match_params() {
        let details = ContactDetails::default();
        assert_eq!(detail_params(&details).len(), DETAIL_COLUMNS.len());
    }
}
