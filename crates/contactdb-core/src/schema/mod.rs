//! Compile-time field descriptors for the contact entity
//!
//! The merge engine, the import reconciler and the conflict resolution
//! service never touch contact fields by name at runtime. They walk
//! [`CONTACT_SCHEMA`], classify each descriptor with
//! [`classifier::classify`], and read or write values through the accessor
//! functions stored in the descriptor.

mod classifier;

use chrono::NaiveDate;
use std::fmt;

use crate::error::{Error, Result};
use crate::models::{Contact, ContactDetails, OrganizationId};

pub use classifier::{classify, classify_schema, ClassifiedField, FieldKind};

/// Storage type tag of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Primary key
    Id,
    /// Bookkeeping timestamp
    Timestamp,
    Text,
    Date,
    /// Foreign key to another entity
    Reference,
    Boolean,
    /// Rows of another table pointing at this record
    Relation,
    /// Opaque binary payload
    Blob,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Relations of a contact the merge engine knows how to move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Registrations,
    PendingConflicts,
    Groups,
}

impl RelationKind {
    /// Child entity kind for owned relations
    pub const fn child_kind(self) -> Option<ChildKind> {
        match self {
            Self::Registrations => Some(ChildKind::Registration),
            Self::PendingConflicts => Some(ChildKind::Conflict),
            Self::Groups => None,
        }
    }
}

/// Entity types that can be owned children of a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildKind {
    Registration,
    Conflict,
}

/// A single-valued field's value, as seen by the merge engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarValue {
    Text(String),
    Date(Option<NaiveDate>),
    Reference(Option<OrganizationId>),
}

impl ScalarValue {
    /// Empty string (after trimming) or a missing date/reference
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Date(date) => date.is_none(),
            Self::Reference(reference) => reference.is_none(),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text:?}"),
            Self::Date(Some(date)) => write!(f, "{date}"),
            Self::Reference(Some(id)) => write!(f, "{id}"),
            Self::Date(None) | Self::Reference(None) => f.write_str("<empty>"),
        }
    }
}

/// How a field's value is reached on a typed contact
#[derive(Clone, Copy)]
pub enum FieldAccess {
    Scalar {
        get: fn(&ContactDetails) -> ScalarValue,
        set: fn(&mut ContactDetails, ScalarValue) -> Result<()>,
    },
    Flag {
        get: fn(&ContactDetails) -> bool,
        set: fn(&mut ContactDetails, bool),
    },
    List {
        items: fn(&mut Contact) -> &mut Vec<String>,
    },
    Relation(RelationKind),
    /// Identity and bookkeeping columns managed by the store
    Opaque,
}

impl fmt::Debug for FieldAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar { .. } => f.write_str("Scalar"),
            Self::Flag { .. } => f.write_str("Flag"),
            Self::List { .. } => f.write_str("List"),
            Self::Relation(kind) => f.debug_tuple("Relation").field(kind).finish(),
            Self::Opaque => f.write_str("Opaque"),
        }
    }
}

/// One entry of an entity's field table
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub field_type: FieldType,
    pub cardinality: Cardinality,
    /// Child rows whose uniqueness is scoped to the parent
    pub owned: bool,
    pub access: FieldAccess,
}

/// Field table plus the names the merge must never touch
#[derive(Debug)]
pub struct EntitySchema {
    pub entity: &'static str,
    pub fields: &'static [FieldDescriptor],
    pub ignored: &'static [&'static str],
}

fn mismatch(field: &str, value: &ScalarValue) -> Error {
    Error::Schema(format!("field {field} cannot hold value {value:?}"))
}

macro_rules! text_field {
    ($field:ident) => {
        FieldDescriptor {
            name: stringify!($field),
            field_type: FieldType::Text,
            cardinality: Cardinality::One,
            owned: false,
            access: FieldAccess::Scalar {
                get: {
                    fn get(details: &ContactDetails) -> ScalarValue {
                        ScalarValue::Text(details.$field.clone())
                    }
                    get
                },
                set: {
                    fn set(details: &mut ContactDetails, value: ScalarValue) -> Result<()> {
                        match value {
                            ScalarValue::Text(text) => {
                                details.$field = text;
                                Ok(())
                            }
                            other => Err(mismatch(stringify!($field), &other)),
                        }
                    }
                    set
                },
            },
        }
    };
}

macro_rules! flag_field {
    ($field:ident) => {
        FieldDescriptor {
            name: stringify!($field),
            field_type: FieldType::Boolean,
            cardinality: Cardinality::One,
            owned: false,
            access: FieldAccess::Flag {
                get: {
                    fn get(details: &ContactDetails) -> bool {
                        details.$field
                    }
                    get
                },
                set: {
                    fn set(details: &mut ContactDetails, value: bool) {
                        details.$field = value;
                    }
                    set
                },
            },
        }
    };
}

macro_rules! list_field {
    ($field:ident) => {
        FieldDescriptor {
            name: stringify!($field),
            field_type: FieldType::Text,
            cardinality: Cardinality::Many,
            owned: false,
            access: FieldAccess::List {
                items: {
                    fn items(contact: &mut Contact) -> &mut Vec<String> {
                        &mut contact.$field
                    }
                    items
                },
            },
        }
    };
}

macro_rules! opaque_field {
    ($name:literal, $field_type:expr) => {
        FieldDescriptor {
            name: $name,
            field_type: $field_type,
            cardinality: Cardinality::One,
            owned: false,
            access: FieldAccess::Opaque,
        }
    };
}

macro_rules! relation_field {
    ($name:literal, $kind:expr, owned: $owned:literal) => {
        FieldDescriptor {
            name: $name,
            field_type: FieldType::Relation,
            cardinality: Cardinality::Many,
            owned: $owned,
            access: FieldAccess::Relation($kind),
        }
    };
}

const BIRTH_DATE: FieldDescriptor = FieldDescriptor {
    name: "birth_date",
    field_type: FieldType::Date,
    cardinality: Cardinality::One,
    owned: false,
    access: FieldAccess::Scalar {
        get: |details| ScalarValue::Date(details.birth_date),
        set: |details, value| match value {
            ScalarValue::Date(date) => {
                details.birth_date = date;
                Ok(())
            }
            other => Err(mismatch("birth_date", &other)),
        },
    },
};

const ORGANIZATION: FieldDescriptor = FieldDescriptor {
    name: "organization_id",
    field_type: FieldType::Reference,
    cardinality: Cardinality::One,
    owned: false,
    access: FieldAccess::Scalar {
        get: |details| ScalarValue::Reference(details.organization_id),
        set: |details, value| match value {
            ScalarValue::Reference(reference) => {
                details.organization_id = reference;
                Ok(())
            }
            other => Err(mismatch("organization_id", &other)),
        },
    },
};

/// Field table of [`Contact`]
pub static CONTACT_SCHEMA: EntitySchema = EntitySchema {
    entity: "contact",
    fields: &[
        opaque_field!("id", FieldType::Id),
        text_field!(title),
        text_field!(honorific),
        text_field!(first_name),
        text_field!(last_name),
        text_field!(designation),
        text_field!(department),
        text_field!(affiliation),
        text_field!(primary_lang),
        text_field!(second_lang),
        text_field!(third_lang),
        text_field!(notes),
        text_field!(address),
        text_field!(city),
        text_field!(state),
        text_field!(country),
        text_field!(postal_code),
        BIRTH_DATE,
        ORGANIZATION,
        flag_field!(is_in_mailing_list),
        flag_field!(is_use_organization_address),
        flag_field!(focal_point),
        flag_field!(org_head),
        list_field!(emails),
        list_field!(email_ccs),
        list_field!(phones),
        list_field!(mobiles),
        list_field!(faxes),
        list_field!(external_ids),
        relation_field!("registrations", RelationKind::Registrations, owned: true),
        relation_field!("pending_conflicts", RelationKind::PendingConflicts, owned: true),
        relation_field!("groups", RelationKind::Groups, owned: false),
        opaque_field!("created_at", FieldType::Timestamp),
        opaque_field!("updated_at", FieldType::Timestamp),
    ],
    ignored: &["id", "created_at", "updated_at"],
};

/// Copy every scalar and boolean field from `from` onto `to`.
///
/// Returns the names of the fields whose value changed.
pub fn copy_details(
    schema: &EntitySchema,
    from: &ContactDetails,
    to: &mut ContactDetails,
) -> Result<Vec<&'static str>> {
    let mut changed = Vec::new();
    for field in classify_schema(schema)? {
        match (field.kind, field.descriptor.access) {
            (FieldKind::Scalar, FieldAccess::Scalar { get, set }) => {
                let value = get(from);
                if get(to) != value {
                    set(to, value)?;
                    changed.push(field.descriptor.name);
                }
            }
            (FieldKind::Boolean, FieldAccess::Flag { get, set }) => {
                let value = get(from);
                if get(to) != value {
                    set(to, value);
                    changed.push(field.descriptor.name);
                }
            }
            _ => {}
        }
    }
    Ok(changed)
}

/// Names of the lists where `incoming` holds an item `existing` lacks
pub fn lists_with_new_items(
    schema: &EntitySchema,
    existing: &mut Contact,
    incoming: &mut Contact,
) -> Result<Vec<&'static str>> {
    let mut grown = Vec::new();
    for field in classify_schema(schema)? {
        if let (FieldKind::Array, FieldAccess::List { items }) =
            (field.kind, field.descriptor.access)
        {
            let known = items(existing);
            if items(incoming).iter().any(|item| !known.contains(item)) {
                grown.push(field.descriptor.name);
            }
        }
    }
    Ok(grown)
}

/// Names of scalar and boolean fields that differ between `a` and `b`
pub fn differing_details(
    schema: &EntitySchema,
    a: &ContactDetails,
    b: &ContactDetails,
) -> Result<Vec<&'static str>> {
    let mut differing = Vec::new();
    for field in classify_schema(schema)? {
        let differs = match (field.kind, field.descriptor.access) {
            (FieldKind::Scalar, FieldAccess::Scalar { get, .. }) => get(a) != get(b),
            (FieldKind::Boolean, FieldAccess::Flag { get, .. }) => get(a) != get(b),
            _ => false,
        };
        if differs {
            differing.push(field.descriptor.name);
        }
    }
    Ok(differing)
}
