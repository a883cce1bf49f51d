//! Field classification

use super::{Cardinality, EntitySchema, FieldDescriptor, FieldType};
use crate::error::{Error, Result};

/// Semantic kind of a field, deciding how a merge treats it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Ignored,
    /// Many-to-many link; merged by union
    Relation,
    /// Children scoped to the parent; re-pointed on merge
    OwnedRelation,
    Boolean,
    /// List of scalars with set semantics
    Array,
    Scalar,
}

/// A descriptor paired with its kind
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedField<'a> {
    pub descriptor: &'a FieldDescriptor,
    pub kind: FieldKind,
}

/// Classify one field of `schema`.
///
/// Any type/cardinality combination without a merge rule is an error, so a
/// new column can never be silently skipped by the merge.
pub fn classify(schema: &EntitySchema, field: &FieldDescriptor) -> Result<FieldKind> {
    if schema.ignored.contains(&field.name) {
        return Ok(FieldKind::Ignored);
    }

    let kind = match (field.field_type, field.cardinality) {
        (FieldType::Relation, Cardinality::Many) if field.owned => FieldKind::OwnedRelation,
        (FieldType::Relation, Cardinality::Many) => FieldKind::Relation,
        (FieldType::Boolean, Cardinality::One) => FieldKind::Boolean,
        (FieldType::Text, Cardinality::Many) => FieldKind::Array,
        (FieldType::Text | FieldType::Date | FieldType::Reference, Cardinality::One) => {
            FieldKind::Scalar
        }
        (field_type, cardinality) => {
            return Err(Error::Schema(format!(
                "unexpected field type {field_type:?} ({cardinality:?}) for {}.{}",
                schema.entity, field.name
            )));
        }
    };
    Ok(kind)
}

/// Classify every field of `schema`, in table order
pub fn classify_schema(schema: &EntitySchema) -> Result<Vec<ClassifiedField<'_>>> {
    schema
        .fields
        .iter()
        .map(|descriptor| {
            Ok(ClassifiedField {
                descriptor,
                kind: classify(schema, descriptor)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldAccess, CONTACT_SCHEMA};

    fn kind_of(name: &str) -> FieldKind {
        classify_schema(&CONTACT_SCHEMA)
            .unwrap()
            .into_iter()
            .find(|field| field.descriptor.name == name)
            .map(|field| field.kind)
            .unwrap()
    }

    #[test]
    fn test_contact_schema_classifies_cleanly() {
        let fields = classify_schema(&CONTACT_SCHEMA).unwrap();
        assert_eq!(fields.len(), CONTACT_SCHEMA.fields.len());
    }

    #[test]
    fn test_contact_field_kinds() {
        assert_eq!(kind_of("id"), FieldKind::Ignored);
        assert_eq!(kind_of("updated_at"), FieldKind::Ignored);
        assert_eq!(kind_of("department"), FieldKind::Scalar);
        assert_eq!(kind_of("birth_date"), FieldKind::Scalar);
        assert_eq!(kind_of("organization_id"), FieldKind::Scalar);
        assert_eq!(kind_of("org_head"), FieldKind::Boolean);
        assert_eq!(kind_of("emails"), FieldKind::Array);
        assert_eq!(kind_of("external_ids"), FieldKind::Array);
        assert_eq!(kind_of("registrations"), FieldKind::OwnedRelation);
        assert_eq!(kind_of("pending_conflicts"), FieldKind::OwnedRelation);
        assert_eq!(kind_of("groups"), FieldKind::Relation);
    }

    #[test]
    fn test_unknown_field_type_is_an_error() {
        static BROKEN: EntitySchema = EntitySchema {
            entity: "contact",
            fields: &[FieldDescriptor {
                name: "photo",
                field_type: FieldType::Blob,
                cardinality: Cardinality::One,
                owned: false,
                access: FieldAccess::Opaque,
            }],
            ignored: &[],
        };
        let error = classify_schema(&BROKEN).unwrap_err();
        assert!(matches!(error, Error::Schema(ref message) if message.contains("contact.photo")));
    }

    #[test]
    fn test_unignored_identity_column_is_an_error() {
        static LEAKY: EntitySchema = EntitySchema {
            entity: "contact",
            fields: &[FieldDescriptor {
                name: "id",
                field_type: FieldType::Id,
                cardinality: Cardinality::One,
                owned: false,
                access: FieldAccess::Opaque,
            }],
            ignored: &[],
        };
        assert!(classify_schema(&LEAKY).is_err());
    }

    #[test]
    fn test_boolean_list_is_an_error() {
        let field = FieldDescriptor {
            name: "flags",
            field_type: FieldType::Boolean,
            cardinality: Cardinality::Many,
            owned: false,
            access: FieldAccess::Opaque,
        };
        assert!(classify(&CONTACT_SCHEMA, &field).is_err());
    }
}
