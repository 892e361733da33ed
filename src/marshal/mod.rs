//! Conversion between entity field values and storage rows.
//!
//! Both directions are pure functions of the entity (or row) and its table
//! descriptor. Per-field failures are collected next to the result instead of
//! aborting the record.

use crate::core::{FieldType, FieldValue, MarshalError, ReferenceSpec, Result, SqlValue};
use crate::schema::{Entity, FieldDescriptor, TableDescriptor};
use crate::storage::Row;
use log::warn;
use std::any::Any;
use std::collections::HashMap;

/// A marshalled value plus the per-field errors that were skipped over.
#[derive(Debug)]
pub struct Marshalled<T> {
    pub value: T,
    pub errors: Vec<MarshalError>,
}

impl<T> Marshalled<T> {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Logs every collected error and returns the value.
    pub fn into_logged(self) -> T {
        for error in &self.errors {
            warn!("{}", error);
        }
        self.value
    }
}

/// Column/value pairs in descriptor field order.
pub type RowValues<'d> = Vec<(&'d str, SqlValue)>;

/// Supplies referenced entities while decoding foreign-key columns.
pub trait ReferenceResolver {
    fn resolve(&mut self, target: &ReferenceSpec, id: i64) -> Result<Option<Box<dyn Any + Send>>>;
}

/// Leaves every reference unloaded.
pub struct NoReferences;

impl ReferenceResolver for NoReferences {
    fn resolve(&mut self, _target: &ReferenceSpec, _id: i64) -> Result<Option<Box<dyn Any + Send>>> {
        Ok(None)
    }
}

/// Entity to row. Fields that fail to encode are left out of the row.
pub fn to_row<'d, T: Entity>(entity: &T, descriptor: &'d TableDescriptor) -> Marshalled<RowValues<'d>> {
    let mut supplied: HashMap<&'static str, FieldValue> = entity.field_values().into_iter().collect();
    let mut values = Vec::with_capacity(descriptor.fields().len());
    let mut errors = Vec::new();

    for field in descriptor.fields() {
        let Some(value) = supplied.remove(field.column_name()) else {
            errors.push(MarshalError::Encode {
                table: descriptor.table_name().to_string(),
                column: field.column_name().to_string(),
                reason: "entity supplied no value".to_string(),
            });
            continue;
        };

        match encode_field(descriptor, field, value) {
            Ok(encoded) => values.push((field.column_name(), encoded)),
            Err(error) => errors.push(error),
        }
    }

    let mut unknown: Vec<_> = supplied.into_keys().collect();
    unknown.sort_unstable();
    for column in unknown {
        errors.push(MarshalError::UnknownColumn {
            table: descriptor.table_name().to_string(),
            column: column.to_string(),
        });
    }

    Marshalled { value: values, errors }
}

/// Row to entity, leaving references unloaded.
pub fn from_row<T: Entity>(row: &Row, descriptor: &TableDescriptor) -> Result<Marshalled<T>> {
    from_row_with(row, descriptor, &mut NoReferences)
}

/// Row to entity. Only resolver failures are returned as `Err`; decode
/// failures are collected and the field keeps its default.
pub fn from_row_with<T: Entity, R: ReferenceResolver>(
    row: &Row,
    descriptor: &TableDescriptor,
    resolver: &mut R,
) -> Result<Marshalled<T>> {
    let mut entity = T::default();
    let mut errors = Vec::new();

    if let Some(id) = row
        .get_by_name(descriptor.id_column())
        .and_then(SqlValue::as_i64)
    {
        entity.identity_mut().assign(id);
    }

    for field in descriptor.fields() {
        let Some(raw) = row.get_by_name(field.column_name()) else {
            continue;
        };
        if raw.is_null() {
            continue;
        }

        let mut value = match decode_field(descriptor, field, raw.clone()) {
            Ok(value) => value,
            Err(error) => {
                errors.push(error);
                continue;
            }
        };

        if let (FieldType::Reference(target), FieldValue::Reference { id, entity: loaded }) =
            (field.field_type(), &mut value)
        {
            *loaded = resolver.resolve(&target, *id)?;
        }

        match entity.set_field(field.column_name(), value) {
            Ok(true) => {}
            Ok(false) => errors.push(MarshalError::UnknownColumn {
                table: descriptor.table_name().to_string(),
                column: field.column_name().to_string(),
            }),
            Err(mismatch) => errors.push(MarshalError::Decode {
                table: descriptor.table_name().to_string(),
                column: field.column_name().to_string(),
                expected: mismatch.expected,
                found: mismatch.found,
            }),
        }
    }

    Ok(Marshalled {
        value: entity,
        errors,
    })
}

/// Maps one in-memory value onto exactly one storage kind.
pub fn encode_field(
    descriptor: &TableDescriptor,
    field: &FieldDescriptor,
    value: FieldValue,
) -> std::result::Result<SqlValue, MarshalError> {
    if let Some(codec) = field.codec() {
        return match value {
            FieldValue::Null => Ok(SqlValue::Null),
            FieldValue::Custom(boxed) => {
                let encoded = codec.serialize_any(&*boxed).map_err(|err| MarshalError::Codec {
                    table: descriptor.table_name().to_string(),
                    column: field.column_name().to_string(),
                    message: err.message,
                })?;
                if !encoded.is_null() && encoded.kind() != codec.storage_kind() {
                    warn!(
                        "{}.{}: codec for {} declared {} but produced {}",
                        descriptor.table_name(),
                        field.column_name(),
                        codec.value_type_name(),
                        codec.storage_kind(),
                        encoded.kind()
                    );
                }
                Ok(encoded)
            }
            other => Err(encode_error(
                descriptor,
                field,
                format!("codec-backed field received a {} value", other.kind_name()),
            )),
        };
    }

    Ok(match value {
        FieldValue::Null => SqlValue::Null,
        FieldValue::Bool(b) => SqlValue::Integer(b as i64),
        FieldValue::Integer(i) => SqlValue::Integer(i),
        FieldValue::Real(f) => SqlValue::Real(f),
        FieldValue::Char(c) => SqlValue::Text(c.to_string()),
        FieldValue::Text(s) => SqlValue::Text(s),
        FieldValue::Blob(b) => SqlValue::Blob(b),
        FieldValue::Enum(name) => SqlValue::Text(name),
        FieldValue::Reference { id, .. } => SqlValue::Integer(id),
        FieldValue::Custom(_) => {
            return Err(encode_error(
                descriptor,
                field,
                format!("no codec registered for {}", field.field_type().type_name()),
            ));
        }
    })
}

/// Decodes a non-null storage value by the field's declared type.
pub fn decode_field(
    descriptor: &TableDescriptor,
    field: &FieldDescriptor,
    value: SqlValue,
) -> std::result::Result<FieldValue, MarshalError> {
    if let Some(codec) = field.codec() {
        return codec
            .deserialize_any(value)
            .map(FieldValue::Custom)
            .map_err(|err| MarshalError::Codec {
                table: descriptor.table_name().to_string(),
                column: field.column_name().to_string(),
                message: err.message,
            });
    }

    let field_type = field.field_type();
    let mismatch = |value: &SqlValue| MarshalError::Decode {
        table: descriptor.table_name().to_string(),
        column: field.column_name().to_string(),
        expected: field_type.type_name().to_string(),
        found: value.type_name().to_string(),
    };

    match field_type {
        FieldType::Bool => value
            .as_i64()
            .map(|i| FieldValue::Bool(i != 0))
            .ok_or_else(|| mismatch(&value)),
        FieldType::I8
        | FieldType::I16
        | FieldType::I32
        | FieldType::I64
        | FieldType::U8
        | FieldType::U16
        | FieldType::U32 => {
            let i = value.as_i64().ok_or_else(|| mismatch(&value))?;
            match field_type.integer_range() {
                Some((min, max)) if i < min || i > max => Err(MarshalError::Decode {
                    table: descriptor.table_name().to_string(),
                    column: field.column_name().to_string(),
                    expected: field_type.type_name().to_string(),
                    found: format!("out-of-range integer {}", i),
                }),
                _ => Ok(FieldValue::Integer(i)),
            }
        }
        FieldType::F32 | FieldType::F64 => value
            .as_f64()
            .map(FieldValue::Real)
            .ok_or_else(|| mismatch(&value)),
        FieldType::Char => value
            .as_str()
            .and_then(|s| s.chars().next())
            .map(FieldValue::Char)
            .ok_or_else(|| mismatch(&value)),
        FieldType::Text => match value {
            SqlValue::Text(s) => Ok(FieldValue::Text(s)),
            other => Err(mismatch(&other)),
        },
        FieldType::Blob => match value {
            SqlValue::Blob(b) => Ok(FieldValue::Blob(b)),
            SqlValue::Text(s) => Ok(FieldValue::Blob(s.into_bytes())),
            other => Err(mismatch(&other)),
        },
        FieldType::Enum { .. } => match value {
            SqlValue::Text(s) => Ok(FieldValue::Enum(s)),
            other => Err(mismatch(&other)),
        },
        FieldType::Reference(_) => value
            .as_i64()
            .map(|id| FieldValue::Reference { id, entity: None })
            .ok_or_else(|| mismatch(&value)),
        FieldType::Custom { type_name, .. } => Err(MarshalError::Codec {
            table: descriptor.table_name().to_string(),
            column: field.column_name().to_string(),
            message: format!("no codec registered for {}", type_name),
        }),
    }
}

fn encode_error(descriptor: &TableDescriptor, field: &FieldDescriptor, reason: String) -> MarshalError {
    MarshalError::Encode {
        table: descriptor.table_name().to_string(),
        column: field.column_name().to_string(),
        reason,
    }
}
