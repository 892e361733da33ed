use super::Entity;
use crate::core::{FieldMismatch, FieldType, FieldValue, ReferenceSpec, Result};
use crate::facade::Session;
use std::fmt;

/// Maps a Rust field type onto the closed set of field values.
///
/// Implemented for the natively stored types; codec-backed types get an
/// implementation from [`custom_column!`](crate::custom_column) and unit enums
/// from `#[derive(ColumnEnum)]`.
pub trait ColumnValue: Sized {
    fn field_type() -> FieldType;
    fn to_field(&self) -> FieldValue;
    fn from_field(value: FieldValue) -> std::result::Result<Self, FieldMismatch>;
}

macro_rules! integer_column {
    ($($ty:ty => $tag:ident),* $(,)?) => {$(
        impl ColumnValue for $ty {
            fn field_type() -> FieldType {
                FieldType::$tag
            }

            fn to_field(&self) -> FieldValue {
                FieldValue::Integer(*self as i64)
            }

            fn from_field(value: FieldValue) -> std::result::Result<Self, FieldMismatch> {
                match value {
                    FieldValue::Integer(i) => <$ty>::try_from(i).map_err(|_| FieldMismatch {
                        expected: stringify!($ty).to_string(),
                        found: i.to_string(),
                    }),
                    other => Err(other.mismatch(stringify!($ty))),
                }
            }
        }
    )*};
}

integer_column!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
);

impl ColumnValue for bool {
    fn field_type() -> FieldType {
        FieldType::Bool
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::Bool(*self)
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, FieldMismatch> {
        match value {
            FieldValue::Bool(b) => Ok(b),
            FieldValue::Integer(i) => Ok(i != 0),
            other => Err(other.mismatch("bool")),
        }
    }
}

impl ColumnValue for f64 {
    fn field_type() -> FieldType {
        FieldType::F64
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::Real(*self)
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, FieldMismatch> {
        match value {
            FieldValue::Real(f) => Ok(f),
            FieldValue::Integer(i) => Ok(i as f64),
            other => Err(other.mismatch("f64")),
        }
    }
}

impl ColumnValue for f32 {
    fn field_type() -> FieldType {
        FieldType::F32
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::Real(*self as f64)
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, FieldMismatch> {
        match value {
            FieldValue::Real(f) => Ok(f as f32),
            FieldValue::Integer(i) => Ok(i as f32),
            other => Err(other.mismatch("f32")),
        }
    }
}

impl ColumnValue for char {
    fn field_type() -> FieldType {
        FieldType::Char
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::Char(*self)
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, FieldMismatch> {
        match value {
            FieldValue::Char(c) => Ok(c),
            other => Err(other.mismatch("char")),
        }
    }
}

impl ColumnValue for String {
    fn field_type() -> FieldType {
        FieldType::Text
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, FieldMismatch> {
        match value {
            FieldValue::Text(s) => Ok(s),
            other => Err(other.mismatch("String")),
        }
    }
}

impl ColumnValue for Vec<u8> {
    fn field_type() -> FieldType {
        FieldType::Blob
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::Blob(self.clone())
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, FieldMismatch> {
        match value {
            FieldValue::Blob(b) => Ok(b),
            other => Err(other.mismatch("Vec<u8>")),
        }
    }
}

impl<T: ColumnValue> ColumnValue for Option<T> {
    fn field_type() -> FieldType {
        T::field_type()
    }

    fn to_field(&self) -> FieldValue {
        match self {
            Some(value) => value.to_field(),
            None => FieldValue::Null,
        }
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, FieldMismatch> {
        match value {
            FieldValue::Null => Ok(None),
            other => T::from_field(other).map(Some),
        }
    }
}

/// Declares that a type is stored through a registered codec.
///
/// ```ignore
/// #[derive(Clone)]
/// struct Money { cents: i64 }
/// rustmemorm::custom_column!(Money);
/// ```
#[macro_export]
macro_rules! custom_column {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::schema::ColumnValue for $ty {
            fn field_type() -> $crate::core::FieldType {
                $crate::core::FieldType::custom::<$ty>()
            }

            fn to_field(&self) -> $crate::core::FieldValue {
                $crate::core::FieldValue::custom(::std::clone::Clone::clone(self))
            }

            fn from_field(
                value: $crate::core::FieldValue,
            ) -> ::std::result::Result<Self, $crate::core::FieldMismatch> {
                match value {
                    $crate::core::FieldValue::Custom(boxed) => boxed
                        .downcast::<$ty>()
                        .map(|value| *value)
                        .map_err(|_| $crate::core::FieldMismatch {
                            expected: ::std::any::type_name::<$ty>().to_string(),
                            found: "custom value of another type".to_string(),
                        }),
                    other => Err(other.mismatch(::std::any::type_name::<$ty>())),
                }
            }
        }
    )+};
}

crate::custom_column!(chrono::DateTime<chrono::Utc>, chrono::NaiveDate, uuid::Uuid);

/// Primary-key value of an entity. Absent until the first successful insert.
///
/// Two identities are equal only when both are assigned and hold the same
/// value; an absent identity is never equal to anything, itself included.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity(Option<i64>);

impl Identity {
    pub fn new() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Option<i64> {
        self.0
    }

    pub fn is_assigned(&self) -> bool {
        self.0.is_some()
    }

    /// Only the session assigns identities, and only once.
    pub(crate) fn assign(&mut self, id: i64) -> bool {
        match self.0 {
            None => {
                self.0 = Some(id);
                true
            }
            Some(existing) => existing == id,
        }
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        matches!((self.0, other.0), (Some(a), Some(b)) if a == b)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "{}", id),
            None => write!(f, "new"),
        }
    }
}

/// A field referencing another entity, stored as that entity's identity.
///
/// The referenced entity is populated on load when the session's reference
/// depth allows it, or later through [`ForeignKey::load`].
pub struct ForeignKey<T> {
    id: Option<i64>,
    entity: Option<Box<T>>,
}

impl<T: Entity> ForeignKey<T> {
    pub fn none() -> Self {
        Self {
            id: None,
            entity: None,
        }
    }

    pub fn from_id(id: i64) -> Self {
        Self {
            id: Some(id),
            entity: None,
        }
    }

    /// References a persisted entity. An unsaved entity yields a null reference.
    pub fn to(entity: &T) -> Self
    where
        T: Clone,
    {
        Self {
            id: entity.identity().get(),
            entity: Some(Box::new(entity.clone())),
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn get(&self) -> Option<&T> {
        self.entity.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.entity.is_some()
    }

    pub fn into_inner(self) -> Option<T> {
        self.entity.map(|boxed| *boxed)
    }

    /// Loads the referenced entity if it is not loaded yet.
    pub fn load(&mut self, session: &Session) -> Result<Option<&T>> {
        if self.entity.is_none() {
            if let Some(id) = self.id {
                self.entity = session.load::<T>(id)?.map(Box::new);
            }
        }
        Ok(self.entity.as_deref())
    }
}

impl<T: Entity> Default for ForeignKey<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T: Clone> Clone for ForeignKey<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            entity: self.entity.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ForeignKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignKey")
            .field("id", &self.id)
            .field("entity", &self.entity)
            .finish()
    }
}

impl<T> PartialEq for ForeignKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: Entity> ColumnValue for ForeignKey<T> {
    fn field_type() -> FieldType {
        FieldType::Reference(ReferenceSpec::of::<T>())
    }

    fn to_field(&self) -> FieldValue {
        match self.id {
            Some(id) => FieldValue::Reference { id, entity: None },
            None => FieldValue::Null,
        }
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, FieldMismatch> {
        match value {
            FieldValue::Null => Ok(Self::none()),
            FieldValue::Integer(id) => Ok(Self::from_id(id)),
            FieldValue::Reference { id, entity } => Ok(Self {
                id: Some(id),
                entity: entity.and_then(|boxed| boxed.downcast::<T>().ok()),
            }),
            other => Err(other.mismatch(std::any::type_name::<T>())),
        }
    }
}
