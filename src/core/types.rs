use super::{Result, StorageKind};
use crate::facade::{LoadContext, Session};
use crate::schema::{Entity, EntityDecl};
use std::any::{Any, TypeId};
use std::fmt;
use thiserror::Error;

pub(crate) type ReferenceLoader =
    fn(&Session, i64, &mut LoadContext) -> Result<Option<Box<dyn Any + Send>>>;

/// Target of a foreign-key field: the referenced entity type, erased.
#[derive(Clone, Copy)]
pub struct ReferenceSpec {
    type_name: &'static str,
    type_id: fn() -> TypeId,
    pub(crate) declare: fn() -> EntityDecl,
    pub(crate) load: ReferenceLoader,
}

impl ReferenceSpec {
    pub fn of<T: Entity>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>,
            declare: T::declaration,
            load: crate::facade::load_reference::<T>,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }
}

impl fmt::Debug for ReferenceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceSpec")
            .field("type_name", &self.type_name)
            .finish()
    }
}

impl PartialEq for ReferenceSpec {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

/// In-memory type tag of a declared field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    F32,
    F64,
    Char,
    Text,
    Blob,
    /// Unit enum stored as its variant name.
    Enum { type_name: &'static str },
    /// Another entity, stored as its identity.
    Reference(ReferenceSpec),
    /// A type with no native mapping; needs a registered codec.
    Custom {
        type_id: TypeId,
        type_name: &'static str,
    },
}

impl FieldType {
    pub fn custom<T: Any>() -> Self {
        Self::Custom {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Storage kind for natively mapped types. `None` for custom types,
    /// whose kind is declared by their codec.
    pub fn native_kind(&self) -> Option<StorageKind> {
        match self {
            Self::Bool
            | Self::I8
            | Self::I16
            | Self::I32
            | Self::I64
            | Self::U8
            | Self::U16
            | Self::U32
            | Self::Reference(_) => Some(StorageKind::Integer),
            Self::F32 | Self::F64 => Some(StorageKind::Real),
            Self::Char | Self::Text | Self::Enum { .. } => Some(StorageKind::Text),
            Self::Blob => Some(StorageKind::Blob),
            Self::Custom { .. } => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
            Self::Text => "String",
            Self::Blob => "Vec<u8>",
            Self::Enum { type_name } => type_name,
            Self::Reference(spec) => spec.type_name(),
            Self::Custom { type_name, .. } => type_name,
        }
    }

    /// Integer range accepted when decoding into this type.
    pub(crate) fn integer_range(&self) -> Option<(i64, i64)> {
        match self {
            Self::I8 => Some((i8::MIN as i64, i8::MAX as i64)),
            Self::I16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::I32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::I64 => Some((i64::MIN, i64::MAX)),
            Self::U8 => Some((0, u8::MAX as i64)),
            Self::U16 => Some((0, u16::MAX as i64)),
            Self::U32 => Some((0, u32::MAX as i64)),
            _ => None,
        }
    }
}

/// An in-memory field value, erased to the closed set the marshaller handles.
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Char(char),
    Text(String),
    Blob(Vec<u8>),
    Enum(String),
    Reference {
        id: i64,
        entity: Option<Box<dyn Any + Send>>,
    },
    Custom(Box<dyn Any + Send>),
}

impl FieldValue {
    pub fn custom<T: Any + Send>(value: T) -> Self {
        Self::Custom(Box::new(value))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Char(_) => "char",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::Enum(_) => "enum",
            Self::Reference { .. } => "reference",
            Self::Custom(_) => "custom",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn mismatch(&self, expected: impl Into<String>) -> FieldMismatch {
        FieldMismatch {
            expected: expected.into(),
            found: self.kind_name().to_string(),
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => write!(f, "Bool({})", b),
            Self::Integer(i) => write!(f, "Integer({})", i),
            Self::Real(r) => write!(f, "Real({})", r),
            Self::Char(c) => write!(f, "Char({:?})", c),
            Self::Text(s) => write!(f, "Text({:?})", s),
            Self::Blob(b) => write!(f, "Blob({} bytes)", b.len()),
            Self::Enum(name) => write!(f, "Enum({})", name),
            Self::Reference { id, entity } => f
                .debug_struct("Reference")
                .field("id", id)
                .field("loaded", &entity.is_some())
                .finish(),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// A field value did not have the shape its Rust type requires.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected}, found {found}")]
pub struct FieldMismatch {
    pub expected: String,
    pub found: String,
}
