//! Pluggable converters for in-memory types with no native column mapping.
//!
//! A codec is registered once per Rust type, before any table descriptor that
//! uses the type is derived. Registering afterwards is rejected: descriptors
//! already cached would otherwise disagree with the new codec.

mod builtin;

pub use builtin::{DateTimeCodec, JsonCodec, NaiveDateCodec, UuidCodec};

use crate::core::{OrmError, Result, SchemaError, SqlValue, StorageKind};
use log::{debug, warn};
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CodecError {
    pub message: String,
}

impl CodecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn unexpected(expected: StorageKind, found: &SqlValue) -> Self {
        Self::new(format!("expected {}, got {}", expected, found.type_name()))
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Typed bidirectional converter between `Value` and a storage value.
pub trait Codec: Send + Sync + 'static {
    type Value: Any + Send;

    /// Storage kind this codec promises to produce.
    fn serialized_kind(&self) -> StorageKind;

    fn serialize(&self, value: &Self::Value) -> std::result::Result<SqlValue, CodecError>;

    fn deserialize(&self, value: SqlValue) -> std::result::Result<Self::Value, CodecError>;

    /// Lossy codecs do not round-trip exactly (e.g. sub-millisecond precision).
    fn is_lossy(&self) -> bool {
        false
    }
}

/// Type-erased codec as stored in the registry and on field descriptors.
pub trait TypeCodec: Send + Sync {
    fn value_type_name(&self) -> &'static str;
    fn storage_kind(&self) -> StorageKind;
    fn lossy(&self) -> bool;
    fn serialize_any(&self, value: &dyn Any) -> std::result::Result<SqlValue, CodecError>;
    fn deserialize_any(
        &self,
        value: SqlValue,
    ) -> std::result::Result<Box<dyn Any + Send>, CodecError>;
}

impl<C: Codec> TypeCodec for C {
    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<C::Value>()
    }

    fn storage_kind(&self) -> StorageKind {
        self.serialized_kind()
    }

    fn lossy(&self) -> bool {
        self.is_lossy()
    }

    fn serialize_any(&self, value: &dyn Any) -> std::result::Result<SqlValue, CodecError> {
        let value = value.downcast_ref::<C::Value>().ok_or_else(|| {
            CodecError::new(format!(
                "codec for {} received a value of another type",
                self.value_type_name()
            ))
        })?;
        self.serialize(value)
    }

    fn deserialize_any(
        &self,
        value: SqlValue,
    ) -> std::result::Result<Box<dyn Any + Send>, CodecError> {
        let value = self.deserialize(value)?;
        Ok(Box::new(value))
    }
}

#[derive(Default)]
struct CodecTable {
    codecs: HashMap<TypeId, Arc<dyn TypeCodec>>,
    /// Types already bound into a derived table descriptor.
    sealed: HashSet<TypeId>,
}

/// Registry of codecs keyed by in-memory type. Write-once, read-mostly.
#[derive(Default)]
pub struct CodecRegistry {
    table: RwLock<CodecTable>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the chrono and uuid codecs.
    pub fn with_builtin_codecs() -> Self {
        let mut table = CodecTable::default();
        insert_codec(&mut table, DateTimeCodec);
        insert_codec(&mut table, NaiveDateCodec);
        insert_codec(&mut table, UuidCodec);
        Self {
            table: RwLock::new(table),
        }
    }

    pub fn register<C: Codec>(&self, codec: C) -> Result<()> {
        let type_id = TypeId::of::<C::Value>();
        let type_name = std::any::type_name::<C::Value>();
        let mut table = self.table.write()?;

        if table.sealed.contains(&type_id) {
            warn!(
                "Rejected codec for {}: type already used by a table descriptor",
                type_name
            );
            return Err(OrmError::Schema(SchemaError::CodecRegisteredAfterUse {
                type_name: type_name.to_string(),
            }));
        }

        if table.codecs.contains_key(&type_id) {
            warn!("Replacing codec for {}", type_name);
        }
        insert_codec(&mut table, codec);
        debug!("Registered codec for {}", type_name);
        Ok(())
    }

    pub fn lookup(&self, type_id: TypeId) -> Result<Option<Arc<dyn TypeCodec>>> {
        let table = self.table.read()?;
        Ok(table.codecs.get(&type_id).cloned())
    }

    pub fn contains(&self, type_id: TypeId) -> Result<bool> {
        Ok(self.table.read()?.codecs.contains_key(&type_id))
    }

    /// Looks up a codec and marks its type as used, after which the type's
    /// codec can no longer be replaced.
    pub(crate) fn bind(&self, type_id: TypeId) -> Result<Option<Arc<dyn TypeCodec>>> {
        let mut table = self.table.write()?;
        let codec = table.codecs.get(&type_id).cloned();
        if codec.is_some() {
            table.sealed.insert(type_id);
        }
        Ok(codec)
    }

    pub fn is_bound(&self, type_id: TypeId) -> Result<bool> {
        Ok(self.table.read()?.sealed.contains(&type_id))
    }
}

fn insert_codec<C: Codec>(table: &mut CodecTable, codec: C) {
    table
        .codecs
        .insert(TypeId::of::<C::Value>(), Arc::new(codec) as Arc<dyn TypeCodec>);
}
