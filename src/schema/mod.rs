//! Entity declarations and the table descriptors derived from them.

mod column;
mod descriptor;
pub mod naming;
mod registry;

pub use column::{ColumnValue, ForeignKey, Identity};
pub use descriptor::{FieldDescriptor, TableDescriptor};
pub use registry::SchemaRegistry;

use crate::core::{FieldMismatch, FieldType, FieldValue};
use naming::{DEFAULT_ID_COLUMN, default_table_name};

/// A typed record mapped to one table.
///
/// Usually implemented with `#[derive(Entity)]`; a hand-written
/// implementation is validated when the registry derives its descriptor.
pub trait Entity: Default + Send + 'static {
    /// Compile-time field/column mapping of the type.
    fn declaration() -> EntityDecl;

    fn identity(&self) -> &Identity;

    fn identity_mut(&mut self) -> &mut Identity;

    /// Current values keyed by column name, in declaration order.
    fn field_values(&self) -> Vec<(&'static str, FieldValue)>;

    /// Stores a decoded value. Returns `Ok(false)` when the column is not
    /// one of the entity's fields.
    fn set_field(&mut self, column: &str, value: FieldValue) -> Result<bool, FieldMismatch>;
}

/// Entity equality: same table and same assigned identity, or the very same
/// object when neither identity is assigned.
pub fn same_entity<A: Entity, B: Entity>(a: &A, b: &B) -> bool {
    if std::ptr::eq(a as *const A as *const (), b as *const B as *const ()) {
        return true;
    }
    let (Some(left), Some(right)) = (a.identity().get(), b.identity().get()) else {
        return false;
    };
    left == right && A::declaration().table_name == B::declaration().table_name
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: &'static str,
    pub column: String,
    pub field_type: FieldType,
}

/// The declared shape of an entity type, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDecl {
    pub type_name: &'static str,
    pub table_name: String,
    pub id_column: String,
    pub fields: Vec<FieldDecl>,
}

impl EntityDecl {
    pub fn new<T: 'static>() -> Self {
        let type_name = std::any::type_name::<T>();
        Self {
            type_name,
            table_name: default_table_name(type_name),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }

    pub fn field<V: ColumnValue>(mut self, name: &'static str, column: impl Into<String>) -> Self {
        self.fields.push(FieldDecl {
            name,
            column: column.into(),
            field_type: V::field_type(),
        });
        self
    }
}
