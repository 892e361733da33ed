use crate::codec::TypeCodec;
use crate::core::{FieldType, StorageKind};
use std::fmt;
use std::sync::Arc;

pub struct FieldDescriptor {
    pub(crate) field_name: &'static str,
    pub(crate) column_name: String,
    pub(crate) field_type: FieldType,
    pub(crate) codec: Option<Arc<dyn TypeCodec>>,
    /// Table referenced by a foreign-key field.
    pub(crate) references: Option<String>,
}

impl FieldDescriptor {
    pub fn field_name(&self) -> &'static str {
        self.field_name
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn codec(&self) -> Option<&Arc<dyn TypeCodec>> {
        self.codec.as_ref()
    }

    pub fn references(&self) -> Option<&str> {
        self.references.as_deref()
    }

    /// Storage kind written and read for this column: the codec's declared
    /// kind when a codec is bound, the native mapping otherwise.
    pub fn storage_kind(&self) -> StorageKind {
        match &self.codec {
            Some(codec) => codec.storage_kind(),
            None => self.field_type.native_kind().unwrap_or(StorageKind::Null),
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("field_name", &self.field_name)
            .field("column_name", &self.column_name)
            .field("field_type", &self.field_type)
            .field("codec", &self.codec.as_ref().map(|c| c.value_type_name()))
            .field("references", &self.references)
            .finish()
    }
}

/// Immutable schema metadata for one entity type.
#[derive(Debug)]
pub struct TableDescriptor {
    pub(crate) type_name: &'static str,
    pub(crate) table_name: String,
    pub(crate) id_column: String,
    pub(crate) fields: Vec<FieldDescriptor>,
}

impl TableDescriptor {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// `table.id`, for predicates that must survive joins.
    pub fn qualified_id(&self) -> String {
        format!("{}.{}", self.table_name, self.id_column)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, column: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.column_name == column)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.column_name.as_str()).collect()
    }

    pub fn create_table_sql(&self) -> String {
        let mut columns = vec![format!(
            "{} INTEGER PRIMARY KEY AUTOINCREMENT",
            self.id_column
        )];

        for field in &self.fields {
            let mut column = format!("{} {}", field.column_name, field.storage_kind().sql_type());
            if let Some(target) = &field.references {
                column.push_str(&format!(" REFERENCES {}", target));
            }
            columns.push(column);
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table_name,
            columns.join(", ")
        )
    }
}
