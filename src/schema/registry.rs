use super::naming::validate_identifier;
use super::{Entity, EntityDecl, FieldDescriptor, TableDescriptor};
use crate::codec::CodecRegistry;
use crate::core::{FieldType, Result, SchemaError};
use log::debug;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Read-through cache of table descriptors, one per entity type.
///
/// The first `describe` of a type derives and validates its descriptor under
/// the write lock; later calls only take the read lock.
pub struct SchemaRegistry {
    codecs: CodecRegistry,
    descriptors: RwLock<HashMap<TypeId, Arc<TableDescriptor>>>,
}

impl SchemaRegistry {
    pub fn new(codecs: CodecRegistry) -> Self {
        Self {
            codecs,
            descriptors: RwLock::new(HashMap::new()),
        }
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn describe<T: Entity>(&self) -> Result<Arc<TableDescriptor>> {
        let type_id = TypeId::of::<T>();
        if let Some(descriptor) = self.descriptors.read()?.get(&type_id) {
            return Ok(descriptor.clone());
        }

        let mut descriptors = self.descriptors.write()?;
        if let Some(descriptor) = descriptors.get(&type_id) {
            return Ok(descriptor.clone());
        }

        let descriptor = Arc::new(self.derive(T::declaration())?);
        debug!(
            "Derived table descriptor for {}: {}",
            descriptor.type_name,
            descriptor.create_table_sql()
        );
        descriptors.insert(type_id, descriptor.clone());
        Ok(descriptor)
    }

    pub fn table_name_of<T: Entity>(&self) -> Result<String> {
        Ok(self.describe::<T>()?.table_name.clone())
    }

    pub fn is_described<T: Entity>(&self) -> Result<bool> {
        Ok(self.descriptors.read()?.contains_key(&TypeId::of::<T>()))
    }

    pub fn descriptors(&self) -> Result<Vec<Arc<TableDescriptor>>> {
        Ok(self.descriptors.read()?.values().cloned().collect())
    }

    fn derive(&self, decl: EntityDecl) -> Result<TableDescriptor> {
        validate_identifier(&decl.table_name)?;
        validate_identifier(&decl.id_column)?;

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(decl.fields.len());

        for field in decl.fields {
            validate_identifier(&field.column)?;
            if field.column == decl.id_column {
                return Err(SchemaError::AmbiguousIdentity {
                    table: decl.table_name,
                    column: field.column,
                }
                .into());
            }
            if !seen.insert(field.column.clone()) {
                return Err(SchemaError::DuplicateColumn {
                    table: decl.table_name,
                    column: field.column,
                }
                .into());
            }

            let mut codec = None;
            let mut references = None;
            match field.field_type {
                FieldType::Custom { type_id, type_name } => {
                    codec = self.codecs.bind(type_id)?;
                    if codec.is_none() {
                        return Err(SchemaError::UnmappableField {
                            entity: decl.type_name.to_string(),
                            field: field.name.to_string(),
                            type_name: type_name.to_string(),
                        }
                        .into());
                    }
                }
                FieldType::Reference(target) => {
                    let target = (target.declare)();
                    references = Some(format!("{}({})", target.table_name, target.id_column));
                }
                _ => {}
            }

            fields.push(FieldDescriptor {
                field_name: field.name,
                column_name: field.column,
                field_type: field.field_type,
                codec,
                references,
            });
        }

        Ok(TableDescriptor {
            type_name: decl.type_name,
            table_name: decl.table_name,
            id_column: decl.id_column,
            fields,
        })
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new(CodecRegistry::with_builtin_codecs())
    }
}
