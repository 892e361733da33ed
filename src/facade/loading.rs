use super::Session;
use crate::core::{ReferenceSpec, Result};
use crate::marshal::ReferenceResolver;
use crate::query::save;
use crate::schema::Entity;
use log::debug;
use std::any::Any;
use std::collections::HashSet;

/// State of one foreign-key traversal.
///
/// Bounds the traversal depth and remembers which rows are on the current
/// path, so a cyclic reference is left unloaded instead of recursing.
#[derive(Debug, Clone)]
pub struct LoadContext {
    remaining_depth: usize,
    path: HashSet<(String, i64)>,
}

impl LoadContext {
    pub fn new(depth: usize) -> Self {
        Self {
            remaining_depth: depth,
            path: HashSet::new(),
        }
    }

    pub fn remaining_depth(&self) -> usize {
        self.remaining_depth
    }

    pub fn is_on_path(&self, table: &str, id: i64) -> bool {
        self.path.contains(&(table.to_string(), id))
    }

    pub(crate) fn enter(&mut self, table: &str, id: i64) -> bool {
        self.path.insert((table.to_string(), id))
    }

    pub(crate) fn leave(&mut self, table: &str, id: i64) {
        self.path.remove(&(table.to_string(), id));
    }
}

/// Resolves references by loading them through the session.
pub(crate) struct SessionResolver<'a> {
    pub session: &'a Session,
    pub context: &'a mut LoadContext,
}

impl ReferenceResolver for SessionResolver<'_> {
    fn resolve(&mut self, target: &ReferenceSpec, id: i64) -> Result<Option<Box<dyn Any + Send>>> {
        if self.context.remaining_depth == 0 {
            return Ok(None);
        }
        self.context.remaining_depth -= 1;
        let loaded = (target.load)(self.session, id, self.context);
        self.context.remaining_depth += 1;
        loaded
    }
}

/// Loads one referenced row of `T`, type-erased for storage in a field value.
pub(crate) fn load_reference<T: Entity>(
    session: &Session,
    id: i64,
    context: &mut LoadContext,
) -> Result<Option<Box<dyn Any + Send>>> {
    let descriptor = session.describe::<T>()?;
    if context.is_on_path(descriptor.table_name(), id) {
        debug!(
            "Skipping cyclic reference to {}#{}",
            descriptor.table_name(),
            id
        );
        return Ok(None);
    }

    let mut cursor = session.query_rows(&save::select_by_id(&descriptor, id))?;
    let Some(row) = cursor.next() else {
        return Ok(None);
    };
    let entity: T = session.materialize_with(&row, &descriptor, context)?;
    Ok(Some(Box::new(entity)))
}
