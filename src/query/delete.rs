use super::{Clause, Deferred, Predicate, Statement};
use crate::core::{QueryBuildError, Result, SqlValue};
use crate::facade::{ChangeEvent, ChangeKind, Session};
use crate::schema::{Entity, TableDescriptor};
use log::warn;
use std::marker::PhantomData;
use std::sync::Arc;

/// DELETE before its target table is chosen.
pub struct Delete<'s> {
    session: &'s Session,
}

impl<'s> Delete<'s> {
    pub(crate) fn new(session: &'s Session) -> Self {
        Self { session }
    }

    pub fn from<T: Entity>(self) -> Result<DeleteFrom<'s, T>> {
        Ok(DeleteFrom {
            session: self.session,
            descriptor: self.session.describe::<T>()?,
            predicate: Predicate::default(),
            deferred: Deferred::default(),
            _entity: PhantomData,
        })
    }

    pub fn to_statement(&self) -> Result<Statement> {
        Err(QueryBuildError::MissingTable.into())
    }
}

/// `DELETE FROM <table> [WHERE ...]`
///
/// Without a predicate every row of the table is deleted.
pub struct DeleteFrom<'s, T: Entity> {
    session: &'s Session,
    descriptor: Arc<TableDescriptor>,
    predicate: Predicate,
    deferred: Deferred,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> DeleteFrom<'_, T> {
    pub fn filter(mut self, predicate: &str, args: Vec<SqlValue>) -> Self {
        if let Some(clause) = self.deferred.record(Clause::new("WHERE", predicate, args)) {
            self.predicate.push(clause);
        }
        self
    }

    pub fn is_guarded(&self) -> bool {
        !self.predicate.is_empty()
    }

    pub fn to_statement(&self) -> Result<Statement> {
        self.deferred.check()?;
        let mut sql = format!("DELETE FROM {}", self.descriptor.table_name());
        let mut args = Vec::new();
        self.predicate.render_into(&mut sql, &mut args);

        let statement = Statement::new(sql, args);
        statement.validate()?;
        Ok(statement)
    }

    /// Returns the number of rows deleted.
    pub fn execute(&self) -> Result<usize> {
        let statement = self.to_statement()?;
        if !self.is_guarded() {
            warn!(
                "Unguarded DELETE: removing every row of {}",
                self.descriptor.table_name()
            );
        }
        let outcome = self.session.write(&statement)?;
        if outcome.rows_affected > 0 {
            self.session.notify(&ChangeEvent::new(
                self.descriptor.table_name(),
                None,
                ChangeKind::Delete,
            ));
        }
        Ok(outcome.rows_affected)
    }
}
