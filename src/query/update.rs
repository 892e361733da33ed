use super::{Clause, Deferred, Predicate, Statement};
use crate::core::{QueryBuildError, Result, SqlValue};
use crate::facade::{ChangeEvent, ChangeKind, Session};
use crate::schema::{Entity, TableDescriptor};
use std::marker::PhantomData;
use std::sync::Arc;

/// `UPDATE <table> SET ... [WHERE ...]`
///
/// Arguments bind in assignment order, then predicate order.
pub struct Update<'s, T: Entity> {
    session: &'s Session,
    descriptor: Arc<TableDescriptor>,
    assignments: Vec<Clause>,
    predicate: Predicate,
    deferred: Deferred,
    _entity: PhantomData<fn() -> T>,
}

impl<'s, T: Entity> Update<'s, T> {
    pub(crate) fn new(session: &'s Session) -> Result<Self> {
        Ok(Self {
            session,
            descriptor: session.describe::<T>()?,
            assignments: Vec::new(),
            predicate: Predicate::default(),
            deferred: Deferred::default(),
            _entity: PhantomData,
        })
    }

    /// Adds an assignment such as `"pinned = ?"` or `"hits = hits + ?"`.
    pub fn set(mut self, assignment: &str, args: Vec<SqlValue>) -> Self {
        if let Some(clause) = self.deferred.record(Clause::new("SET", assignment, args)) {
            self.assignments.push(clause);
        }
        self
    }

    /// Shorthand for `column = ?` with one bound value.
    pub fn set_value(self, column: &str, value: impl Into<SqlValue>) -> Self {
        let assignment = format!("{} = ?", column);
        self.set(&assignment, vec![value.into()])
    }

    pub fn filter(mut self, predicate: &str, args: Vec<SqlValue>) -> Self {
        if let Some(clause) = self.deferred.record(Clause::new("WHERE", predicate, args)) {
            self.predicate.push(clause);
        }
        self
    }

    pub fn to_statement(&self) -> Result<Statement> {
        self.deferred.check()?;
        if self.assignments.is_empty() {
            return Err(
                QueryBuildError::EmptyAssignments(self.descriptor.table_name().to_string()).into(),
            );
        }

        let mut sql = format!("UPDATE {} SET ", self.descriptor.table_name());
        let mut args = Vec::new();
        let parts: Vec<&str> = self.assignments.iter().map(|a| a.sql.as_str()).collect();
        sql.push_str(&parts.join(", "));
        for assignment in &self.assignments {
            args.extend(assignment.args.iter().cloned());
        }
        self.predicate.render_into(&mut sql, &mut args);

        let statement = Statement::new(sql, args);
        statement.validate()?;
        Ok(statement)
    }

    /// Returns the number of rows changed.
    pub fn execute(&self) -> Result<usize> {
        let statement = self.to_statement()?;
        let outcome = self.session.write(&statement)?;
        if outcome.rows_affected > 0 {
            self.session.notify(&ChangeEvent::new(
                self.descriptor.table_name(),
                None,
                ChangeKind::Update,
            ));
        }
        Ok(outcome.rows_affected)
    }
}
