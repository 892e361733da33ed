use super::{Clause, Deferred, Predicate, Statement};
use crate::core::{FieldType, QueryBuildError, Result, SqlValue};
use crate::facade::Session;
use crate::schema::{Entity, TableDescriptor};
use crate::storage::RowCursor;
use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Cross,
}

impl JoinKind {
    fn keyword(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

#[derive(Debug, Clone)]
struct Join {
    kind: JoinKind,
    table: String,
    on: Option<Clause>,
}

/// Projection stage of a SELECT, before the target table is known.
pub struct Select<'s> {
    session: &'s Session,
    columns: Vec<String>,
    distinct: bool,
}

impl<'s> Select<'s> {
    pub(crate) fn new(session: &'s Session) -> Self {
        Self {
            session,
            columns: Vec::new(),
            distinct: false,
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn from<T: Entity>(self) -> Result<SelectFrom<'s, T>> {
        let descriptor = self.session.describe::<T>()?;
        Ok(SelectFrom {
            session: self.session,
            descriptor,
            columns: self.columns,
            distinct: self.distinct,
            joins: Vec::new(),
            predicate: Predicate::default(),
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            deferred: Deferred::default(),
            _entity: PhantomData,
        })
    }

    /// A SELECT without a FROM table cannot be rendered.
    pub fn to_statement(&self) -> Result<Statement> {
        Err(QueryBuildError::MissingTable.into())
    }
}

/// SELECT over the table of `T`; rows are marshalled back into `T`.
pub struct SelectFrom<'s, T: Entity> {
    session: &'s Session,
    descriptor: Arc<TableDescriptor>,
    columns: Vec<String>,
    distinct: bool,
    joins: Vec<Join>,
    predicate: Predicate,
    group_by: Vec<String>,
    having: Option<Clause>,
    order_by: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    deferred: Deferred,
    _entity: PhantomData<fn() -> T>,
}

impl<'s, T: Entity> SelectFrom<'s, T> {
    /// Adds a predicate; several calls are combined with AND.
    pub fn filter(mut self, predicate: &str, args: Vec<SqlValue>) -> Self {
        if let Some(clause) = self.deferred.record(Clause::new("WHERE", predicate, args)) {
            self.predicate.push(clause);
        }
        self
    }

    pub fn join(self, table: &str, on: &str, args: Vec<SqlValue>) -> Self {
        self.push_join(JoinKind::Inner, table, Some((on, args)))
    }

    pub fn left_join(self, table: &str, on: &str, args: Vec<SqlValue>) -> Self {
        self.push_join(JoinKind::Left, table, Some((on, args)))
    }

    pub fn cross_join(self, table: &str) -> Self {
        self.push_join(JoinKind::Cross, table, None)
    }

    /// Inner join on a foreign-key column of `T` pointing at `R`.
    pub fn join_reference<R: Entity>(mut self, column: &str) -> Result<Self> {
        let target = self.session.describe::<R>()?;
        let field = self.descriptor.field(column).ok_or_else(|| QueryBuildError::UnknownColumn {
            table: self.descriptor.table_name().to_string(),
            column: column.to_string(),
        })?;
        match field.field_type() {
            FieldType::Reference(reference) if reference.type_id() == TypeId::of::<R>() => {}
            _ => {
                return Err(QueryBuildError::NotAReference {
                    table: self.descriptor.table_name().to_string(),
                    column: column.to_string(),
                    target: target.table_name().to_string(),
                }
                .into());
            }
        }
        self.joins.push(Join {
            kind: JoinKind::Inner,
            table: target.table_name().to_string(),
            on: Some(Clause {
                sql: format!(
                    "{} = {}.{}",
                    target.qualified_id(),
                    self.descriptor.table_name(),
                    column
                ),
                args: Vec::new(),
            }),
        });
        Ok(self)
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    pub fn having(mut self, predicate: &str, args: Vec<SqlValue>) -> Self {
        if let Some(clause) = self.deferred.record(Clause::new("HAVING", predicate, args)) {
            self.having = Some(clause);
        }
        self
    }

    /// Ordering term, e.g. `"title ASC"`.
    pub fn order_by(mut self, term: impl Into<String>) -> Self {
        self.order_by.push(term.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn to_statement(&self) -> Result<Statement> {
        self.render(self.limit)
    }

    /// First matching row as an entity, or `None`.
    pub fn execute_single(&self) -> Result<Option<T>> {
        let statement = self.render(Some(self.limit.map_or(1, |limit| limit.min(1))))?;
        let mut cursor = self.session.query_rows(&statement)?;
        match cursor.next() {
            Some(row) => Ok(Some(self.session.materialize::<T>(&row, &self.descriptor)?)),
            None => Ok(None),
        }
    }

    /// Runs the query and yields entities lazily. Calling it again re-runs
    /// the query.
    pub fn execute(&self) -> Result<EntityIter<'s, T>> {
        let statement = self.to_statement()?;
        let cursor = self.session.query_rows(&statement)?;
        Ok(EntityIter {
            session: self.session,
            descriptor: self.descriptor.clone(),
            cursor,
            _entity: PhantomData,
        })
    }

    pub fn fetch_all(&self) -> Result<Vec<T>> {
        self.execute()?.collect()
    }

    pub fn count(&self) -> Result<i64> {
        let inner = self.to_statement()?;
        let statement = Statement::new(format!("SELECT COUNT(*) FROM ({})", inner.sql), inner.args);
        self.scalar(&statement)
    }

    pub fn exists(&self) -> Result<bool> {
        let inner = self.to_statement()?;
        let statement = Statement::new(format!("SELECT EXISTS({})", inner.sql), inner.args);
        Ok(self.scalar(&statement)? != 0)
    }

    fn scalar(&self, statement: &Statement) -> Result<i64> {
        let mut cursor = self.session.query_rows(statement)?;
        Ok(cursor.next().and_then(|row| row.get_i64(0)).unwrap_or(0))
    }

    fn push_join(mut self, kind: JoinKind, table: &str, on: Option<(&str, Vec<SqlValue>)>) -> Self {
        let on = match on {
            Some((sql, args)) => match self.deferred.record(Clause::new("JOIN ON", sql, args)) {
                Some(clause) => Some(clause),
                None => return self,
            },
            None => None,
        };
        self.joins.push(Join {
            kind,
            table: table.to_string(),
            on,
        });
        self
    }

    fn render(&self, limit: Option<i64>) -> Result<Statement> {
        self.deferred.check()?;

        let mut sql = String::from("SELECT ");
        let mut args = Vec::new();

        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(self.descriptor.table_name());

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join.kind.keyword());
            sql.push(' ');
            sql.push_str(&join.table);
            if let Some(on) = &join.on {
                sql.push_str(" ON ");
                sql.push_str(&on.sql);
                args.extend(on.args.iter().cloned());
            }
        }

        self.predicate.render_into(&mut sql, &mut args);

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }
        if let Some(having) = &self.having {
            sql.push_str(" HAVING ");
            sql.push_str(&having.sql);
            args.extend(having.args.iter().cloned());
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        // SQLite accepts OFFSET only after LIMIT; -1 means no limit.
        match (limit, self.offset) {
            (Some(limit), offset) => {
                sql.push_str(" LIMIT ?");
                args.push(SqlValue::Integer(limit));
                if let Some(offset) = offset {
                    sql.push_str(" OFFSET ?");
                    args.push(SqlValue::Integer(offset));
                }
            }
            (None, Some(offset)) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                args.push(SqlValue::Integer(-1));
                args.push(SqlValue::Integer(offset));
            }
            (None, None) => {}
        }

        let statement = Statement::new(sql, args);
        statement.validate()?;
        Ok(statement)
    }
}

/// Lazy sequence of entities over one query result.
pub struct EntityIter<'s, T: Entity> {
    session: &'s Session,
    descriptor: Arc<TableDescriptor>,
    cursor: RowCursor,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Iterator for EntityIter<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.cursor.next()?;
        Some(self.session.materialize::<T>(&row, &self.descriptor))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor.size_hint()
    }
}
