//! Fluent statement builders.
//!
//! Every builder renders to a [`Statement`]: SQL text with positional `?`
//! placeholders and the arguments bound to them, in order. Values are never
//! inlined into the SQL.

mod delete;
pub(crate) mod save;
mod select;
mod update;

pub use delete::{Delete, DeleteFrom};
pub use select::{EntityIter, JoinKind, Select, SelectFrom};
pub use update::Update;

use crate::core::{QueryBuildError, SqlValue};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    // Quoted literals and identifiers may legitimately contain '?'.
    static ref QUOTED: Regex =
        Regex::new(r#"'(?:[^']|'')*'|"(?:[^"]|"")*""#).expect("quoted-text pattern is valid");
}

/// Number of positional placeholders outside quoted text.
pub fn count_placeholders(sql: &str) -> usize {
    QUOTED
        .replace_all(sql, "")
        .chars()
        .filter(|c| *c == '?')
        .count()
}

/// Builds a `Vec<SqlValue>` from heterogeneous values.
///
/// ```
/// use rustmemorm::{params, SqlValue};
///
/// let args = params![1, "a", true];
/// assert_eq!(args[2], SqlValue::Integer(1));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::SqlValue>::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::SqlValue::from($value)),+]
    };
}

/// A rendered, parameterized statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    pub fn placeholder_count(&self) -> usize {
        count_placeholders(&self.sql)
    }

    /// Checks the one-to-one placeholder/argument correspondence.
    pub fn validate(&self) -> Result<(), QueryBuildError> {
        check_arity("statement", &self.sql, self.args.len())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(|a| format!("{:?}", a)).collect();
            write!(f, " -- [{}]", args.join(", "))?;
        }
        Ok(())
    }
}

fn check_arity(clause: &str, sql: &str, arguments: usize) -> Result<(), QueryBuildError> {
    let placeholders = count_placeholders(sql);
    if placeholders != arguments {
        return Err(QueryBuildError::PlaceholderMismatch {
            clause: clause.to_string(),
            placeholders,
            arguments,
        });
    }
    Ok(())
}

/// SQL fragment plus the arguments for its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Clause {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

impl Clause {
    pub fn new(kind: &'static str, sql: &str, args: Vec<SqlValue>) -> Result<Self, QueryBuildError> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(QueryBuildError::EmptyClause(kind));
        }
        check_arity(&format!("{} '{}'", kind, sql), sql, args.len())?;
        Ok(Self {
            sql: sql.to_string(),
            args,
        })
    }
}

/// Predicates added one at a time and joined with AND.
#[derive(Debug, Clone, Default)]
pub(crate) struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Appends ` WHERE ...` and its arguments.
    pub fn render_into(&self, sql: &mut String, args: &mut Vec<SqlValue>) {
        if self.clauses.is_empty() {
            return;
        }
        sql.push_str(" WHERE ");
        if self.clauses.len() == 1 {
            sql.push_str(&self.clauses[0].sql);
        } else {
            let parts: Vec<String> = self
                .clauses
                .iter()
                .map(|clause| format!("({})", clause.sql))
                .collect();
            sql.push_str(&parts.join(" AND "));
        }
        for clause in &self.clauses {
            args.extend(clause.args.iter().cloned());
        }
    }
}

/// Keeps the first builder error so fluent calls can stay infallible; it is
/// reported when the statement is rendered.
#[derive(Debug, Clone, Default)]
pub(crate) struct Deferred(Option<QueryBuildError>);

impl Deferred {
    pub fn record<T>(&mut self, result: Result<T, QueryBuildError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                if self.0.is_none() {
                    self.0 = Some(err);
                }
                None
            }
        }
    }

    pub fn check(&self) -> Result<(), QueryBuildError> {
        match &self.0 {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_placeholders_skips_literals() {
        assert_eq!(count_placeholders("a = ? AND b = ?"), 2);
        assert_eq!(count_placeholders("title = '?' AND id = ?"), 1);
        assert_eq!(count_placeholders("title = 'it''s ?' AND \"odd?\" = ?"), 1);
        assert_eq!(count_placeholders("1 = 1"), 0);
    }

    #[test]
    fn test_clause_arity() {
        assert!(Clause::new("WHERE", "id = ?", params![1]).is_ok());
        let err = Clause::new("WHERE", "id = ? OR id = ?", params![1]).unwrap_err();
        assert!(matches!(
            err,
            QueryBuildError::PlaceholderMismatch {
                placeholders: 2,
                arguments: 1,
                ..
            }
        ));
        assert_eq!(
            Clause::new("WHERE", "  ", params![]).unwrap_err(),
            QueryBuildError::EmptyClause("WHERE")
        );
    }

    #[test]
    fn test_predicate_rendering() {
        let mut predicate = Predicate::default();
        predicate.push(Clause::new("WHERE", "a = ?", params![1]).unwrap());
        predicate.push(Clause::new("WHERE", "b = ? OR c = ?", params!["x", 2.5]).unwrap());

        let mut sql = String::from("SELECT * FROM t");
        let mut args = Vec::new();
        predicate.render_into(&mut sql, &mut args);
        assert_eq!(sql, "SELECT * FROM t WHERE (a = ?) AND (b = ? OR c = ?)");
        assert_eq!(args, params![1, "x", 2.5]);
    }

    #[test]
    fn test_params_macro() {
        let args = params![1i64, "a", true, None::<i64>];
        assert_eq!(
            args,
            vec![
                SqlValue::Integer(1),
                SqlValue::Text("a".into()),
                SqlValue::Integer(1),
                SqlValue::Null
            ]
        );
        assert!(params![].is_empty());
    }
}
