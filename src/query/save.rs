//! Statements addressed by identity, used by the session's save, load and
//! delete entry points.

use super::Statement;
use crate::core::SqlValue;
use crate::marshal::RowValues;
use crate::schema::TableDescriptor;

pub(crate) fn insert(descriptor: &TableDescriptor, values: RowValues<'_>) -> Statement {
    if values.is_empty() {
        return Statement::new(
            format!("INSERT INTO {} DEFAULT VALUES", descriptor.table_name()),
            Vec::new(),
        );
    }

    let (columns, args): (Vec<&str>, Vec<SqlValue>) = values.into_iter().unzip();
    let placeholders = vec!["?"; columns.len()].join(", ");
    Statement::new(
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            descriptor.table_name(),
            columns.join(", "),
            placeholders
        ),
        args,
    )
}

/// `None` when there is nothing to assign.
pub(crate) fn update_by_id(
    descriptor: &TableDescriptor,
    values: RowValues<'_>,
    id: i64,
) -> Option<Statement> {
    if values.is_empty() {
        return None;
    }

    let (columns, mut args): (Vec<&str>, Vec<SqlValue>) = values.into_iter().unzip();
    let assignments: Vec<String> = columns.iter().map(|c| format!("{} = ?", c)).collect();
    args.push(SqlValue::Integer(id));
    Some(Statement::new(
        format!(
            "UPDATE {} SET {} WHERE {} = ?",
            descriptor.table_name(),
            assignments.join(", "),
            descriptor.id_column()
        ),
        args,
    ))
}

pub(crate) fn select_by_id(descriptor: &TableDescriptor, id: i64) -> Statement {
    Statement::new(
        format!(
            "SELECT * FROM {} WHERE {} = ? LIMIT 1",
            descriptor.table_name(),
            descriptor.id_column()
        ),
        vec![SqlValue::Integer(id)],
    )
}

pub(crate) fn delete_by_id(descriptor: &TableDescriptor, id: i64) -> Statement {
    Statement::new(
        format!(
            "DELETE FROM {} WHERE {} = ?",
            descriptor.table_name(),
            descriptor.id_column()
        ),
        vec![SqlValue::Integer(id)],
    )
}
