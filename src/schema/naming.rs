use crate::core::SchemaError;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

pub const DEFAULT_ID_COLUMN: &str = "id";

const SQLITE_KEYWORDS: &[&str] = &[
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE", "AND", "AS", "ASC",
    "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE", "CASE", "CAST",
    "CHECK", "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS",
    "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE", "DEFAULT",
    "DEFERRABLE", "DEFERRED", "DELETE", "DESC", "DETACH", "DISTINCT", "DO", "DROP", "EACH",
    "ELSE", "END", "ESCAPE", "EXCEPT", "EXCLUDE", "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL",
    "FILTER", "FIRST", "FOLLOWING", "FOR", "FOREIGN", "FROM", "FULL", "GENERATED", "GLOB",
    "GROUP", "GROUPS", "HAVING", "IF", "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED",
    "INITIALLY", "INNER", "INSERT", "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN",
    "KEY", "LAST", "LEFT", "LIKE", "LIMIT", "MATCH", "MATERIALIZED", "NATURAL", "NO", "NOT",
    "NOTHING", "NOTNULL", "NULL", "NULLS", "OF", "OFFSET", "ON", "OR", "ORDER", "OTHERS",
    "OUTER", "OVER", "PARTITION", "PLAN", "PRAGMA", "PRECEDING", "PRIMARY", "QUERY", "RAISE",
    "RANGE", "RECURSIVE", "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME", "REPLACE",
    "RESTRICT", "RETURNING", "RIGHT", "ROLLBACK", "ROW", "ROWS", "SAVEPOINT", "SELECT", "SET",
    "TABLE", "TEMP", "TEMPORARY", "THEN", "TIES", "TO", "TRANSACTION", "TRIGGER", "UNBOUNDED",
    "UNION", "UNIQUE", "UPDATE", "USING", "VACUUM", "VALUES", "VIEW", "VIRTUAL", "WHEN",
    "WHERE", "WINDOW", "WITH", "WITHOUT",
];

lazy_static! {
    static ref IDENTIFIER: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid");
    static ref RESERVED: HashSet<&'static str> = SQLITE_KEYWORDS.iter().copied().collect();
}

pub fn is_reserved_word(name: &str) -> bool {
    RESERVED.contains(name.to_ascii_uppercase().as_str())
}

/// Table and column names are emitted into SQL literally, so they must be
/// plain identifiers and not SQLite keywords.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name) && !is_reserved_word(name)
}

pub fn validate_identifier(name: &str) -> Result<(), SchemaError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

/// Converts a Rust type path into a snake_case table name.
///
/// `crate::model::BlogPost` becomes `blog_post`; generic arguments are dropped.
pub fn default_table_name(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let base = base.rsplit("::").next().unwrap_or(base);

    let mut table = String::with_capacity(base.len() + 4);
    let mut prev_lower = false;
    for ch in base.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower {
                table.push('_');
            }
            table.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else if ch.is_ascii_alphanumeric() {
            table.push(ch);
            prev_lower = true;
        } else {
            table.push('_');
            prev_lower = false;
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers() {
        assert!(is_valid_identifier("notes"));
        assert!(is_valid_identifier("_Id2"));
        assert!(!is_valid_identifier("2notes"));
        assert!(!is_valid_identifier("notes; DROP TABLE x"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_keywords_are_rejected() {
        assert!(is_reserved_word("order"));
        assert!(is_reserved_word("Group"));
        assert!(!is_valid_identifier("index"));
        assert!(!is_valid_identifier("FROM"));
        assert!(is_valid_identifier("orders"));
        assert!(is_valid_identifier("group_id"));
        assert!(matches!(
            validate_identifier("order"),
            Err(SchemaError::InvalidIdentifier(name)) if name == "order"
        ));
    }

    #[test]
    fn test_default_table_name() {
        assert_eq!(default_table_name("app::model::BlogPost"), "blog_post");
        assert_eq!(default_table_name("Note"), "note");
        assert_eq!(default_table_name("Wrapper<app::Inner>"), "wrapper");
    }
}
