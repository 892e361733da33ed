use thiserror::Error;

/// Configuration errors raised while deriving a table descriptor.
///
/// These are fatal at first use of the affected entity type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Field '{field}' of '{entity}' has type {type_name} with no storage mapping and no registered codec")]
    UnmappableField {
        entity: String,
        field: String,
        type_name: String,
    },

    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Identity column '{column}' of table '{table}' clashes with a field column")]
    AmbiguousIdentity { table: String, column: String },

    #[error("Codec for {type_name} registered after the type was used by a table descriptor")]
    CodecRegisteredAfterUse { type_name: String },
}

/// Errors detected while rendering a statement, before it reaches storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryBuildError {
    #[error("{clause} clause has {placeholders} placeholder(s) but {arguments} argument(s)")]
    PlaceholderMismatch {
        clause: String,
        placeholders: usize,
        arguments: usize,
    },

    #[error("Statement has no target table")]
    MissingTable,

    #[error("UPDATE of '{0}' has no SET assignments")]
    EmptyAssignments(String),

    #[error("Empty {0} clause")]
    EmptyClause(&'static str),

    #[error("Table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },

    #[error("Column '{table}.{column}' does not reference '{target}'")]
    NotAReference {
        table: String,
        column: String,
        target: String,
    },
}

/// Per-field encode/decode failures. Recoverable: the failing field is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarshalError {
    #[error("{table}.{column}: cannot decode {found} as {expected}")]
    Decode {
        table: String,
        column: String,
        expected: String,
        found: String,
    },

    #[error("{table}.{column}: cannot encode value: {reason}")]
    Encode {
        table: String,
        column: String,
        reason: String,
    },

    #[error("{table}.{column}: codec failed: {message}")]
    Codec {
        table: String,
        column: String,
        message: String,
    },

    #[error("{table}.{column}: unknown column for entity")]
    UnknownColumn { table: String, column: String },
}

impl MarshalError {
    pub fn column(&self) -> &str {
        match self {
            Self::Decode { column, .. }
            | Self::Encode { column, .. }
            | Self::Codec { column, .. }
            | Self::UnknownColumn { column, .. } => column,
        }
    }
}

/// Errors surfaced unchanged from the storage collaborator.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum OrmError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Query build error: {0}")]
    QueryBuild(#[from] QueryBuildError),

    #[error("Marshal error: {0}")]
    Marshal(#[from] MarshalError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, OrmError>;

impl<T> From<std::sync::PoisonError<T>> for OrmError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<rusqlite::Error> for OrmError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Sqlite(err))
    }
}
