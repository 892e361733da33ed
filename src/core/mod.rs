pub mod error;
pub mod types;
pub mod value;

pub use error::{MarshalError, OrmError, QueryBuildError, Result, SchemaError, StorageError};
pub use types::{FieldMismatch, FieldType, FieldValue, ReferenceSpec};
pub use value::{SqlValue, StorageKind};
