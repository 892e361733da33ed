// ============================================================================
// RustMemORM Library
// ============================================================================

//! Object-relational mapping core.
//!
//! Entity types declare their column mapping at compile time with
//! `#[derive(Entity)]`. A [`Session`] derives and caches a table descriptor
//! per type, marshals entities to and from rows, and builds parameterized
//! statements for the SQLite storage backend.
//!
//! # Examples
//!
//! ```
//! use rustmemorm::prelude::*;
//!
//! #[derive(Entity, Debug, Default, Clone)]
//! struct Note {
//!     id: Identity,
//!     title: String,
//!     pinned: bool,
//! }
//!
//! # fn main() -> rustmemorm::Result<()> {
//! let session = Session::memory()?;
//! session.create_table::<Note>()?;
//!
//! let mut note = Note { title: "a".into(), pinned: true, ..Default::default() };
//! assert_eq!(session.save(&mut note)?, 1);
//!
//! session
//!     .update::<Note>()?
//!     .set("pinned = ?", params![false])
//!     .filter("id = ?", params![1])
//!     .execute()?;
//!
//! let loaded = session.load::<Note>(1)?.unwrap();
//! assert!(!loaded.pinned);
//! # Ok(())
//! # }
//! ```

// Lets the derive macros' `::rustmemorm::` paths resolve inside this crate.
extern crate self as rustmemorm;

pub mod codec;
pub mod config;
pub mod core;
pub mod facade;
pub mod marshal;
pub mod prelude;
pub mod query;
pub mod schema;
pub mod storage;

pub use crate::codec::{Codec, CodecError, CodecRegistry, TypeCodec};
pub use crate::config::SessionConfig;
pub use crate::core::{
    FieldType, FieldValue, MarshalError, OrmError, QueryBuildError, Result, SchemaError, SqlValue,
    StorageError, StorageKind,
};
pub use crate::facade::{ChangeEvent, ChangeKind, ChangeObserver, LoadContext, Session};
pub use crate::query::Statement;
pub use crate::schema::{
    ColumnValue, Entity, EntityDecl, FieldDescriptor, ForeignKey, Identity, SchemaRegistry,
    TableDescriptor, same_entity,
};
pub use crate::storage::{SqliteStorage, Storage};

pub use rustmemorm_derive::{ColumnEnum, Entity};
