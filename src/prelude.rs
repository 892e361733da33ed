//! Everything application code usually needs, in one import.

pub use crate::{
    ColumnEnum, ColumnValue, Entity, ForeignKey, Identity, OrmError, Session,
    SessionConfig, SqlValue, custom_column, params, same_entity,
};
