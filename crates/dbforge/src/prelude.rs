//! Convenient imports for typical `dbforge` usage.
//!
//! ```ignore
//! use dbforge::prelude::*;
//! ```

pub use crate::{
    Database, DbConfig, DbError, DbResult, FieldSpec, ForeignKey, ForgeConfig, FromRow, LikeSide,
    QueryBuilder, ResultSet, Row, SchemaForge, SqlExecutor, Value, WhereMode, raw,
};
