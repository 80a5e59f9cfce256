//! # dbforge
//!
//! A fluent SQL query builder and schema forge for MySQL.
//!
//! ## Features
//!
//! - **Chainable builder**: accumulate SELECT/INSERT/UPDATE/DELETE clauses, render on a
//!   terminal call
//! - **Execution seam**: everything that touches a database goes through [`SqlExecutor`]
//! - **Escaped by default**: values are quoted through the executor; [`raw`] opts out per call
//! - **Structured WHERE hand-off**: updates and deletes never silently drop a condition
//! - **Schema forge**: fields, keys and foreign keys rendered into idempotent CREATE TABLE
//! - **Query monitoring**: `tracing` output and a [`QueryMonitor`] hook for every statement
//!
//! ## Query builder
//!
//! ```ignore
//! use dbforge::prelude::*;
//!
//! let db = Database::new(executor);
//!
//! // SELECT
//! let posts = db
//!     .builder()
//!     .select("ID, post_title")
//!     .from("posts")
//!     .where_("post_status", "publish")
//!     .order_by("post_date", "DESC")
//!     .limit(10)
//!     .get();
//!
//! // INSERT
//! db.builder().set("post_title", "Hello").insert("posts");
//!
//! // UPDATE
//! db.builder().set("hits", raw("hits + 1")).where_("ID", 5).update("posts");
//!
//! // DELETE
//! db.builder().delete_where("posts", [("ID", 5)]);
//! ```
//!
//! ## Schema forge
//!
//! ```ignore
//! db.forge()
//!     .add_id()
//!     .add_field("name", FieldSpec::new("VARCHAR").constraint(100))
//!     .create_table("tags", true);
//! ```

pub mod builder;
pub mod config;
pub mod database;
pub mod error;
pub mod escape;
pub mod executor;
pub mod forge;
pub mod global;
pub mod memory;
pub mod monitor;
pub mod prelude;
pub mod result;
pub mod row;
pub mod value;

mod exec;

pub use builder::{Direction, LikeSide, QueryBuilder, QueryError};
pub use config::{DbConfig, ForgeConfig, WhereMode};
pub use database::Database;
pub use error::{DbError, DbResult};
pub use executor::SqlExecutor;
pub use forge::{Constraint, FieldSpec, ForeignKey, ReferentialAction, SchemaForge};
pub use memory::MemoryExecutor;
pub use monitor::{
    CollectingMonitor, NoopMonitor, QueryEvent, QueryKind, QueryMonitor, QueryOutcome,
    TracingMonitor,
};
pub use result::ResultSet;
pub use row::{FromRow, FromValue, Row, RowMap};
pub use value::{ColumnMap, IntoOperand, Operand, Value, raw};
