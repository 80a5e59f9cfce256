//! Process-wide [`Database`] slot.
//!
//! Prefer passing a `Database` (or the builders it creates) explicitly. The
//! global slot is for code paths that have no way to receive one.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<Arc<Database>> = OnceLock::new();

/// Install the process-wide database. Fails if one is already installed.
pub fn install(db: Database) -> DbResult<Arc<Database>> {
    let db = Arc::new(db);
    GLOBAL
        .set(db.clone())
        .map_err(|_| DbError::Other("a global database is already installed".to_string()))?;
    Ok(db)
}

/// The installed database, if any.
pub fn get() -> Option<Arc<Database>> {
    GLOBAL.get().cloned()
}
