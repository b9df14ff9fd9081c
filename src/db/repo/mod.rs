//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `ledgers.rs` - ledger aggregate load/save with optimistic locking
//! - `snapshots.rs` - append-only snapshot writes and backward lookups

mod ledgers;
mod snapshots;

use sqlx::sqlite::SqlitePool;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

use crate::domain::{Decimal, Pool};

/// Errors surfaced by the repository.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The ledger row changed under us: another writer persisted a newer
    /// version between our load and our save.
    #[error("stale write for pool {0}: ledger version changed")]
    StaleWrite(Pool),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn db(&self) -> &SqlitePool {
        &self.pool
    }

    /// Liveness check used by the readiness endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Parse a decimal column stored as a canonical string. Malformed values are
/// logged and read as zero rather than failing the whole row.
pub(crate) fn parse_decimal_column(value: &str, column: &str) -> Decimal {
    match Decimal::from_str(value) {
        Ok(d) => d,
        Err(e) => {
            warn!("Malformed decimal in column {}: {} ({})", column, value, e);
            Decimal::zero()
        }
    }
}
