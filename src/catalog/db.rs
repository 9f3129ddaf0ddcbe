use std::fs;
use std::path::PathBuf;

use rusqlite::Connection;

use crate::catalog::migrations::MIGRATIONS;
use crate::error::CatalogError;
use crate::projects;

/// Explicit handle to the backing store. Every component takes a connection
/// opened from here; there is no shared global handle.
#[derive(Debug, Clone)]
pub struct CatalogDb {
    path: PathBuf,
}

impl CatalogDb {
    pub fn new(path: String) -> Self {
        Self {
            path: PathBuf::from(path),
        }
    }

    pub fn initialize(&self) -> Result<(), CatalogError> {
        if self.path.as_os_str().is_empty() {
            return Err(CatalogError::InvalidInput(
                "catalog path must not be empty".to_string(),
            ));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|error| {
                    CatalogError::Io(format!("failed to create catalog directory: {error}"))
                })?;
            }
        }

        let mut conn = self.open_connection()?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|error| {
                CatalogError::Persistence(format!("failed to initialize pragmas: {error}"))
            })?;

        for migration in MIGRATIONS {
            conn.execute_batch(migration).map_err(|error| {
                CatalogError::Persistence(format!("failed to apply migration: {error}"))
            })?;
        }

        // Adoption rewrites every legacy row; commit it as a unit so a failure
        // partway through leaves the membership text untouched.
        let tx = conn.transaction().map_err(|error| {
            CatalogError::Persistence(format!("failed to start adoption transaction: {error}"))
        })?;
        let adopted = projects::adopt_legacy_memberships(&tx)?;
        tx.commit().map_err(|error| {
            CatalogError::Persistence(format!("failed to commit adoption transaction: {error}"))
        })?;
        if adopted > 0 {
            tracing::info!(adopted, "migrated legacy project membership lists");
        }

        Ok(())
    }

    pub fn open_connection(&self) -> Result<Connection, CatalogError> {
        let conn = Connection::open(&self.path).map_err(|error| {
            CatalogError::Persistence(format!("failed to open sqlite connection: {error}"))
        })?;

        // foreign_keys is per-connection in SQLite, not per-database.
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|error| {
                CatalogError::Persistence(format!("failed to enable foreign keys: {error}"))
            })?;

        Ok(conn)
    }
}
