//! `SQLite` database connection and operations.
//!
//! The database is stored at `~/.shop-notify/notify.db` by default.

use std::path::Path;

use rusqlite::Connection;

use crate::config::Paths;
use crate::error::NotifyError;

use super::migrations;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at the default location.
    ///
    /// Creates the database file and runs migrations if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open() -> Result<Self, NotifyError> {
        let paths = Paths::new()?;
        paths.ensure_dirs()?;
        Self::open_at(&paths.database)
    }

    /// Open the database at a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_at(path: &Path) -> Result<Self, NotifyError> {
        let conn = Connection::open(path).map_err(|e| {
            NotifyError::Database(format!("Failed to open database {}: {e}", path.display()))
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_in_memory() -> Result<Self, NotifyError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| NotifyError::Database(format!("Failed to open in-memory database: {e}")))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, NotifyError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| NotifyError::Database(format!("Failed to enable foreign keys: {e}")))?;

        let db = Self { conn };
        migrations::run(&db.conn)?;
        Ok(db)
    }

    /// Get the current schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be read.
    pub fn schema_version(&self) -> Result<i32, NotifyError> {
        migrations::get_version(&self.conn)
    }

    /// Get a reference to the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.schema_version().unwrap() > 0);
    }

    #[test]
    fn test_reopen_database() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("notify.db");

        {
            let db = Database::open_at(&db_path).unwrap();
            assert!(db.schema_version().unwrap() > 0);
        }
        assert!(db_path.exists());

        // Reopening must not run migrations again
        let db = Database::open_at(&db_path).unwrap();
        assert!(db.schema_version().unwrap() > 0);
    }
}
