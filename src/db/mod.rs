//! Database module for Solera.
//!
//! This module provides SQLite connectivity and migration management for
//! the user store and the security-event log.

mod audit;
mod repository;
mod schema;
mod user;

pub use audit::{AuditLog, SecurityEvent};
pub use repository::UserRepository;
pub use schema::MIGRATIONS;
pub use user::{NewUser, Role, User, UserUpdate};

use std::path::Path;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::Result;

/// Database wrapper managing the SQLite connection and migrations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database connection at the specified path.
    ///
    /// The file is created if it does not exist, and pending migrations
    /// are applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening database at {:?}", path);

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::configure_connection(&conn)?;

        let mut db = Self { conn };
        db.migrate()?;

        Ok(db)
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory database");
        let conn = Connection::open_in_memory()?;
        Self::configure_connection(&conn)?;

        let mut db = Self { conn };
        db.migrate()?;

        Ok(db)
    }

    /// Configure the connection with recommended settings.
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        // journal_mode and busy_timeout return a value, so use query_row
        let _: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        let _: i64 = conn.query_row("PRAGMA busy_timeout = 5000", [], |row| row.get(0))?;
        Ok(())
    }

    /// Get a reference to the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Get the current schema version.
    pub fn schema_version(&self) -> Result<i64> {
        let table_exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !table_exists {
            return Ok(0);
        }

        let version: i64 = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        Ok(version)
    }

    /// Apply pending migrations.
    pub fn migrate(&mut self) -> Result<()> {
        let current_version = self.schema_version()?;
        let migrations = MIGRATIONS;

        if current_version as usize >= migrations.len() {
            debug!("Database is up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating database from version {} to {}",
            current_version,
            migrations.len()
        );

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version     INTEGER PRIMARY KEY,
                applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        for (i, migration) in migrations.iter().enumerate().skip(current_version as usize) {
            let version = (i + 1) as i64;
            info!("Applying migration v{}", version);

            let tx = self.conn.transaction()?;
            tx.execute_batch(migration)?;
            tx.execute("INSERT INTO schema_version (version) VALUES (?)", [version])?;
            tx.commit()?;

            debug!("Migration v{} applied", version);
        }

        Ok(())
    }

    /// Check if a table exists.
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
            [table_name],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
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
    fn test_migrations_applied() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap() as usize, MIGRATIONS.len());
    }

    #[test]
    fn test_tables_exist() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.table_exists("users").unwrap());
        assert!(db.table_exists("security_events").unwrap());
        assert!(db.table_exists("schema_version").unwrap());
        assert!(!db.table_exists("nonexistent").unwrap());
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let db = Database::open_in_memory().unwrap();

        let fk_enabled: i64 = db
            .conn()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk_enabled, 1);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("solera.db");

        {
            let db = Database::open(&db_path).unwrap();
            assert!(db.table_exists("users").unwrap());
        }

        // Reopening must not reapply migrations
        {
            let db = Database::open(&db_path).unwrap();
            assert_eq!(db.schema_version().unwrap() as usize, MIGRATIONS.len());
        }
    }

    #[test]
    fn test_users_table_columns() {
        let db = Database::open_in_memory().unwrap();

        let result: rusqlite::Result<()> = db.conn().query_row(
            "SELECT id, username, password_hash, display_name, email, role,
                    created_at, last_login, is_active
             FROM users LIMIT 0",
            [],
            |_| Ok(()),
        );

        // Query succeeds with no rows or fails with the "no rows" error;
        // a missing column would produce a different error.
        match result {
            Ok(()) => {}
            Err(e) => assert!(e.to_string().contains("no rows"), "unexpected error: {e}"),
        }
    }
}
