//! Database migrations for shop-notify.
//!
//! Each migration upgrades the schema by one version, tracked in
//! `PRAGMA user_version`. Migrations run when the database is opened.

use rusqlite::Connection;

use crate::error::NotifyError;

/// Current schema version.
const CURRENT_VERSION: i32 = 1;

/// Get the current schema version from the database.
///
/// Returns 0 for a new database.
pub fn get_version(conn: &Connection) -> Result<i32, NotifyError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| NotifyError::Database(format!("Failed to get schema version: {e}")))
}

fn set_version(conn: &Connection, version: i32) -> Result<(), NotifyError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| NotifyError::Database(format!("Failed to set schema version: {e}")))
}

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<(), NotifyError> {
    let current = get_version(conn)?;

    for version in (current + 1)..=CURRENT_VERSION {
        run_migration(conn, version)?;
        set_version(conn, version)?;
    }

    Ok(())
}

fn run_migration(conn: &Connection, version: i32) -> Result<(), NotifyError> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(NotifyError::Database(format!("Unknown migration version: {version}"))),
    }
}

/// Migration v1: Initial schema.
///
/// Creates tables for:
/// - `notify_scripts`: scripts, steps kept as a JSON array
/// - `notify_log_entries`: audit log entries of shop entities
/// - `notify_notifications`: in-app notifications
/// - `mail_outbox`: emails handed over for delivery
fn migrate_v1(conn: &Connection) -> Result<(), NotifyError> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS notify_scripts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            identifier TEXT NOT NULL UNIQUE,
            shop INTEGER NOT NULL,
            event_identifier TEXT NOT NULL,
            name TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 0,
            template TEXT,
            step_data TEXT NOT NULL DEFAULT '[]',
            created_on TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notify_scripts_event
        ON notify_scripts(event_identifier, shop, enabled);

        CREATE TABLE IF NOT EXISTS notify_log_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            target_model TEXT NOT NULL,
            target_pk TEXT NOT NULL,
            message TEXT NOT NULL,
            identifier TEXT,
            kind TEXT NOT NULL DEFAULT 'other',
            extra TEXT NOT NULL DEFAULT 'null',
            created_on TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notify_log_entries_target
        ON notify_log_entries(target_model, target_pk, identifier);

        CREATE TABLE IF NOT EXISTS notify_notifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            shop INTEGER,
            recipient_type INTEGER NOT NULL,
            recipient_model TEXT,
            recipient_pk TEXT,
            priority INTEGER NOT NULL,
            message TEXT NOT NULL,
            identifier TEXT,
            url TEXT,
            created_on TEXT NOT NULL,
            read_on TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_notify_notifications_shop
        ON notify_notifications(shop, read_on);

        CREATE TABLE IF NOT EXISTS mail_outbox (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            to_addresses TEXT NOT NULL,
            subject TEXT NOT NULL,
            message TEXT NOT NULL,
            created_on TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| NotifyError::Database(format!("Migration v1 failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_v1() {
        let conn = Connection::open_in_memory().unwrap();

        run(&conn).unwrap();
        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);

        conn.execute(
            "INSERT INTO notify_scripts (identifier, shop, event_identifier, name, created_on)
             VALUES ('abc', 1, 'order_received', 'Test', '2024-01-01T10:00:00Z')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO notify_log_entries (target_model, target_pk, message, created_on)
             VALUES ('shop.order', '1', 'Hi', '2024-01-01T10:00:00Z')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);
    }
}
