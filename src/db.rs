// ==========================================
// Blood Bank Allocation - SQLite connection setup
// ==========================================
// Goals:
// - every Connection::open goes through the same PRAGMA setup
// - a shared busy_timeout so concurrent writers on separate connections wait
// ==========================================

use chrono::{NaiveDateTime, Timelike};
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// Default busy_timeout (ms)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// schema_version written by `init_schema`
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Text format for every stored timestamp (UTC)
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Applies the shared PRAGMAs
///
/// foreign_keys and busy_timeout are per-connection settings
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Opens a connection and applies the shared configuration
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// Reads schema_version (None if the table does not exist)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// Creates all tables (idempotent)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS blood_request (
            request_id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_name TEXT NOT NULL,
            hospital_admitted TEXT,
            patient_blood_type TEXT NOT NULL,
            rh_factor TEXT NOT NULL,
            units_requested INTEGER NOT NULL CHECK (units_requested > 0),
            status TEXT NOT NULL DEFAULT 'Pending',
            requested_at TEXT NOT NULL,
            last_updated TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_blood_request_status ON blood_request(status);

        CREATE TABLE IF NOT EXISTS donation_unit (
            unit_key TEXT PRIMARY KEY,
            donor_id TEXT NOT NULL,
            blood_type TEXT NOT NULL,
            remaining_volume INTEGER NOT NULL CHECK (remaining_volume >= 0),
            collected_at TEXT NOT NULL,
            collection_successful INTEGER NOT NULL DEFAULT 1,
            unit_serial_number TEXT,
            last_updated TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_donation_unit_type ON donation_unit(blood_type);

        CREATE TABLE IF NOT EXISTS allocation_log (
            log_id TEXT PRIMARY KEY,
            request_id INTEGER NOT NULL REFERENCES blood_request(request_id),
            unit_key TEXT NOT NULL REFERENCES donation_unit(unit_key),
            blood_type TEXT NOT NULL,
            units_taken INTEGER NOT NULL CHECK (units_taken > 0),
            logged_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_allocation_log_request ON allocation_log(request_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// Formats a timestamp for storage
pub fn format_datetime(ts: &NaiveDateTime) -> String {
    ts.format(DATETIME_FORMAT).to_string()
}

/// Parses a stored timestamp column, mapping failures to a conversion error
pub fn parse_datetime_column(raw: &str, column: usize) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Current UTC time truncated to whole seconds (storage precision)
pub fn now_utc() -> NaiveDateTime {
    let now = chrono::Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Database file used when no path is passed explicitly
///
/// BLOOD_BANK_DB_PATH wins; otherwise `<data_dir>/blood-bank-allocation/blood_bank.db`,
/// falling back to `./blood_bank.db` when no data dir is known.
pub fn default_db_path() -> String {
    if let Ok(path) = std::env::var("BLOOD_BANK_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./blood_bank.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("blood-bank-allocation");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("blood_bank.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_schema_version_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }

    #[test]
    fn test_datetime_round_trip() {
        let ts = now_utc();
        let parsed = parse_datetime_column(&format_datetime(&ts), 0).unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn test_default_db_path_ends_with_file_name() {
        assert!(default_db_path().ends_with(".db"));
    }
}
