// ==========================================
// Blood Bank Allocation - Allocation log repository
// ==========================================
// Table: allocation_log
// One row per committed deduction (audit trail)
// ==========================================

use crate::db::{format_datetime, open_sqlite_connection};
use crate::domain::allocation::AllocationLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::mapping::{get_blood_type, get_datetime, get_u32};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct AllocationLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AllocationLogRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Writes a batch of log rows in one transaction
    pub fn insert_batch(&self, logs: &[AllocationLog]) -> RepositoryResult<usize> {
        if logs.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO allocation_log (
                    log_id, request_id, unit_key, blood_type, units_taken, logged_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            )?;

            for log in logs {
                stmt.execute(params![
                    &log.log_id,
                    log.request_id,
                    &log.unit_key,
                    log.blood_type.code(),
                    log.units_taken,
                    format_datetime(&log.logged_at),
                ])?;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(logs.len())
    }

    /// Log rows of one request, in commit order
    pub fn list_by_request(&self, request_id: i64) -> RepositoryResult<Vec<AllocationLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT log_id, request_id, unit_key, blood_type, units_taken, logged_at
               FROM allocation_log
               WHERE request_id = ?1
               ORDER BY rowid"#,
        )?;

        let logs = stmt
            .query_map(params![request_id], |row| {
                Ok(AllocationLog {
                    log_id: row.get(0)?,
                    request_id: row.get(1)?,
                    unit_key: row.get(2)?,
                    blood_type: get_blood_type(row, 3)?,
                    units_taken: get_u32(row, 4)?,
                    logged_at: get_datetime(row, 5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(logs)
    }
}
