// ==========================================
// Blood Bank Allocation - Blood request repository
// ==========================================
// Table: blood_request
// No business rules; status changes are conditional updates
// ==========================================

use crate::db::{format_datetime, open_sqlite_connection};
use crate::domain::request::{BloodRequest, NewBloodRequest};
use crate::domain::types::RequestStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::mapping::{get_abo, get_datetime, get_rh, get_status, get_u32};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"SELECT request_id, patient_name, hospital_admitted,
           patient_blood_type, rh_factor, units_requested,
           status, requested_at, last_updated
    FROM blood_request"#;

// ==========================================
// BloodRequestRepository
// ==========================================
pub struct BloodRequestRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BloodRequestRepository {
    /// Opens a dedicated connection
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Shares an existing connection
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Inserts a Pending request
    ///
    /// # Returns
    /// - `Ok(request_id)`
    pub fn insert(&self, request: &NewBloodRequest, now: NaiveDateTime) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let ts = format_datetime(&now);

        conn.execute(
            r#"INSERT INTO blood_request (
                patient_name, hospital_admitted, patient_blood_type, rh_factor,
                units_requested, status, requested_at, last_updated
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)"#,
            params![
                &request.patient_name,
                &request.hospital_admitted,
                request.patient_blood_type.as_str(),
                request.rh_factor.as_str(),
                request.units_requested,
                RequestStatus::Pending.as_str(),
                &ts,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// # Returns
    /// - `Ok(Some(BloodRequest))`: found
    /// - `Ok(None)`: no such request
    pub fn find_by_id(&self, request_id: i64) -> RepositoryResult<Option<BloodRequest>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE request_id = ?1", SELECT_COLUMNS);

        let request = conn
            .query_row(&sql, params![request_id], Self::map_row)
            .optional()?;

        Ok(request)
    }

    /// Lists requests, newest first, optionally filtered by status
    pub fn list(&self, status: Option<RequestStatus>) -> RepositoryResult<Vec<BloodRequest>> {
        let conn = self.get_conn()?;

        let requests = match status {
            Some(status) => {
                let sql = format!(
                    "{} WHERE status = ?1 ORDER BY requested_at DESC, request_id DESC",
                    SELECT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![status.as_str()], Self::map_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!("{} ORDER BY requested_at DESC, request_id DESC", SELECT_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], Self::map_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(requests)
    }

    /// Conditional status change: `UPDATE ... WHERE status = from`
    ///
    /// # Errors
    /// - `NotFound`: request does not exist
    /// - `InvalidStateTransition`: current status is not `from`
    pub fn transition_status(
        &self,
        request_id: i64,
        from: RequestStatus,
        to: RequestStatus,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"UPDATE blood_request
               SET status = ?1, last_updated = ?2
               WHERE request_id = ?3 AND status = ?4"#,
            params![to.as_str(), format_datetime(&now), request_id, from.as_str()],
        )?;

        if affected == 1 {
            return Ok(());
        }

        // Tell a missing row apart from a lost race
        let current: Option<String> = conn
            .query_row(
                "SELECT status FROM blood_request WHERE request_id = ?1",
                params![request_id],
                |row| row.get(0),
            )
            .optional()?;

        match current {
            None => Err(RepositoryError::NotFound {
                entity: "BloodRequest".to_string(),
                id: request_id.to_string(),
            }),
            Some(actual) => Err(RepositoryError::InvalidStateTransition {
                from: actual,
                to: to.as_str().to_string(),
            }),
        }
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<BloodRequest> {
        Ok(BloodRequest {
            request_id: row.get(0)?,
            patient_name: row.get(1)?,
            hospital_admitted: row.get(2)?,
            patient_blood_type: get_abo(row, 3)?,
            rh_factor: get_rh(row, 4)?,
            units_requested: get_u32(row, 5)?,
            status: get_status(row, 6)?,
            requested_at: get_datetime(row, 7)?,
            last_updated: get_datetime(row, 8)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema, now_utc};
    use crate::domain::types::{AboGroup, RhFactor};

    fn setup() -> BloodRequestRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        BloodRequestRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn new_request() -> NewBloodRequest {
        NewBloodRequest {
            patient_name: "Maria Santos".to_string(),
            hospital_admitted: None,
            patient_blood_type: AboGroup::Ab,
            rh_factor: RhFactor::Negative,
            units_requested: 4,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let repo = setup();
        let id = repo.insert(&new_request(), now_utc()).unwrap();

        let found = repo.find_by_id(id).unwrap().unwrap();
        assert_eq!(found.status, RequestStatus::Pending);
        assert_eq!(found.blood_type().code(), "AB-");
        assert_eq!(found.units_requested, 4);

        assert!(repo.find_by_id(id + 100).unwrap().is_none());
    }

    #[test]
    fn test_transition_is_conditional() {
        let repo = setup();
        let id = repo.insert(&new_request(), now_utc()).unwrap();

        repo.transition_status(id, RequestStatus::Pending, RequestStatus::Confirmed, now_utc())
            .unwrap();

        let second =
            repo.transition_status(id, RequestStatus::Pending, RequestStatus::Confirmed, now_utc());
        assert!(matches!(
            second,
            Err(RepositoryError::InvalidStateTransition { .. })
        ));

        let missing =
            repo.transition_status(999, RequestStatus::Pending, RequestStatus::Confirmed, now_utc());
        assert!(matches!(missing, Err(RepositoryError::NotFound { .. })));
    }

    #[test]
    fn test_list_filters_by_status() {
        let repo = setup();
        let a = repo.insert(&new_request(), now_utc()).unwrap();
        let _b = repo.insert(&new_request(), now_utc()).unwrap();
        repo.transition_status(a, RequestStatus::Pending, RequestStatus::Confirmed, now_utc())
            .unwrap();

        assert_eq!(repo.list(None).unwrap().len(), 2);
        assert_eq!(repo.list(Some(RequestStatus::Pending)).unwrap().len(), 1);
        let confirmed = repo.list(Some(RequestStatus::Confirmed)).unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].request_id, a);
    }
}
