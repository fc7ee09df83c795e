// ==========================================
// Blood Bank Allocation - Donation unit repository
// ==========================================
// Table: donation_unit
// remaining_volume is only decremented through a guarded UPDATE:
//   remaining_volume >= units_to_take, so concurrent writers cannot overdraw
// ==========================================

use crate::db::{format_datetime, open_sqlite_connection};
use crate::domain::donation::DonationUnit;
use crate::domain::types::BloodType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::mapping::{get_blood_type, get_datetime, get_u32};
use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"SELECT unit_key, donor_id, blood_type, remaining_volume,
           collected_at, collection_successful, unit_serial_number
    FROM donation_unit"#;

/// Outcome of a guarded decrement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecrementOutcome {
    Applied,
    /// Row exists but holds less than requested
    StaleQuantity,
    NotFound,
}

// ==========================================
// DonationUnitRepository
// ==========================================
pub struct DonationUnitRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DonationUnitRepository {
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

    /// Inserts or replaces a collection record
    ///
    /// Existing rows keep their position in snapshot order
    pub fn upsert(&self, unit: &DonationUnit, now: NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO donation_unit (
                unit_key, donor_id, blood_type, remaining_volume,
                collected_at, collection_successful, unit_serial_number, last_updated
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(unit_key) DO UPDATE SET
                donor_id = excluded.donor_id,
                blood_type = excluded.blood_type,
                remaining_volume = excluded.remaining_volume,
                collected_at = excluded.collected_at,
                collection_successful = excluded.collection_successful,
                unit_serial_number = excluded.unit_serial_number,
                last_updated = excluded.last_updated"#,
            params![
                &unit.unit_key,
                &unit.donor_id,
                unit.blood_type.code(),
                unit.remaining_volume,
                format_datetime(&unit.collected_at),
                unit.collection_successful,
                &unit.unit_serial_number,
                format_datetime(&now),
            ],
        )?;

        Ok(())
    }

    pub fn find_by_key(&self, unit_key: &str) -> RepositoryResult<Option<DonationUnit>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE unit_key = ?1", SELECT_COLUMNS);

        let unit = conn
            .query_row(&sql, params![unit_key], Self::map_row)
            .optional()?;

        Ok(unit)
    }

    /// Successful collections that still hold volume, in insertion order
    ///
    /// Expiry is not filtered here
    pub fn list_successful_collections(&self) -> RepositoryResult<Vec<DonationUnit>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE collection_successful = 1 AND remaining_volume > 0 ORDER BY rowid",
            SELECT_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let units = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(units)
    }

    /// Successful units of the given types with volume left, oldest collection first
    pub fn list_available_by_types(&self, types: &[BloodType]) -> RepositoryResult<Vec<DonationUnit>> {
        if types.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let placeholders = vec!["?"; types.len()].join(", ");
        let sql = format!(
            "{} WHERE collection_successful = 1 AND remaining_volume > 0 AND blood_type IN ({}) \
             ORDER BY collected_at ASC, rowid ASC",
            SELECT_COLUMNS, placeholders
        );

        let codes: Vec<String> = types.iter().map(|t| t.code()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let units = stmt
            .query_map(params_from_iter(codes.iter()), Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(units)
    }

    /// Guarded decrement
    ///
    /// `remaining_volume = remaining_volume - units` only when
    /// `remaining_volume >= units`; stamps last_updated
    pub fn decrement_if_available(
        &self,
        unit_key: &str,
        units: u32,
        now: NaiveDateTime,
    ) -> RepositoryResult<DecrementOutcome> {
        if units == 0 {
            return Err(RepositoryError::ValidationError(format!(
                "decrement of zero units for unit {}",
                unit_key
            )));
        }

        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"UPDATE donation_unit
               SET remaining_volume = remaining_volume - ?1, last_updated = ?2
               WHERE unit_key = ?3 AND remaining_volume >= ?1"#,
            params![units, format_datetime(&now), unit_key],
        )?;

        if affected == 1 {
            return Ok(DecrementOutcome::Applied);
        }

        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM donation_unit WHERE unit_key = ?1",
                params![unit_key],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);

        Ok(if exists {
            DecrementOutcome::StaleQuantity
        } else {
            DecrementOutcome::NotFound
        })
    }

    /// Remaining volume per blood type across successful collections
    pub fn remaining_by_type(&self) -> RepositoryResult<BTreeMap<String, u64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT blood_type, SUM(remaining_volume)
               FROM donation_unit
               WHERE collection_successful = 1
               GROUP BY blood_type
               ORDER BY blood_type"#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut totals = BTreeMap::new();
        for row in rows {
            let (blood_type, total) = row?;
            totals.insert(blood_type, total.max(0) as u64);
        }
        Ok(totals)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<DonationUnit> {
        Ok(DonationUnit {
            unit_key: row.get(0)?,
            donor_id: row.get(1)?,
            blood_type: get_blood_type(row, 2)?,
            remaining_volume: get_u32(row, 3)?,
            collected_at: get_datetime(row, 4)?,
            collection_successful: row.get(5)?,
            unit_serial_number: row.get(6)?,
        })
    }
}
