// ==========================================
// Row mapping helpers shared by the repositories
// ==========================================

use crate::domain::types::{AboGroup, BloodType, RequestStatus, RhFactor};
use rusqlite::types::Type;
use rusqlite::Row;

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

pub(crate) fn get_u32(row: &Row, column: usize) -> rusqlite::Result<u32> {
    let raw: i64 = row.get(column)?;
    u32::try_from(raw).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            Type::Integer,
            format!("value {} out of range for u32", raw).into(),
        )
    })
}

pub(crate) fn get_blood_type(row: &Row, column: usize) -> rusqlite::Result<BloodType> {
    let raw: String = row.get(column)?;
    raw.parse::<BloodType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

pub(crate) fn get_abo(row: &Row, column: usize) -> rusqlite::Result<AboGroup> {
    let raw: String = row.get(column)?;
    AboGroup::parse(&raw).ok_or_else(|| conversion_error(column, format!("unknown ABO group {:?}", raw)))
}

pub(crate) fn get_rh(row: &Row, column: usize) -> rusqlite::Result<RhFactor> {
    let raw: String = row.get(column)?;
    RhFactor::parse(&raw).ok_or_else(|| conversion_error(column, format!("unknown Rh factor {:?}", raw)))
}

pub(crate) fn get_status(row: &Row, column: usize) -> rusqlite::Result<RequestStatus> {
    let raw: String = row.get(column)?;
    RequestStatus::parse(&raw)
        .ok_or_else(|| conversion_error(column, format!("unknown request status {:?}", raw)))
}

pub(crate) fn get_datetime(row: &Row, column: usize) -> rusqlite::Result<chrono::NaiveDateTime> {
    let raw: String = row.get(column)?;
    crate::db::parse_datetime_column(&raw, column)
}
