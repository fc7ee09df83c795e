// ==========================================
// Blood Bank Allocation - Collection record importer
// ==========================================
// Loads collection records from CSV into donation_unit
// Required columns: unit_key, donor_id, blood_type, remaining_volume, collected_at
// Optional columns: collection_successful (default true), unit_serial_number
// Bad rows are skipped and reported, never fatal
// ==========================================

use crate::db::now_utc;
use crate::domain::donation::DonationUnit;
use crate::domain::types::BloodType;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::DonationUnitRepository;
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const REQUIRED_COLUMNS: [&str; 5] = [
    "unit_key",
    "donor_id",
    "blood_type",
    "remaining_volume",
    "collected_at",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// 1-based data row number (header excluded)
    pub row_number: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionImportReport {
    pub imported: usize,
    pub skipped: Vec<SkippedRow>,
}

pub struct CollectionImporter {
    unit_repo: Arc<DonationUnitRepository>,
}

impl CollectionImporter {
    pub fn new(unit_repo: Arc<DonationUnitRepository>) -> Self {
        Self { unit_repo }
    }

    /// Imports a .csv file
    pub fn import_file(&self, path: &Path) -> ImportResult<CollectionImportReport> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        if let Some(ext) = path.extension() {
            if ext != "csv" {
                return Err(ImportError::UnsupportedFormat(ext.to_string_lossy().to_string()));
            }
        }

        let file = File::open(path)?;
        self.import_reader(file)
    }

    /// Imports CSV content from any reader
    pub fn import_reader<R: Read>(&self, reader: R) -> ImportResult<CollectionImportReport> {
        let units = parse_collections(reader)?;
        let now = now_utc();

        let mut report = CollectionImportReport {
            skipped: units.skipped,
            ..Default::default()
        };

        for unit in &units.parsed {
            self.unit_repo.upsert(unit, now)?;
            report.imported += 1;
        }

        info!(
            imported = report.imported,
            skipped = report.skipped.len(),
            "collection import finished"
        );

        Ok(report)
    }
}

pub(crate) struct ParsedCollections {
    pub parsed: Vec<DonationUnit>,
    pub skipped: Vec<SkippedRow>,
}

pub(crate) fn parse_collections<R: Read>(reader: R) -> ImportResult<ParsedCollections> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(ImportError::MissingColumn(column.to_string()));
        }
    }

    let mut parsed = Vec::new();
    let mut skipped = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let row_number = idx + 1;
        let record = record?;

        let row: HashMap<&str, &str> = headers
            .iter()
            .map(String::as_str)
            .zip(record.iter())
            .collect();

        if row.values().all(|v| v.is_empty()) {
            continue;
        }

        match parse_row(&row) {
            Ok(unit) => parsed.push(unit),
            Err(reason) => {
                warn!(row_number, reason = %reason, "collection row skipped");
                skipped.push(SkippedRow { row_number, reason });
            }
        }
    }

    Ok(ParsedCollections { parsed, skipped })
}

fn parse_row(row: &HashMap<&str, &str>) -> Result<DonationUnit, String> {
    let field = |name: &str| -> Result<&str, String> {
        match row.get(name) {
            Some(v) if !v.is_empty() => Ok(*v),
            _ => Err(format!("{} is empty", name)),
        }
    };

    let blood_type: BloodType = field("blood_type")?
        .parse()
        .map_err(|e: crate::domain::ParseBloodTypeError| e.to_string())?;

    let remaining_raw = field("remaining_volume")?;
    let remaining_volume = remaining_raw
        .parse::<u32>()
        .map_err(|_| format!("remaining_volume {:?} is not a non-negative integer", remaining_raw))?;

    let collected_raw = field("collected_at")?;
    let collected_at = parse_timestamp(collected_raw)
        .ok_or_else(|| format!("collected_at {:?} is not a timestamp", collected_raw))?;

    let collection_successful = match row.get("collection_successful").copied() {
        None | Some("") => true,
        Some(raw) => parse_bool(raw).ok_or_else(|| format!("collection_successful {:?} is not a boolean", raw))?,
    };

    let unit_serial_number = row
        .get("unit_serial_number")
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string());

    Ok(DonationUnit {
        unit_key: field("unit_key")?.to_string(),
        donor_id: field("donor_id")?.to_string(),
        blood_type,
        remaining_volume,
        collected_at,
        collection_successful,
        unit_serial_number,
    })
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_and_invalid_rows() {
        let csv = "\
unit_key,donor_id,blood_type,remaining_volume,collected_at,collection_successful,unit_serial_number
BC-1,D-1,O+,2,2026-03-01 08:30:00,true,SN-001
BC-2,D-2,Q+,2,2026-03-01 08:30:00,true,
BC-3,D-3,A-,-1,2026-03-01,true,
BC-4,D-4,AB-,1,2026-03-02,no,
,,,,,,
";
        let parsed = parse_collections(csv.as_bytes()).unwrap();

        assert_eq!(parsed.parsed.len(), 2);
        assert_eq!(parsed.parsed[0].unit_serial_number.as_deref(), Some("SN-001"));
        assert!(!parsed.parsed[1].collection_successful);
        assert_eq!(parsed.parsed[1].collected_at.format("%H:%M").to_string(), "00:00");

        let skipped_rows: Vec<usize> = parsed.skipped.iter().map(|s| s.row_number).collect();
        assert_eq!(skipped_rows, vec![2, 3]);
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "unit_key,donor_id,blood_type,collected_at\nBC-1,D-1,O+,2026-03-01\n";
        let err = parse_collections(csv.as_bytes()).err().unwrap();
        assert!(matches!(err, ImportError::MissingColumn(ref c) if c == "remaining_volume"));
    }

    #[test]
    fn test_optional_success_column_defaults_true() {
        let csv = "unit_key,donor_id,blood_type,remaining_volume,collected_at\nBC-9,D-9,B+,4,2026-03-01T10:00:00\n";
        let parsed = parse_collections(csv.as_bytes()).unwrap();
        assert_eq!(parsed.parsed.len(), 1);
        assert!(parsed.parsed[0].collection_successful);
    }
}
