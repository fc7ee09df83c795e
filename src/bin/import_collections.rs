// Seeds donation_unit from a CSV of collection records.
//
// Usage:
//   cargo run --bin import_collections -- <csv_path> [db_path]
//
// Rows that fail validation are skipped and listed in the report.

use blood_bank_allocation::db::{default_db_path, init_schema, open_sqlite_connection};
use blood_bank_allocation::importer::CollectionImporter;
use blood_bank_allocation::logging;
use blood_bank_allocation::repository::DonationUnitRepository;
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let csv_path = args
        .next()
        .ok_or("usage: import_collections <csv_path> [db_path]")?;
    let db_path = args.next().unwrap_or_else(default_db_path);

    {
        let conn = open_sqlite_connection(&db_path)?;
        init_schema(&conn)?;
    }

    let unit_repo = Arc::new(DonationUnitRepository::new(&db_path)?);
    let importer = CollectionImporter::new(unit_repo);
    let report = importer.import_file(Path::new(&csv_path))?;

    println!("imported={} skipped={}", report.imported, report.skipped.len());
    for row in &report.skipped {
        println!("  row {}: {}", row.row_number, row.reason);
    }
    Ok(())
}
