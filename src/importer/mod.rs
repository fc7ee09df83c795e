// ==========================================
// Blood Bank Allocation - Import layer
// ==========================================
// External collection records -> donation_unit
// ==========================================

pub mod collection_importer;
pub mod error;

pub use collection_importer::{CollectionImportReport, CollectionImporter, SkippedRow};
pub use error::{ImportError, ImportResult};
