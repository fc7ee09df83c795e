// ==========================================
// Blood Bank Allocation - Import errors
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    // ===== File level =====
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported file format: {0} (expected .csv)")]
    UnsupportedFormat(String),

    #[error("CSV parse error: {0}")]
    CsvParseError(String),

    #[error("missing required column: {0}")]
    MissingColumn(String),

    // ===== Storage =====
    #[error("repository error: {0}")]
    Repository(#[from] crate::repository::RepositoryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

pub type ImportResult<T> = Result<T, ImportError>;
