// ==========================================
// Blood Bank Allocation - API errors
// ==========================================
// Maps repository / engine / import errors into caller-facing categories
// Every message carries the concrete reason
// ==========================================

use crate::engine::error::FulfillmentError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // Request errors
    // ==========================================
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state transition: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("conflict: {0}")]
    Conflict(String),

    // ==========================================
    // Dependency errors
    // ==========================================
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("database connection failed: {0}")]
    DatabaseConnectionError(String),

    #[error("import failed: {0}")]
    ImportError(String),

    // ==========================================
    // General
    // ==========================================
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("lock acquisition failed: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::Conflict(format!("unique constraint violated: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::InvalidInput(format!("foreign key constraint violated: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::InvalidInput(format!("check constraint violated: {}", msg))
            }
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            RepositoryError::ValidationError(msg) => ApiError::InvalidInput(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("field {}: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        match err {
            FulfillmentError::RequestNotFound(id) => {
                ApiError::NotFound(format!("blood_request(id={})", id))
            }
            FulfillmentError::InvalidRequestState { status, .. } => {
                ApiError::InvalidStateTransition {
                    from: status.to_string(),
                    to: "Confirmed".to_string(),
                }
            }
            FulfillmentError::FulfillmentInProgress(id) => {
                ApiError::Conflict(format!("request {} is already being fulfilled", id))
            }
            FulfillmentError::ProviderUnavailable(e) => ApiError::ServiceUnavailable(e.to_string()),
            FulfillmentError::Config(msg) => ApiError::ServiceUnavailable(msg),
            FulfillmentError::Repository(e) => e.into(),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(path) => ApiError::NotFound(path),
            ImportError::Repository(e) => e.into(),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
