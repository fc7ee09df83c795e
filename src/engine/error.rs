// ==========================================
// Blood Bank Allocation - Engine errors
// ==========================================
// Fatal errors of a fulfillment call; all of them abort before any mutation.
// Per-unit commit problems are CommitFailure values, never errors.
// ==========================================

use crate::domain::types::RequestStatus;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// Inventory snapshot could not be obtained
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("inventory provider unavailable: {0}")]
    Unavailable(String),
}

impl From<RepositoryError> for ProviderError {
    fn from(err: RepositoryError) -> Self {
        ProviderError::Unavailable(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum FulfillmentError {
    #[error("blood request not found: request_id={0}")]
    RequestNotFound(i64),

    #[error(transparent)]
    ProviderUnavailable(#[from] ProviderError),

    #[error("request {request_id} cannot be fulfilled in status {status}")]
    InvalidRequestState {
        request_id: i64,
        status: RequestStatus,
    },

    #[error("request {0} is already being fulfilled")]
    FulfillmentInProgress(i64),

    #[error("configuration unavailable: {0}")]
    Config(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type FulfillmentOutcome<T> = Result<T, FulfillmentError>;
