// ==========================================
// Blood Bank Allocation - API layer
// ==========================================

pub mod error;
pub mod request_api;

pub use error::{ApiError, ApiResult};
pub use request_api::RequestApi;
