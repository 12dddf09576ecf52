pub mod admin;
pub mod capture;
pub mod charge;
pub mod root;
pub mod vouchers;

use axum::{http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Bare `OPTIONS` answer. Real preflights are handled by the CORS layer first.
pub async fn preflight() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Required id field from a request body.
pub(crate) fn required_id(field: &str, value: Option<&str>) -> Result<Uuid> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{} is required", field)))?;

    Uuid::parse_str(value)
        .map_err(|_| AppError::Validation(format!("{} is not a valid id", field)))
}
