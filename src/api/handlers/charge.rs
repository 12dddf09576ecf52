use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    api::{handlers::required_id, state::AppState},
    domain::PaymentStatus,
    error::{AppError, Result},
    service::ChargeResult,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChargeBookingRequest {
    pub booking_id: Option<String>,
    /// Overrides the booking total when positive.
    pub amount_cents: Option<i64>,
    /// Forwarded to the processor so network retries do not double-charge.
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChargeBookingResponse {
    pub ok: bool,
    pub payment_intent: String,
    pub status: String,
    pub requires_action: bool,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChargeBookingError {
    pub ok: bool,
    pub error: String,
}

impl From<ChargeResult> for ChargeBookingResponse {
    fn from(result: ChargeResult) -> Self {
        Self {
            ok: true,
            requires_action: result.intent.requires_action(),
            payment_intent: result.intent.id,
            status: result.intent.status,
            payment_status: result.payment_status,
        }
    }
}

/// Charges a booking's saved payment method off-session.
#[utoipa::path(
    post,
    path = "/charge-booking",
    request_body = ChargeBookingRequest,
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "Used when the body carries no idempotency_key")
    ),
    responses(
        (status = 200, description = "Payment created and confirmed", body = ChargeBookingResponse),
        (status = 400, description = "Any failure", body = ChargeBookingError)
    ),
    tag = "Payments"
)]
pub async fn charge_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<ChargeBookingRequest>, JsonRejection>,
) -> std::result::Result<Json<ChargeBookingResponse>, (StatusCode, Json<ChargeBookingError>)> {
    match charge(&state, &headers, payload).await {
        Ok(result) => Ok(Json(result.into())),
        Err(err) => {
            err.log();
            Err((
                StatusCode::BAD_REQUEST,
                Json(ChargeBookingError {
                    ok: false,
                    error: err.public_message(),
                }),
            ))
        }
    }
}

async fn charge(
    state: &AppState,
    headers: &HeaderMap,
    payload: std::result::Result<Json<ChargeBookingRequest>, JsonRejection>,
) -> Result<ChargeResult> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let booking_id = required_id("booking_id", request.booking_id.as_deref())?;

    let idempotency_key = request
        .idempotency_key
        .or_else(|| {
            headers
                .get("Idempotency-Key")
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        })
        .filter(|key| !key.trim().is_empty());

    state
        .service_context
        .payment_service
        .charge_booking(booking_id, request.amount_cents, idempotency_key)
        .await
}
