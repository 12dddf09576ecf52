use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    api::{handlers::required_id, state::AppState},
    domain::PaymentStatus,
    error::{AppError, Result},
    service::CaptureOutcome,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CapturePaymentRequest {
    pub reserva_id: Option<String>,
    /// Minor units. Omit (or send a non-positive value) to capture everything authorized.
    pub amount_to_capture: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CapturePaymentResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_received: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<CaptureOutcome> for CapturePaymentResponse {
    fn from(outcome: CaptureOutcome) -> Self {
        Self {
            ok: true,
            payment_intent: Some(outcome.intent.id),
            status: Some(outcome.intent.status),
            amount_received: Some(outcome.intent.amount_received),
            payment_status: Some(outcome.payment_status),
            error: None,
        }
    }
}

impl CapturePaymentResponse {
    fn failure(error: String) -> Self {
        Self {
            ok: false,
            payment_intent: None,
            status: None,
            amount_received: None,
            payment_status: None,
            error: Some(error),
        }
    }
}

/// Captures an authorized payment for a reservation.
///
/// Failures are reported in-band: the status code is 200 and `ok` is false.
#[utoipa::path(
    post,
    path = "/capture-payment",
    request_body = CapturePaymentRequest,
    responses(
        (status = 200, description = "Capture result, including in-band failures", body = CapturePaymentResponse)
    ),
    tag = "Payments"
)]
pub async fn capture_payment(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CapturePaymentRequest>, JsonRejection>,
) -> (StatusCode, Json<CapturePaymentResponse>) {
    match capture(&state, payload).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome.into())),
        Err(err) => {
            err.log();
            (StatusCode::OK, Json(CapturePaymentResponse::failure(err.public_message())))
        }
    }
}

async fn capture(
    state: &AppState,
    payload: std::result::Result<Json<CapturePaymentRequest>, JsonRejection>,
) -> Result<CaptureOutcome> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let reserva_id = required_id("reserva_id", request.reserva_id.as_deref())?;

    state
        .service_context
        .payment_service
        .capture(reserva_id, request.amount_to_capture)
        .await
}
