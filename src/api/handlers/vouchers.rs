use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    api::{handlers::required_id, state::AppState},
    auth::actor_from_authorization,
    domain::Redemption,
    error::{AppError, Result},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UseVoucherSessionRequest {
    pub voucher_id: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UseVoucherSessionResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub redemption: Redemption,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VoucherError {
    pub ok: bool,
    pub error: String,
}

/// Status code for a rejected redemption, chosen from the message text.
pub fn redemption_error_status(message: &str) -> StatusCode {
    let message = message.to_lowercase();
    if message.contains("no remaining") {
        StatusCode::CONFLICT
    } else if message.contains("not active") || message.contains("permission") {
        StatusCode::FORBIDDEN
    } else {
        StatusCode::BAD_REQUEST
    }
}

/// Uses one session of a prepaid voucher.
#[utoipa::path(
    post,
    path = "/use-voucher-session",
    request_body = UseVoucherSessionRequest,
    params(
        ("Authorization" = Option<String>, Header, description = "Bearer token identifying the caller")
    ),
    responses(
        (status = 200, description = "Session used", body = UseVoucherSessionResponse),
        (status = 400, description = "Invalid request", body = VoucherError),
        (status = 403, description = "Voucher inactive or caller not permitted", body = VoucherError),
        (status = 409, description = "No sessions left", body = VoucherError)
    ),
    tag = "Vouchers"
)]
pub async fn use_voucher_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<UseVoucherSessionRequest>, JsonRejection>,
) -> std::result::Result<Json<UseVoucherSessionResponse>, (StatusCode, Json<VoucherError>)> {
    match redeem(&state, &headers, payload).await {
        Ok(redemption) => Ok(Json(UseVoucherSessionResponse {
            ok: true,
            redemption,
        })),
        Err(err) => {
            err.log();
            let error = err.public_message();
            Err((
                redemption_error_status(&error),
                Json(VoucherError { ok: false, error }),
            ))
        }
    }
}

async fn redeem(
    state: &AppState,
    headers: &HeaderMap,
    payload: std::result::Result<Json<UseVoucherSessionRequest>, JsonRejection>,
) -> Result<Redemption> {
    let actor = actor_from_authorization(
        headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok()),
    );

    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let voucher_id = required_id("voucher_id", request.voucher_id.as_deref())?;

    state
        .service_context
        .voucher_service
        .redeem(voucher_id, request.note, &actor)
        .await
}
