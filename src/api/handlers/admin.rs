use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{Operator, OperatorRole},
    error::{AppError, Result},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    /// `admin` (default) or `staff`.
    pub role: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<OperatorRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

type AdminReply = std::result::Result<Json<AdminResponse>, (StatusCode, Json<AdminResponse>)>;

fn reply(result: Result<Operator>) -> AdminReply {
    match result {
        Ok(operator) => Ok(Json(AdminResponse {
            success: true,
            user_id: Some(operator.id),
            role: Some(operator.role),
            error: None,
        })),
        Err(err) => {
            err.log();
            Err((
                StatusCode::BAD_REQUEST,
                Json(AdminResponse {
                    success: false,
                    user_id: None,
                    role: None,
                    error: Some(err.public_message()),
                }),
            ))
        }
    }
}

fn parse_role(role: Option<&str>) -> Result<OperatorRole> {
    match role {
        None => Ok(OperatorRole::default()),
        Some(role) => OperatorRole::parse(role)
            .ok_or_else(|| AppError::Validation("role must be admin or staff".to_string())),
    }
}

fn unpack(payload: std::result::Result<Json<AdminRequest>, JsonRejection>) -> Result<(String, AdminRequest)> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let email = request
        .email
        .clone()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AppError::Validation("email is required".to_string()))?;
    Ok((email, request))
}

/// Creates an operator account for an allow-listed address.
#[utoipa::path(
    post,
    path = "/create-admin",
    request_body = AdminRequest,
    responses(
        (status = 200, description = "Account created or updated", body = AdminResponse),
        (status = 400, description = "Rejected", body = AdminResponse)
    ),
    tag = "Admin"
)]
pub async fn create_admin(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AdminRequest>, JsonRejection>,
) -> AdminReply {
    let result: Result<Operator> = async {
        let (email, request) = unpack(payload)?;
        let role = parse_role(request.role.as_deref())?;
        let password = request
            .password
            .ok_or_else(|| AppError::Validation("password is required".to_string()))?;

        state
            .service_context
            .admin_service
            .create_operator(&email, &password, role)
            .await
    }
    .await;

    reply(result)
}

/// Elevates an existing operator account.
#[utoipa::path(
    post,
    path = "/elevate-admin",
    request_body = AdminRequest,
    responses(
        (status = 200, description = "Role updated", body = AdminResponse),
        (status = 400, description = "Rejected", body = AdminResponse)
    ),
    tag = "Admin"
)]
pub async fn elevate_admin(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AdminRequest>, JsonRejection>,
) -> AdminReply {
    let result: Result<Operator> = async {
        let (email, request) = unpack(payload)?;
        let role = parse_role(request.role.as_deref())?;

        state
            .service_context
            .admin_service
            .elevate_operator(&email, role, request.password.as_deref())
            .await
    }
    .await;

    reply(result)
}
