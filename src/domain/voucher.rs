use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Prepaid session pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    pub id: Uuid,
    pub owner_id: Option<String>,
    pub code: String,
    pub total_sessions: i64,
    pub remaining_sessions: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVoucher {
    pub owner_id: Option<String>,
    pub code: String,
    pub total_sessions: i64,
    pub active: bool,
}

/// Who asked for a redemption, taken from the caller's bearer token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Option<String>,
    pub email: Option<String>,
}

/// Row returned by the atomic redemption procedure.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Redemption {
    pub redemption_id: Uuid,
    pub voucher_id: Uuid,
    pub remaining_sessions: i64,
    pub redeemed_at: DateTime<Utc>,
}
