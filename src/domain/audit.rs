use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const EVENT_PAYMENT_CAPTURED: &str = "payment_captured";
pub const EVENT_BOOKING_CHARGED: &str = "booking_charged";
pub const EVENT_VOUCHER_SESSION_USED: &str = "voucher_session_used";
pub const EVENT_OPERATOR_PROVISIONED: &str = "operator_provisioned";

/// Append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub subject_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub actor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub subject_id: String,
    pub event_type: &'static str,
    pub payload: serde_json::Value,
    pub actor_id: Option<String>,
}

impl NewAuditEntry {
    pub fn new(subject_id: impl Into<String>, event_type: &'static str, payload: serde_json::Value) -> Self {
        Self {
            subject_id: subject_id.into(),
            event_type,
            payload,
            actor_id: None,
        }
    }

    pub fn with_actor(mut self, actor_id: Option<String>) -> Self {
        self.actor_id = actor_id;
        self
    }
}
