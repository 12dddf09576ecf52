use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

pub mod stripe_client;

pub use stripe_client::StripeProcessor;

/// Local mirror of the processor's payment intent. The processor stays the
/// source of truth; this is only what a handler needs to update its rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentSnapshot {
    pub id: String,
    pub status: String,
    pub amount: i64,
    pub amount_received: i64,
    pub amount_capturable: i64,
}

impl IntentSnapshot {
    pub fn requires_action(&self) -> bool {
        self.status == "requires_action"
    }

    /// Funds are captured or on their way.
    pub fn is_settled(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "processing")
    }
}

#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub payment_intent_id: String,
    /// `None` captures the full authorized amount.
    pub amount_to_capture: Option<i64>,
    pub idempotency_key: String,
}

#[derive(Debug, Clone)]
pub struct OffSessionCharge {
    pub booking_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub customer_id: Option<String>,
    pub payment_method_id: String,
    pub idempotency_key: Option<String>,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn capture(&self, request: CaptureRequest) -> Result<IntentSnapshot>;
    /// Creates and immediately confirms a payment against a saved method.
    async fn charge_off_session(&self, charge: OffSessionCharge) -> Result<IntentSnapshot>;
}

/// Idempotency key for a capture. Depends only on its inputs, so the same
/// request sent twice maps to a single capture at the processor.
pub fn capture_idempotency_key(reserva_id: Uuid, amount_to_capture: Option<i64>) -> String {
    match amount_to_capture {
        Some(amount) => format!("capture:{}:{}", reserva_id, amount),
        None => format!("capture:{}:full", reserva_id),
    }
}
