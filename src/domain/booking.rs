use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    /// Total price in minor currency units.
    pub importe_total: i64,
    pub currency: String,
    pub stripe_customer_id: Option<String>,
    /// Saved payment method used for off-session charges.
    pub stripe_payment_method_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub stripe_session_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub amount_captured: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    pub customer_name: String,
    pub customer_email: String,
    pub importe_total: i64,
    pub currency: String,
    pub stripe_customer_id: Option<String>,
    pub stripe_payment_method_id: Option<String>,
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    CapturadoParcial,
    CapturadoTotal,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::CapturadoParcial => "capturado_parcial",
            PaymentStatus::CapturadoTotal => "capturado_total",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "paid" => Some(PaymentStatus::Paid),
            "capturado_parcial" => Some(PaymentStatus::CapturadoParcial),
            "capturado_total" => Some(PaymentStatus::CapturadoTotal),
            _ => None,
        }
    }

    /// States a booking may hold before moving to `self`.
    ///
    /// Status only ever moves forward. Re-applying the current state is allowed
    /// so that replayed (idempotent) processor responses still succeed.
    pub fn allowed_predecessors(&self) -> &'static [PaymentStatus] {
        match self {
            PaymentStatus::Unpaid => &[PaymentStatus::Unpaid],
            PaymentStatus::CapturadoParcial => {
                &[PaymentStatus::Unpaid, PaymentStatus::CapturadoParcial]
            }
            PaymentStatus::Paid => &[
                PaymentStatus::Unpaid,
                PaymentStatus::CapturadoParcial,
                PaymentStatus::Paid,
            ],
            PaymentStatus::CapturadoTotal => &[
                PaymentStatus::Unpaid,
                PaymentStatus::CapturadoParcial,
                PaymentStatus::CapturadoTotal,
            ],
        }
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        next.allowed_predecessors().contains(self)
    }

    /// Classifies a capture by comparing what the processor received against
    /// the reservation total.
    pub fn for_capture(amount_received: i64, importe_total: i64) -> Self {
        if amount_received >= importe_total {
            PaymentStatus::CapturadoTotal
        } else {
            PaymentStatus::CapturadoParcial
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_and_partial_capture() {
        assert_eq!(PaymentStatus::for_capture(1000, 1000), PaymentStatus::CapturadoTotal);
        assert_eq!(PaymentStatus::for_capture(400, 1000), PaymentStatus::CapturadoParcial);
        assert_eq!(PaymentStatus::for_capture(1200, 1000), PaymentStatus::CapturadoTotal);
    }

    #[test]
    fn status_never_regresses() {
        use PaymentStatus::*;

        assert!(Unpaid.can_transition_to(Paid));
        assert!(Unpaid.can_transition_to(CapturadoParcial));
        assert!(CapturadoParcial.can_transition_to(CapturadoTotal));
        assert!(CapturadoTotal.can_transition_to(CapturadoTotal));

        assert!(!Paid.can_transition_to(Unpaid));
        assert!(!CapturadoTotal.can_transition_to(CapturadoParcial));
        assert!(!CapturadoTotal.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(CapturadoTotal));
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            PaymentStatus::Unpaid,
            PaymentStatus::Paid,
            PaymentStatus::CapturadoParcial,
            PaymentStatus::CapturadoTotal,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::parse("refunded"), None);
    }
}
