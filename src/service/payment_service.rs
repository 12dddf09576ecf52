use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{NewAuditEntry, PaymentStatus, EVENT_BOOKING_CHARGED, EVENT_PAYMENT_CAPTURED},
    error::{AppError, Result},
    payments::{
        capture_idempotency_key, CaptureRequest, IntentSnapshot, OffSessionCharge,
        PaymentProcessor,
    },
    repository::{AuditLogRepository, BookingRepository},
};

#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub intent: IntentSnapshot,
    /// Status stored on the reservation after the call.
    pub payment_status: PaymentStatus,
    /// `false` when the booking was already further along and was left untouched.
    pub status_applied: bool,
}

#[derive(Debug, Clone)]
pub struct ChargeResult {
    pub intent: IntentSnapshot,
    pub payment_status: PaymentStatus,
}

pub struct PaymentService {
    booking_repo: Arc<dyn BookingRepository>,
    audit_repo: Arc<dyn AuditLogRepository>,
    processor: Option<Arc<dyn PaymentProcessor>>,
}

impl PaymentService {
    pub fn new(
        booking_repo: Arc<dyn BookingRepository>,
        audit_repo: Arc<dyn AuditLogRepository>,
        processor: Option<Arc<dyn PaymentProcessor>>,
    ) -> Self {
        Self {
            booking_repo,
            audit_repo,
            processor,
        }
    }

    fn processor(&self) -> Result<&Arc<dyn PaymentProcessor>> {
        self.processor
            .as_ref()
            .ok_or_else(|| AppError::Configuration("stripe.secret_key".to_string()))
    }

    /// Captures a previously authorized payment, fully or partially.
    pub async fn capture(&self, reserva_id: Uuid, amount_to_capture: Option<f64>) -> Result<CaptureOutcome> {
        let booking = self
            .booking_repo
            .find_by_id(reserva_id)
            .await?
            .ok_or_else(|| AppError::NotFound("reservation not found".to_string()))?;

        let payment_intent_id = booking.payment_intent_id.clone().ok_or_else(|| {
            AppError::BadRequest("reservation has no payment intent to capture".to_string())
        })?;

        let amount = capture_amount(amount_to_capture)?;
        let processor = self.processor()?;

        let intent = processor
            .capture(CaptureRequest {
                payment_intent_id,
                amount_to_capture: amount,
                idempotency_key: capture_idempotency_key(reserva_id, amount),
            })
            .await?;

        let captured_status = PaymentStatus::for_capture(intent.amount_received, booking.importe_total);
        let status_applied = self
            .booking_repo
            .record_capture(reserva_id, intent.amount_received, captured_status)
            .await?;

        let payment_status = if status_applied {
            tracing::info!(
                "Captured {} on reservation {} ({})",
                intent.amount_received,
                reserva_id,
                captured_status
            );
            captured_status
        } else {
            // Report what is stored, not the state that was refused.
            let current = self
                .booking_repo
                .find_by_id(reserva_id)
                .await?
                .map(|b| b.payment_status)
                .unwrap_or(booking.payment_status);
            tracing::warn!(
                "Reservation {} is {}; not moving it to {}",
                reserva_id,
                current,
                captured_status
            );
            current
        };

        self.audit_repo
            .append(NewAuditEntry::new(
                reserva_id.to_string(),
                EVENT_PAYMENT_CAPTURED,
                json!({
                    "payment_intent": intent.id,
                    "requested_amount": amount,
                    "amount_received": intent.amount_received,
                    "importe_total": booking.importe_total,
                    "processor_status": intent.status,
                    "captured_status": captured_status,
                    "payment_status": payment_status,
                    "status_applied": status_applied,
                }),
            ))
            .await?;

        Ok(CaptureOutcome {
            intent,
            payment_status,
            status_applied,
        })
    }

    /// Charges a booking's saved payment method without the cardholder present.
    pub async fn charge_booking(
        &self,
        booking_id: Uuid,
        amount_cents: Option<i64>,
        idempotency_key: Option<String>,
    ) -> Result<ChargeResult> {
        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;

        if booking.payment_status != PaymentStatus::Unpaid {
            return Err(AppError::Conflict(format!(
                "booking is already paid ({})",
                booking.payment_status
            )));
        }

        let payment_method_id = booking.stripe_payment_method_id.clone().ok_or_else(|| {
            AppError::BadRequest(
                "booking has no saved payment method; an off-session charge is not possible"
                    .to_string(),
            )
        })?;

        let amount = amount_cents
            .filter(|amount| *amount > 0)
            .unwrap_or(booking.importe_total);
        if amount <= 0 {
            return Err(AppError::Validation("charge amount must be positive".to_string()));
        }

        let processor = self.processor()?;
        let intent = processor
            .charge_off_session(OffSessionCharge {
                booking_id,
                amount,
                currency: booking.currency.clone(),
                customer_id: booking.stripe_customer_id.clone(),
                payment_method_id,
                idempotency_key,
            })
            .await?;

        let payment_status = if intent.is_settled() {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        };

        let applied = self
            .booking_repo
            .record_charge(booking_id, &intent.id, payment_status)
            .await?;
        if !applied {
            tracing::warn!("Booking {} changed state while it was being charged", booking_id);
        }

        if intent.requires_action() {
            tracing::warn!("Charge {} for booking {} requires customer action", intent.id, booking_id);
        } else {
            tracing::info!("Charged {} on booking {} ({})", amount, booking_id, intent.status);
        }

        self.audit_repo
            .append(NewAuditEntry::new(
                booking_id.to_string(),
                EVENT_BOOKING_CHARGED,
                json!({
                    "payment_intent": intent.id,
                    "amount": amount,
                    "processor_status": intent.status,
                    "payment_status": payment_status,
                }),
            ))
            .await?;

        Ok(ChargeResult {
            intent,
            payment_status,
        })
    }
}

/// Integer minor units to capture. Absent, non-finite or non-positive input
/// means "capture everything that was authorized".
pub fn capture_amount(requested: Option<f64>) -> Result<Option<i64>> {
    match requested {
        Some(amount) if amount.is_finite() && amount > 0.0 => {
            let rounded = amount.round() as i64;
            if rounded < 1 {
                return Err(AppError::Validation(
                    "amount_to_capture rounds to zero".to_string(),
                ));
            }
            Ok(Some(rounded))
        }
        _ => Ok(None),
    }
}
