//! Charge orchestrator used by front-end glue to charge a booking.
//!
//! It never returns an error: every failure resolves to a [`ChargeOutcome`]
//! with `ok == false` and a message suitable for showing to the user.

pub mod in_flight;
pub mod transport;

use argon2::password_hash::rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::FunctionsConfig,
    error::{AppError, Result},
};

pub use in_flight::{InFlightCharges, InFlightGuard};
pub use transport::{ChargeCall, ChargeTransport, HttpChargeTransport, TransportError, TransportReply};

pub const ERR_MISSING_BOOKING: &str = "booking id is required";
pub const ERR_IN_PROGRESS: &str = "charge already in progress";
pub const ERR_NOT_CONFIGURED: &str = "no charge endpoint configured";
pub const ERR_UNREADABLE_REPLY: &str = "charge endpoint returned an unreadable response";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeOutcome {
    pub ok: bool,
    pub status: Option<String>,
    pub payment_intent: Option<String>,
    pub error: Option<String>,
    pub requires_action: bool,
}

impl ChargeOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Normalizes whatever the endpoint answered.
    pub fn from_reply(reply: &TransportReply) -> Self {
        let body = &reply.body;
        let text = |field: &str| body.get(field).and_then(Value::as_str).map(str::to_string);

        let http_ok = (200..300).contains(&reply.status);
        if http_ok && !body.is_object() {
            return Self::failure(ERR_UNREADABLE_REPLY);
        }

        let ok = http_ok && body.get("ok").and_then(Value::as_bool).unwrap_or(http_ok);
        let status = text("status");
        let requires_action = body
            .get("requires_action")
            .and_then(Value::as_bool)
            .unwrap_or(false)
            || status.as_deref() == Some("requires_action");

        let error = if ok {
            None
        } else {
            Some(text("error").unwrap_or_else(|| format!("charge failed (HTTP {})", reply.status)))
        };

        Self {
            ok,
            status,
            payment_intent: text("payment_intent"),
            error,
            requires_action,
        }
    }
}

#[derive(Clone)]
pub struct ChargeOrchestrator {
    in_flight: Arc<InFlightCharges>,
    primary: Option<Arc<dyn ChargeTransport>>,
    fallback: Option<Arc<dyn ChargeTransport>>,
}

impl ChargeOrchestrator {
    /// Builds an orchestrator with its own in-flight set. Clones share it;
    /// separately built orchestrators only dedupe each other when given the
    /// same set through [`ChargeOrchestrator::with_in_flight`].
    pub fn new(
        primary: Option<Arc<dyn ChargeTransport>>,
        fallback: Option<Arc<dyn ChargeTransport>>,
    ) -> Self {
        Self {
            in_flight: InFlightCharges::new(),
            primary,
            fallback,
        }
    }

    pub fn from_config(config: &FunctionsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("http client: {}", e)))?;

        let primary = config.base_url.as_deref().map(|base_url| {
            Arc::new(HttpChargeTransport::functions(
                client.clone(),
                base_url,
                config.anon_key.clone(),
            )) as Arc<dyn ChargeTransport>
        });
        let fallback = config.fallback_url.as_deref().map(|url| {
            Arc::new(HttpChargeTransport::fallback(client.clone(), url)) as Arc<dyn ChargeTransport>
        });

        Ok(Self::new(primary, fallback))
    }

    /// Uses `in_flight` in place of this orchestrator's own set.
    pub fn with_in_flight(mut self, in_flight: Arc<InFlightCharges>) -> Self {
        self.in_flight = in_flight;
        self
    }

    pub fn in_flight(&self) -> &Arc<InFlightCharges> {
        &self.in_flight
    }

    pub async fn charge_booking(&self, booking_id: &str) -> ChargeOutcome {
        let booking_id = booking_id.trim();
        if booking_id.is_empty() {
            return ChargeOutcome::failure(ERR_MISSING_BOOKING);
        }

        let Some(_guard) = self.in_flight.try_acquire(booking_id) else {
            tracing::warn!("Charge for booking {} already in progress", booking_id);
            return ChargeOutcome::failure(ERR_IN_PROGRESS);
        };

        let call = ChargeCall {
            booking_id: booking_id.to_string(),
            idempotency_key: new_idempotency_key(),
        };

        match self.dispatch(&call).await {
            Ok(reply) => {
                let outcome = ChargeOutcome::from_reply(&reply);
                tracing::info!(
                    "Charge for booking {} finished: ok={} status={:?}",
                    booking_id,
                    outcome.ok,
                    outcome.status
                );
                outcome
            }
            Err(error) => {
                tracing::error!("Charge for booking {} failed: {}", booking_id, error);
                ChargeOutcome::failure(error)
            }
        }
    }

    async fn dispatch(&self, call: &ChargeCall) -> std::result::Result<TransportReply, String> {
        let transports: Vec<&Arc<dyn ChargeTransport>> =
            [self.primary.as_ref(), self.fallback.as_ref()]
                .into_iter()
                .flatten()
                .collect();

        if transports.is_empty() {
            return Err(ERR_NOT_CONFIGURED.to_string());
        }

        let mut last_error = String::new();
        for transport in transports {
            match transport.send(call).await {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    tracing::warn!("Charge transport {} failed: {}", transport.name(), e);
                    last_error = e.to_string();
                }
            }
        }

        Err(last_error)
    }
}

/// Fresh token per charge attempt: a random UUID, or a time-based token when
/// the OS random source is unavailable.
pub fn new_idempotency_key() -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => uuid::Builder::from_random_bytes(bytes).into_uuid().to_string(),
        Err(_) => time_based_key(),
    }
}

fn time_based_key() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default();
    format!(
        "charge-{:x}-{:x}-{:x}",
        nanos,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}
