use async_trait::async_trait;
use std::collections::HashMap;
use stripe::{
    CapturePaymentIntent, Client, CreatePaymentIntent, Currency, CustomerId, PaymentIntent,
    PaymentIntentId, PaymentIntentOffSession, PaymentMethodId, RequestStrategy,
};

use crate::{
    error::{AppError, Result},
    payments::{CaptureRequest, IntentSnapshot, OffSessionCharge, PaymentProcessor},
};

pub struct StripeProcessor {
    client: Client,
}

impl StripeProcessor {
    pub fn new(secret_key: String) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }

    fn client_with_key(&self, idempotency_key: Option<String>) -> Client {
        match idempotency_key {
            Some(key) => self.client.clone().with_strategy(RequestStrategy::Idempotent(key)),
            None => self.client.clone(),
        }
    }

    /// Reads the fields we mirror from the serialized intent.
    fn snapshot(intent: &PaymentIntent) -> Result<IntentSnapshot> {
        let value = serde_json::to_value(intent)
            .map_err(|e| AppError::External(format!("Unreadable payment intent: {}", e)))?;
        let int = |field: &str| value.get(field).and_then(|v| v.as_i64()).unwrap_or(0);

        Ok(IntentSnapshot {
            id: intent.id.to_string(),
            status: value
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
            amount: int("amount"),
            amount_received: int("amount_received"),
            amount_capturable: int("amount_capturable"),
        })
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    async fn capture(&self, request: CaptureRequest) -> Result<IntentSnapshot> {
        let intent_id: PaymentIntentId = request
            .payment_intent_id
            .parse()
            .map_err(|_| AppError::BadRequest(format!("Invalid payment intent id: {}", request.payment_intent_id)))?;

        let params = CapturePaymentIntent {
            amount_to_capture: request.amount_to_capture.map(|amount| amount as _),
            ..Default::default()
        };

        let client = self.client_with_key(Some(request.idempotency_key));
        let intent = PaymentIntent::capture(&client, &intent_id, params).await?;

        tracing::debug!("Stripe capture returned {} for {}", intent.id, request.payment_intent_id);
        Self::snapshot(&intent)
    }

    async fn charge_off_session(&self, charge: OffSessionCharge) -> Result<IntentSnapshot> {
        let currency: Currency = charge
            .currency
            .to_lowercase()
            .parse()
            .map_err(|_| AppError::Configuration(format!("unsupported currency {}", charge.currency)))?;
        let payment_method: PaymentMethodId = charge
            .payment_method_id
            .parse()
            .map_err(|_| AppError::BadRequest("Saved payment method id is invalid".to_string()))?;
        let customer: Option<CustomerId> = charge
            .customer_id
            .as_deref()
            .map(|id| id.parse())
            .transpose()
            .map_err(|_| AppError::BadRequest("Saved customer id is invalid".to_string()))?;

        let mut metadata = HashMap::new();
        metadata.insert("booking_id".to_string(), charge.booking_id.to_string());

        let mut params = CreatePaymentIntent::new(charge.amount, currency);
        params.customer = customer;
        params.payment_method = Some(payment_method);
        params.confirm = Some(true);
        params.off_session = Some(PaymentIntentOffSession::Exists(true));
        params.metadata = Some(metadata);

        let client = self.client_with_key(charge.idempotency_key);
        let intent = PaymentIntent::create(&client, params).await?;

        tracing::debug!("Stripe off-session charge {} for booking {}", intent.id, charge.booking_id);
        Self::snapshot(&intent)
    }
}
