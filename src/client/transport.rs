use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Body sent to a charge endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeCall {
    pub booking_id: String,
    pub idempotency_key: String,
}

#[derive(Debug, Clone)]
pub struct TransportReply {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0} request failed: {1}")]
    Request(&'static str, String),

    #[error("{0} endpoint unavailable (HTTP {1})")]
    Unavailable(&'static str, u16),
}

/// One way of reaching the charge-booking function.
#[async_trait]
pub trait ChargeTransport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `Err` only when the endpoint could not give an answer: the
    /// orchestrator moves on to the next transport then. Domain failures come
    /// back as `Ok` with a non-2xx status.
    async fn send(&self, call: &ChargeCall) -> Result<TransportReply, TransportError>;
}

pub struct HttpChargeTransport {
    name: &'static str,
    client: reqwest::Client,
    url: String,
    anon_key: Option<String>,
}

impl HttpChargeTransport {
    /// Hosted functions path: `{base_url}/charge-booking`, authenticated with the anon key.
    pub fn functions(client: reqwest::Client, base_url: &str, anon_key: Option<String>) -> Self {
        Self {
            name: "functions",
            client,
            url: format!("{}/charge-booking", base_url.trim_end_matches('/')),
            anon_key,
        }
    }

    /// Secondary endpoint, called as-is.
    pub fn fallback(client: reqwest::Client, url: &str) -> Self {
        Self {
            name: "fallback",
            client,
            url: url.to_string(),
            anon_key: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChargeTransport for HttpChargeTransport {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn send(&self, call: &ChargeCall) -> Result<TransportReply, TransportError> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Idempotency-Key", &call.idempotency_key)
            .json(call);

        if let Some(key) = &self.anon_key {
            request = request.bearer_auth(key).header("apikey", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Request(self.name, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status.is_server_error() {
            return Err(TransportError::Unavailable(self.name, status.as_u16()));
        }

        // A reply that is not JSON still carries its status.
        let body = response.json::<Value>().await.unwrap_or(Value::Null);

        Ok(TransportReply {
            status: status.as_u16(),
            body,
        })
    }
}
