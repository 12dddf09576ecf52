#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use reservas::{
    api,
    config::Settings,
    domain::{Booking, NewBooking},
    error::Result,
    payments::{CaptureRequest, IntentSnapshot, OffSessionCharge, PaymentProcessor},
    repository::BookingRepository,
    service::ServiceContext,
};

pub const ADMIN_EMAIL: &str = "duena@estudio.es";

/// In-memory database with migrations applied. A single connection keeps
/// every query on the same memory database.
pub async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    pool
}

/// Database file in a temporary directory, with several connections so
/// requests really run side by side. Keep the `TempDir` alive for the test.
pub async fn setup_file_pool(max_connections: u32) -> (SqlitePool, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("reservas.db"))
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(10));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .expect("file-backed sqlite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    (pool, dir)
}

/// Whether `hash` is the argon2 hash of `password`.
pub fn password_matches(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.admin.allowed_emails = vec![ADMIN_EMAIL.to_string(), "recepcion@estudio.es".to_string()];
    settings
}

pub struct TestApp {
    pub router: Router,
    pub ctx: Arc<ServiceContext>,
    pub processor: Arc<FakeProcessor>,
}

pub async fn test_app() -> TestApp {
    let processor = Arc::new(FakeProcessor::new());
    let app = test_app_with(Some(processor.clone() as Arc<dyn PaymentProcessor>)).await;
    TestApp {
        router: app.0,
        ctx: app.1,
        processor,
    }
}

/// Same as [`test_app`] but on a multi-connection, file-backed database.
pub async fn file_backed_app(max_connections: u32) -> (TestApp, TempDir) {
    let (pool, dir) = setup_file_pool(max_connections).await;
    let processor = Arc::new(FakeProcessor::new());
    let (router, ctx) = test_app_on(pool, Some(processor.clone() as Arc<dyn PaymentProcessor>));
    (TestApp { router, ctx, processor }, dir)
}

pub async fn test_app_with(processor: Option<Arc<dyn PaymentProcessor>>) -> (Router, Arc<ServiceContext>) {
    test_app_on(setup_pool().await, processor)
}

pub fn test_app_on(pool: SqlitePool, processor: Option<Arc<dyn PaymentProcessor>>) -> (Router, Arc<ServiceContext>) {
    let settings = test_settings();
    let ctx = Arc::new(ServiceContext::new(pool, processor, &settings));
    let router = api::create_app(ctx.clone(), Arc::new(settings));
    (router, ctx)
}

pub async fn post_json(router: &Router, uri: &str, body: Value, headers: &[(&str, &str)]) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();

    send(router, request).await
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub async fn create_booking(
    ctx: &ServiceContext,
    importe_total: i64,
    payment_method: Option<&str>,
    payment_intent: Option<&str>,
) -> Booking {
    ctx.booking_repo
        .create(NewBooking {
            customer_name: "Lucía Pérez".to_string(),
            customer_email: "lucia@example.com".to_string(),
            importe_total,
            currency: "eur".to_string(),
            stripe_customer_id: payment_method.map(|_| "cus_test".to_string()),
            stripe_payment_method_id: payment_method.map(str::to_string),
            payment_intent_id: payment_intent.map(str::to_string),
        })
        .await
        .unwrap()
}

/// Stand-in for Stripe. Captures honour idempotency keys the way the
/// processor does: a repeated key replays the stored result.
pub struct FakeProcessor {
    pub authorized_amount: Mutex<i64>,
    pub charge_status: Mutex<String>,
    pub captures_by_key: Mutex<HashMap<String, IntentSnapshot>>,
    pub capture_calls: AtomicUsize,
    pub charges: Mutex<Vec<OffSessionCharge>>,
}

impl FakeProcessor {
    pub fn new() -> Self {
        Self {
            authorized_amount: Mutex::new(1000),
            charge_status: Mutex::new("succeeded".to_string()),
            captures_by_key: Mutex::new(HashMap::new()),
            capture_calls: AtomicUsize::new(0),
            charges: Mutex::new(Vec::new()),
        }
    }

    pub fn set_charge_status(&self, status: &str) {
        *self.charge_status.lock().unwrap() = status.to_string();
    }

    pub fn distinct_captures(&self) -> usize {
        self.captures_by_key.lock().unwrap().len()
    }

    pub fn charge_count(&self) -> usize {
        self.charges.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    async fn capture(&self, request: CaptureRequest) -> Result<IntentSnapshot> {
        self.capture_calls.fetch_add(1, Ordering::SeqCst);

        let authorized = *self.authorized_amount.lock().unwrap();
        let mut captures = self.captures_by_key.lock().unwrap();
        let snapshot = captures
            .entry(request.idempotency_key.clone())
            .or_insert_with(|| IntentSnapshot {
                id: request.payment_intent_id.clone(),
                status: "succeeded".to_string(),
                amount: authorized,
                amount_received: request.amount_to_capture.unwrap_or(authorized),
                amount_capturable: 0,
            });

        Ok(snapshot.clone())
    }

    async fn charge_off_session(&self, charge: OffSessionCharge) -> Result<IntentSnapshot> {
        let status = self.charge_status.lock().unwrap().clone();
        let mut charges = self.charges.lock().unwrap();
        charges.push(charge.clone());

        Ok(IntentSnapshot {
            id: format!("pi_fake_{}", charges.len()),
            status: status.clone(),
            amount: charge.amount,
            amount_received: if status == "succeeded" { charge.amount } else { 0 },
            amount_capturable: 0,
        })
    }
}
