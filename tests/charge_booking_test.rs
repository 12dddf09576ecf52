mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{create_booking, post_json, test_app};
use reservas::{domain::PaymentStatus, repository::{AuditLogRepository, BookingRepository}};

#[tokio::test]
async fn charges_saved_method_and_marks_paid() {
    let app = test_app().await;
    let booking = create_booking(&app.ctx, 4500, Some("pm_card_visa"), None).await;

    let (status, body) = post_json(
        &app.router,
        "/charge-booking",
        json!({ "booking_id": booking.id }),
        &[("Idempotency-Key", "key-123")],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["payment_intent"], "pi_fake_1");
    assert_eq!(body["status"], "succeeded");
    assert_eq!(body["requires_action"], false);

    let charges = app.processor.charges.lock().unwrap().clone();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].amount, 4500);
    assert_eq!(charges[0].payment_method_id, "pm_card_visa");
    assert_eq!(charges[0].customer_id.as_deref(), Some("cus_test"));
    assert_eq!(charges[0].idempotency_key.as_deref(), Some("key-123"));

    let stored = app.ctx.booking_repo.find_by_id(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    assert_eq!(stored.payment_intent_id.as_deref(), Some("pi_fake_1"));
    assert_eq!(stored.stripe_session_id.as_deref(), Some("pi_fake_1"));

    let audit = app.ctx.audit_repo.list_for_subject(&booking.id.to_string()).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].event_type, "booking_charged");
}

#[tokio::test]
async fn no_saved_method_is_rejected_before_the_processor() {
    let app = test_app().await;
    let booking = create_booking(&app.ctx, 4500, None, None).await;

    let (status, body) = post_json(&app.router, "/charge-booking", json!({ "booking_id": booking.id }), &[]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("no saved payment method"));
    assert_eq!(app.processor.charge_count(), 0);
}

#[tokio::test]
async fn explicit_amount_overrides_total() {
    let app = test_app().await;
    let booking = create_booking(&app.ctx, 4500, Some("pm_card_visa"), None).await;

    let (status, _) = post_json(
        &app.router,
        "/charge-booking",
        json!({ "booking_id": booking.id, "amount_cents": 1500, "idempotency_key": "body-key" }),
        &[("Idempotency-Key", "header-key")],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let charges = app.processor.charges.lock().unwrap().clone();
    assert_eq!(charges[0].amount, 1500);
    assert_eq!(charges[0].idempotency_key.as_deref(), Some("body-key"));
}

#[tokio::test]
async fn non_positive_amount_falls_back_then_fails() {
    let app = test_app().await;

    // A zero override falls back to the booking total.
    let booking = create_booking(&app.ctx, 2000, Some("pm_card_visa"), None).await;
    let (status, _) = post_json(
        &app.router,
        "/charge-booking",
        json!({ "booking_id": booking.id, "amount_cents": 0 }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.processor.charges.lock().unwrap()[0].amount, 2000);

    // With a zero total there is nothing left to charge.
    let free = create_booking(&app.ctx, 0, Some("pm_card_visa"), None).await;
    let (status, body) = post_json(&app.router, "/charge-booking", json!({ "booking_id": free.id }), &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "charge amount must be positive");
    assert_eq!(app.processor.charge_count(), 1);
}

#[tokio::test]
async fn paid_booking_is_not_charged_again() {
    let app = test_app().await;
    let booking = create_booking(&app.ctx, 4500, Some("pm_card_visa"), None).await;

    let (first, _) = post_json(&app.router, "/charge-booking", json!({ "booking_id": booking.id }), &[]).await;
    let (second, body) = post_json(&app.router, "/charge-booking", json!({ "booking_id": booking.id }), &[]).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("already paid"));
    assert_eq!(app.processor.charge_count(), 1);
}

#[tokio::test]
async fn requires_action_keeps_booking_unpaid() {
    let app = test_app().await;
    app.processor.set_charge_status("requires_action");
    let booking = create_booking(&app.ctx, 4500, Some("pm_card_3ds"), None).await;

    let (status, body) = post_json(&app.router, "/charge-booking", json!({ "booking_id": booking.id }), &[]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["requires_action"], true);
    assert_eq!(body["payment_status"], "unpaid");

    let stored = app.ctx.booking_repo.find_by_id(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Unpaid);
    assert_eq!(stored.payment_intent_id.as_deref(), Some("pi_fake_1"));
}

#[tokio::test]
async fn missing_or_unknown_booking_is_400() {
    let app = test_app().await;

    let (status, body) = post_json(&app.router, "/charge-booking", json!({}), &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "booking_id is required");

    let (status, body) = post_json(
        &app.router,
        "/charge-booking",
        json!({ "booking_id": uuid::Uuid::new_v4() }),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "booking not found");
}
