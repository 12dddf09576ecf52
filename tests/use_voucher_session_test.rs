mod common;

use axum::http::StatusCode;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::json;

use common::{file_backed_app, post_json, test_app, TestApp};
use reservas::{
    auth::decode_actor,
    domain::{NewVoucher, OperatorRole, Voucher},
    repository::{AuditLogRepository, OperatorRepository, VoucherRepository},
};

#[derive(Serialize)]
struct Claims<'a> {
    sub: &'a str,
    email: &'a str,
    role: &'a str,
    exp: usize,
}

fn bearer(sub: &str, email: &str) -> String {
    let claims = Claims {
        sub,
        email,
        role: "authenticated",
        exp: 4_102_444_800,
    };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"platform-secret")).unwrap();
    format!("Bearer {}", token)
}

async fn operator_bearer(app: &TestApp) -> String {
    let operator = app
        .ctx
        .operator_repo
        .create("recepcion@estudio.es", "not-a-real-hash", OperatorRole::Staff)
        .await
        .unwrap();
    bearer(&operator.id.to_string(), &operator.email)
}

async fn voucher(app: &TestApp, code: &str, sessions: i64, active: bool, owner: Option<&str>) -> Voucher {
    app.ctx
        .voucher_repo
        .create(NewVoucher {
            owner_id: owner.map(str::to_string),
            code: code.to_string(),
            total_sessions: sessions,
            active,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn operator_uses_a_session() {
    let app = test_app().await;
    let auth = operator_bearer(&app).await;
    let pack = voucher(&app, "BONO-10", 10, true, Some("client-1")).await;

    let (status, body) = post_json(
        &app.router,
        "/use-voucher-session",
        json!({ "voucher_id": pack.id, "note": "  clase de las 18h  " }),
        &[("Authorization", &auth)],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["remaining_sessions"], 9);
    assert_eq!(body["voucher_id"], pack.id.to_string());
    assert!(body["redemption_id"].is_string());

    let stored = app.ctx.voucher_repo.find_by_id(pack.id).await.unwrap().unwrap();
    assert_eq!(stored.remaining_sessions, 9);

    let audit = app.ctx.audit_repo.list_for_subject(&pack.id.to_string()).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].event_type, "voucher_session_used");
    assert_eq!(audit[0].payload["note"], "clase de las 18h");
    assert_eq!(audit[0].payload["actor_email"], "recepcion@estudio.es");
}

#[tokio::test]
async fn owner_may_use_own_voucher() {
    let app = test_app().await;
    let pack = voucher(&app, "BONO-5", 5, true, Some("client-7")).await;

    let (status, body) = post_json(
        &app.router,
        "/use-voucher-session",
        json!({ "voucher_id": pack.id }),
        &[("Authorization", &bearer("client-7", "cliente@example.com"))],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining_sessions"], 4);
}

#[tokio::test]
async fn exhausted_voucher_is_conflict() {
    let app = test_app().await;
    let auth = operator_bearer(&app).await;
    let pack = voucher(&app, "BONO-1", 1, true, None).await;

    let (first, _) = post_json(&app.router, "/use-voucher-session", json!({ "voucher_id": pack.id }), &[("Authorization", &auth)]).await;
    let (second, body) = post_json(&app.router, "/use-voucher-session", json!({ "voucher_id": pack.id }), &[("Authorization", &auth)]).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "voucher has no remaining sessions");

    let stored = app.ctx.voucher_repo.find_by_id(pack.id).await.unwrap().unwrap();
    assert_eq!(stored.remaining_sessions, 0);
}

#[tokio::test]
async fn inactive_voucher_is_forbidden() {
    let app = test_app().await;
    let auth = operator_bearer(&app).await;
    let pack = voucher(&app, "BONO-OLD", 3, false, None).await;

    let (status, body) = post_json(&app.router, "/use-voucher-session", json!({ "voucher_id": pack.id }), &[("Authorization", &auth)]).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "voucher is not active");
    let stored = app.ctx.voucher_repo.find_by_id(pack.id).await.unwrap().unwrap();
    assert_eq!(stored.remaining_sessions, 3);
}

#[tokio::test]
async fn anonymous_or_stranger_is_forbidden() {
    let app = test_app().await;
    let pack = voucher(&app, "BONO-10", 10, true, Some("client-1")).await;

    let (status, body) = post_json(&app.router, "/use-voucher-session", json!({ "voucher_id": pack.id }), &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("permission denied"));

    let (status, _) = post_json(
        &app.router,
        "/use-voucher-session",
        json!({ "voucher_id": pack.id }),
        &[("Authorization", "Bearer garbage")],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = post_json(
        &app.router,
        "/use-voucher-session",
        json!({ "voucher_id": pack.id }),
        &[("Authorization", &bearer("client-2", "otro@example.com"))],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let stored = app.ctx.voucher_repo.find_by_id(pack.id).await.unwrap().unwrap();
    assert_eq!(stored.remaining_sessions, 10);
}

#[tokio::test]
async fn unknown_or_missing_voucher_is_400() {
    let app = test_app().await;
    let auth = operator_bearer(&app).await;

    let (status, body) = post_json(
        &app.router,
        "/use-voucher-session",
        json!({ "voucher_id": uuid::Uuid::new_v4() }),
        &[("Authorization", &auth)],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "voucher not found");

    let (status, body) = post_json(&app.router, "/use-voucher-session", json!({}), &[("Authorization", &auth)]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "voucher_id is required");
}

async fn redeem_concurrently(app: &TestApp, voucher_id: uuid::Uuid, auth: &str, times: usize) -> Vec<StatusCode> {
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..times {
        let router = app.router.clone();
        let auth = auth.to_string();
        tasks.spawn(async move {
            post_json(
                &router,
                "/use-voucher-session",
                json!({ "voucher_id": voucher_id }),
                &[("Authorization", auth.as_str())],
            )
            .await
        });
    }

    let mut statuses = Vec::new();
    while let Some(result) = tasks.join_next().await {
        let (status, body) = result.unwrap();
        if status != StatusCode::OK {
            assert_eq!(body["ok"], false, "unexpected failure body: {}", body);
        }
        statuses.push(status);
    }
    statuses.sort();
    statuses
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_redemptions_all_succeed() {
    let (app, _dir) = file_backed_app(10).await;
    let auth = operator_bearer(&app).await;
    let pack = voucher(&app, "BONO-8", 8, true, None).await;

    let statuses = redeem_concurrently(&app, pack.id, &auth, 8).await;

    assert_eq!(statuses, vec![StatusCode::OK; 8]);
    let stored = app.ctx.voucher_repo.find_by_id(pack.id).await.unwrap().unwrap();
    assert_eq!(stored.remaining_sessions, 0);
    let audit = app.ctx.audit_repo.list_for_subject(&pack.id.to_string()).await.unwrap();
    assert_eq!(audit.len(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_session_race_has_one_winner() {
    let (app, _dir) = file_backed_app(10).await;
    let auth = operator_bearer(&app).await;
    let pack = voucher(&app, "BONO-1", 1, true, None).await;

    let statuses = redeem_concurrently(&app, pack.id, &auth, 2).await;

    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);
    let stored = app.ctx.voucher_repo.find_by_id(pack.id).await.unwrap().unwrap();
    assert_eq!(stored.remaining_sessions, 0);
    let audit = app.ctx.audit_repo.list_for_subject(&pack.id.to_string()).await.unwrap();
    assert_eq!(audit.len(), 1);
}

#[test]
fn signed_tokens_decode_without_the_key() {
    let header = bearer("user-42", "ana@estudio.es");
    let actor = decode_actor(header.trim_start_matches("Bearer "));
    assert_eq!(actor.id.as_deref(), Some("user-42"));
    assert_eq!(actor.email.as_deref(), Some("ana@estudio.es"));
}
