pub mod docs;
pub mod handlers;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::Settings,
    service::ServiceContext,
};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // Function endpoints. Each also answers a bare OPTIONS.
        .route(
            "/capture-payment",
            post(handlers::capture::capture_payment).options(handlers::preflight),
        )
        .route(
            "/charge-booking",
            post(handlers::charge::charge_booking).options(handlers::preflight),
        )
        .route(
            "/use-voucher-session",
            post(handlers::vouchers::use_voucher_session).options(handlers::preflight),
        )
        .route(
            "/create-admin",
            post(handlers::admin::create_admin).options(handlers::preflight),
        )
        .route(
            "/elevate-admin",
            post(handlers::admin::elevate_admin).options(handlers::preflight),
        )

        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))

        .with_state(app_state)

        // Browsers call these functions cross-origin.
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
