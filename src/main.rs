use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reservas::{
    api,
    config::Settings,
    payments::{PaymentProcessor, StripeProcessor},
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reservas=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!("Starting reservas on {}:{}", settings.server.host, settings.server.port);

    // Initialize database
    let connect_options = SqliteConnectOptions::from_str(&settings.database.url)?
        .busy_timeout(Duration::from_secs(settings.database.busy_timeout_secs));
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect_with(connect_options)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    // Initialize Stripe if configured
    let processor: Option<Arc<dyn PaymentProcessor>> = if settings.stripe.enabled {
        match settings.stripe.secret_key.clone() {
            Some(secret_key) => {
                tracing::info!("Stripe payment processing enabled");
                Some(Arc::new(StripeProcessor::new(secret_key)))
            }
            None => {
                tracing::warn!("Stripe enabled but missing configuration");
                None
            }
        }
    } else {
        tracing::info!("Stripe payment processing disabled");
        None
    };

    if settings.admin.allowed_emails.is_empty() {
        tracing::warn!("No operator emails allow-listed; admin provisioning will reject every request");
    }
    if settings.email.api_key.is_none() {
        tracing::debug!("Email provider key not set");
    }

    let service_context = Arc::new(ServiceContext::new(db_pool.clone(), processor, &settings));
    let settings = Arc::new(settings);

    let app = api::create_app(service_context, settings.clone());

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on http://{}:{}", settings.server.host, settings.server.port);

    axum::serve(listener, app).await?;

    Ok(())
}
