use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reservas::{client::ChargeOrchestrator, config::Settings};

/// Charge a booking's saved payment method through the charge-booking function.
#[derive(Parser)]
#[command(name = "reservas-charge")]
#[command(about = "Trigger an off-session charge for a booking", long_about = None)]
struct Cli {
    /// Booking id to charge
    #[arg(value_name = "BOOKING_ID")]
    booking_id: String,

    /// Base URL of the hosted functions (overrides configuration)
    #[arg(long)]
    functions_url: Option<String>,

    /// Anon key sent to the hosted functions
    #[arg(long)]
    anon_key: Option<String>,

    /// Secondary charge endpoint (overrides configuration)
    #[arg(long)]
    fallback_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reservas=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut functions = Settings::new()
        .map(|settings| settings.functions)
        .unwrap_or_default();
    if cli.functions_url.is_some() {
        functions.base_url = cli.functions_url;
    }
    if cli.anon_key.is_some() {
        functions.anon_key = cli.anon_key;
    }
    if cli.fallback_url.is_some() {
        functions.fallback_url = cli.fallback_url;
    }

    let orchestrator = ChargeOrchestrator::from_config(&functions)?;
    let outcome = orchestrator.charge_booking(&cli.booking_id).await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.ok {
        std::process::exit(1);
    }
    Ok(())
}
