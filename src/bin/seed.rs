use clap::Parser;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use sqlx::sqlite::SqlitePoolOptions;

use reservas::{
    auth,
    domain::{NewBooking, NewVoucher, OperatorRole},
    repository::{
        BookingRepository, OperatorRepository, SqliteBookingRepository, SqliteOperatorRepository,
        SqliteVoucherRepository, VoucherRepository,
    },
};

/// Fill a local database with demo bookings, vouchers and an operator.
#[derive(Parser)]
#[command(name = "seed")]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://reservas.db?mode=rwc")]
    database_url: String,

    /// Number of bookings to create
    #[arg(long, default_value_t = 10)]
    bookings: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    println!("🌱 Starting database seeding...");

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&cli.database_url)
        .await?;

    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let booking_repo = SqliteBookingRepository::new(db_pool.clone());
    let voucher_repo = SqliteVoucherRepository::new(db_pool.clone());
    let operator_repo = SqliteOperatorRepository::new(db_pool.clone());

    println!("👤 Creating operator...");
    let password_hash = auth::hash_password("admin12345").await?;
    let admin = match operator_repo.find_by_email("admin@reservas.local").await? {
        Some(existing) => existing,
        None => operator_repo
            .create("admin@reservas.local", &password_hash, OperatorRole::Admin)
            .await?,
    };
    println!("  ✅ Operator admin@reservas.local / admin12345 ({})", admin.id);

    println!("📅 Creating bookings...");
    for i in 0..cli.bookings {
        let importe_total = (2..=12).fake::<i64>() * 500;
        // Every other booking has a saved card, every third an authorization to capture.
        let booking = booking_repo
            .create(NewBooking {
                customer_name: Name().fake(),
                customer_email: SafeEmail().fake(),
                importe_total,
                currency: "eur".to_string(),
                stripe_customer_id: (i % 2 == 0).then(|| format!("cus_demo{:04}", i)),
                stripe_payment_method_id: (i % 2 == 0).then(|| format!("pm_demo{:04}", i)),
                payment_intent_id: (i % 3 == 0).then(|| format!("pi_demo{:04}", i)),
            })
            .await?;
        println!("  • {} {} ({} cents)", booking.id, booking.customer_name, booking.importe_total);
    }

    println!("🎟️  Creating vouchers...");
    for (code, sessions, active) in [("BONO-10", 10, true), ("BONO-5", 5, true), ("BONO-OLD", 3, false)] {
        let created = voucher_repo
            .create(NewVoucher {
                owner_id: None,
                code: code.to_string(),
                total_sessions: sessions,
                active,
            })
            .await;
        match created {
            Ok(voucher) => println!("  • {} {} ({} sessions, active: {})", voucher.id, voucher.code, sessions, active),
            // Codes are unique, so a second run skips them.
            Err(e) => println!("  ⏭️  {} skipped: {}", code, e),
        }
    }

    println!("✨ Seeding complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_explicit_arguments() {
        let cli = Cli::try_parse_from(["seed", "--database-url", "sqlite::memory:", "--bookings", "3"]).unwrap();
        assert_eq!(cli.database_url, "sqlite::memory:");
        assert_eq!(cli.bookings, 3);
    }
}
