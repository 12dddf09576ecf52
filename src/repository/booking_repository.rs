use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Booking, NewBooking, PaymentStatus},
    error::{AppError, Result},
    repository::BookingRepository,
};

#[derive(FromRow)]
struct BookingRow {
    id: String,
    customer_name: String,
    customer_email: String,
    importe_total: i64,
    currency: String,
    stripe_customer_id: Option<String>,
    stripe_payment_method_id: Option<String>,
    payment_intent_id: Option<String>,
    stripe_session_id: Option<String>,
    payment_status: String,
    amount_captured: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteBookingRepository {
    pool: SqlitePool,
}

impl SqliteBookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_booking(row: BookingRow) -> Result<Booking> {
        Ok(Booking {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            importe_total: row.importe_total,
            currency: row.currency,
            stripe_customer_id: row.stripe_customer_id,
            stripe_payment_method_id: row.stripe_payment_method_id,
            payment_intent_id: row.payment_intent_id,
            stripe_session_id: row.stripe_session_id,
            payment_status: PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
                AppError::Database(format!("Invalid payment status: {}", row.payment_status))
            })?,
            amount_captured: row.amount_captured,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    /// `?, ?, ...` for the states a booking may be in before moving to `status`.
    fn predecessor_placeholders(status: PaymentStatus) -> String {
        vec!["?"; status.allowed_predecessors().len()].join(", ")
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn create(&self, booking: NewBooking) -> Result<Booking> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, customer_name, customer_email, importe_total, currency,
                stripe_customer_id, stripe_payment_method_id, payment_intent_id,
                payment_status, amount_captured, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(&booking.customer_name)
        .bind(&booking.customer_email)
        .bind(booking.importe_total)
        .bind(&booking.currency)
        .bind(&booking.stripe_customer_id)
        .bind(&booking.stripe_payment_method_id)
        .bind(&booking.payment_intent_id)
        .bind(PaymentStatus::Unpaid.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created booking".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, customer_name, customer_email, importe_total, currency,
                   stripe_customer_id, stripe_payment_method_id, payment_intent_id,
                   stripe_session_id, payment_status, amount_captured,
                   created_at, updated_at
            FROM bookings
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(Self::row_to_booking(r)?)),
            None => Ok(None),
        }
    }

    async fn record_capture(&self, id: Uuid, amount_captured: i64, status: PaymentStatus) -> Result<bool> {
        let sql = format!(
            r#"
            UPDATE bookings
            SET amount_captured = ?,
                payment_status = ?,
                updated_at = ?
            WHERE id = ? AND payment_status IN ({})
            "#,
            Self::predecessor_placeholders(status)
        );

        let mut query = sqlx::query(&sql)
            .bind(amount_captured)
            .bind(status.as_str())
            .bind(Utc::now().naive_utc())
            .bind(id.to_string());
        for previous in status.allowed_predecessors() {
            query = query.bind(previous.as_str());
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_charge(&self, id: Uuid, payment_intent_id: &str, status: PaymentStatus) -> Result<bool> {
        let sql = format!(
            r#"
            UPDATE bookings
            SET payment_intent_id = ?,
                stripe_session_id = ?,
                payment_status = ?,
                updated_at = ?
            WHERE id = ? AND payment_status IN ({})
            "#,
            Self::predecessor_placeholders(status)
        );

        let mut query = sqlx::query(&sql)
            .bind(payment_intent_id)
            .bind(payment_intent_id)
            .bind(status.as_str())
            .bind(Utc::now().naive_utc())
            .bind(id.to_string());
        for previous in status.allowed_predecessors() {
            query = query.bind(previous.as_str());
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
