use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Actor, NewAuditEntry, NewVoucher, Redemption, Voucher, EVENT_VOUCHER_SESSION_USED},
    error::{AppError, Result},
    repository::{audit_repository, VoucherRepository},
};

pub const MSG_VOUCHER_NOT_FOUND: &str = "voucher not found";
pub const MSG_PERMISSION_DENIED: &str = "permission denied: caller may not redeem this voucher";
pub const MSG_NOT_ACTIVE: &str = "voucher is not active";
pub const MSG_NO_REMAINING: &str = "voucher has no remaining sessions";

#[derive(FromRow)]
struct VoucherRow {
    id: String,
    owner_id: Option<String>,
    code: String,
    total_sessions: i64,
    remaining_sessions: i64,
    active: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteVoucherRepository {
    pool: SqlitePool,
}

impl SqliteVoucherRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_voucher(row: VoucherRow) -> Result<Voucher> {
        Ok(Voucher {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            owner_id: row.owner_id,
            code: row.code,
            total_sessions: row.total_sessions,
            remaining_sessions: row.remaining_sessions,
            active: row.active != 0,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl VoucherRepository for SqliteVoucherRepository {
    async fn create(&self, voucher: NewVoucher) -> Result<Voucher> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO vouchers (
                id, owner_id, code, total_sessions, remaining_sessions,
                active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(&voucher.owner_id)
        .bind(&voucher.code)
        .bind(voucher.total_sessions)
        .bind(voucher.total_sessions)
        .bind(voucher.active as i32)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created voucher".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Voucher>> {
        let row = sqlx::query_as::<_, VoucherRow>(
            r#"
            SELECT id, owner_id, code, total_sessions, remaining_sessions,
                   active, created_at, updated_at
            FROM vouchers
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_voucher).transpose()
    }

    async fn redeem_session(&self, voucher_id: Uuid, note: Option<&str>, actor: &Actor) -> Result<Redemption> {
        let voucher_id_str = voucher_id.to_string();
        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        // Decrement first: the transaction must hold the write lock before any
        // read. Every rejection below rolls it back.
        let updated = sqlx::query(
            r#"
            UPDATE vouchers
            SET remaining_sessions = remaining_sessions - 1,
                updated_at = ?
            WHERE id = ? AND active = 1 AND remaining_sessions > 0
            "#
        )
        .bind(now)
        .bind(&voucher_id_str)
        .execute(&mut *tx)
        .await?;

        let voucher = sqlx::query_as::<_, VoucherRow>(
            r#"
            SELECT id, owner_id, code, total_sessions, remaining_sessions,
                   active, created_at, updated_at
            FROM vouchers
            WHERE id = ?
            "#
        )
        .bind(&voucher_id_str)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Procedure(MSG_VOUCHER_NOT_FOUND.to_string()))?;

        let is_operator = match actor.id.as_deref() {
            Some(actor_id) => {
                let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM operators WHERE id = ?")
                    .bind(actor_id)
                    .fetch_one(&mut *tx)
                    .await?;
                count > 0
            }
            None => false,
        };
        let is_owner = actor.id.is_some() && actor.id == voucher.owner_id;
        if !is_operator && !is_owner {
            return Err(AppError::Procedure(MSG_PERMISSION_DENIED.to_string()));
        }

        if voucher.active == 0 {
            return Err(AppError::Procedure(MSG_NOT_ACTIVE.to_string()));
        }
        if updated.rows_affected() == 0 {
            return Err(AppError::Procedure(MSG_NO_REMAINING.to_string()));
        }

        let remaining_sessions = voucher.remaining_sessions;

        let redemption_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO voucher_redemptions (id, voucher_id, actor_id, actor_email, note, redeemed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(redemption_id.to_string())
        .bind(&voucher_id_str)
        .bind(&actor.id)
        .bind(&actor.email)
        .bind(note)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let audit = NewAuditEntry::new(
            voucher_id_str.clone(),
            EVENT_VOUCHER_SESSION_USED,
            json!({
                "redemption_id": redemption_id,
                "remaining_sessions": remaining_sessions,
                "note": note,
                "actor_email": actor.email,
            }),
        )
        .with_actor(actor.id.clone());
        audit_repository::insert_entry(&mut *tx, &audit).await?;

        tx.commit().await?;

        tracing::info!(
            "Voucher {} redeemed by {:?}, {} sessions left",
            voucher_id,
            actor.id,
            remaining_sessions
        );

        Ok(Redemption {
            redemption_id,
            voucher_id,
            remaining_sessions,
            redeemed_at: DateTime::from_naive_utc_and_offset(now, Utc),
        })
    }
}
