use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{AuditEntry, NewAuditEntry},
    error::{AppError, Result},
    repository::AuditLogRepository,
};

#[derive(FromRow)]
struct AuditRow {
    id: String,
    subject_id: String,
    event_type: String,
    payload: String,
    actor_id: Option<String>,
    created_at: NaiveDateTime,
}

pub struct SqliteAuditLogRepository {
    pool: SqlitePool,
}

impl SqliteAuditLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_entry(row: AuditRow) -> Result<AuditEntry> {
        Ok(AuditEntry {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            subject_id: row.subject_id,
            event_type: row.event_type,
            payload: serde_json::from_str(&row.payload)
                .map_err(|e| AppError::Database(format!("Invalid audit payload: {}", e)))?,
            actor_id: row.actor_id,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

/// Inserts an audit row on any executor, so the voucher procedure can write
/// it inside its own transaction.
pub(crate) async fn insert_entry<'e, E>(executor: E, entry: &NewAuditEntry) -> Result<Uuid>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let id = Uuid::new_v4();
    let payload = serde_json::to_string(&entry.payload)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO audit_log (id, subject_id, event_type, payload, actor_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#
    )
    .bind(id.to_string())
    .bind(&entry.subject_id)
    .bind(entry.event_type)
    .bind(payload)
    .bind(&entry.actor_id)
    .bind(Utc::now().naive_utc())
    .execute(executor)
    .await?;

    Ok(id)
}

#[async_trait]
impl AuditLogRepository for SqliteAuditLogRepository {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry> {
        let id = insert_entry(&self.pool, &entry).await?;

        let row = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, subject_id, event_type, payload, actor_id, created_at
            FROM audit_log
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_entry(row)
    }

    async fn list_for_subject(&self, subject_id: &str) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, subject_id, event_type, payload, actor_id, created_at
            FROM audit_log
            WHERE subject_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Self::row_to_entry)
            .collect()
    }
}
