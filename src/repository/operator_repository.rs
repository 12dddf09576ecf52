use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Operator, OperatorRole},
    error::{AppError, Result},
    repository::OperatorRepository,
};

#[derive(FromRow)]
struct OperatorRow {
    id: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteOperatorRepository {
    pool: SqlitePool,
}

impl SqliteOperatorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_operator(row: OperatorRow) -> Result<Operator> {
        Ok(Operator {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            email: row.email,
            password_hash: row.password_hash,
            role: OperatorRole::parse(&row.role)
                .ok_or_else(|| AppError::Database(format!("Invalid operator role: {}", row.role)))?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl OperatorRepository for SqliteOperatorRepository {
    async fn create(&self, email: &str, password_hash: &str, role: OperatorRole) -> Result<Operator> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO operators (id, email, password_hash, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(email.trim().to_lowercase())
        .bind(password_hash)
        .bind(role.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created operator".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Operator>> {
        let row = sqlx::query_as::<_, OperatorRow>(
            "SELECT id, email, password_hash, role, created_at, updated_at FROM operators WHERE id = ?"
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_operator).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Operator>> {
        let row = sqlx::query_as::<_, OperatorRow>(
            "SELECT id, email, password_hash, role, created_at, updated_at FROM operators WHERE email = ?"
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_operator).transpose()
    }

    async fn update_role(&self, id: Uuid, role: OperatorRole, password_hash: Option<&str>) -> Result<Operator> {
        sqlx::query(
            r#"
            UPDATE operators
            SET role = ?,
                password_hash = COALESCE(?, password_hash),
                updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(role.as_str())
        .bind(password_hash)
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::NotFound("Operator not found".to_string())
        })
    }
}
