use serde_json::json;
use std::sync::Arc;

use crate::{
    auth::{self, MIN_PASSWORD_LEN},
    config::AdminConfig,
    domain::{NewAuditEntry, Operator, OperatorRole, EVENT_OPERATOR_PROVISIONED},
    error::{AppError, Result},
    repository::{AuditLogRepository, OperatorRepository},
};

pub struct AdminService {
    operator_repo: Arc<dyn OperatorRepository>,
    audit_repo: Arc<dyn AuditLogRepository>,
    config: AdminConfig,
}

impl AdminService {
    pub fn new(
        operator_repo: Arc<dyn OperatorRepository>,
        audit_repo: Arc<dyn AuditLogRepository>,
        config: AdminConfig,
    ) -> Self {
        Self {
            operator_repo,
            audit_repo,
            config,
        }
    }

    fn check_eligible(&self, email: &str) -> Result<String> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(AppError::BadRequest("Invalid email format".to_string()));
        }
        if !self.config.is_allowed(&email) {
            return Err(AppError::BadRequest(
                "email is not eligible for operator access".to_string(),
            ));
        }
        Ok(email)
    }

    fn check_password(password: &str) -> Result<()> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }

    /// Creates an operator account, or updates role and password when the
    /// address is already registered.
    pub async fn create_operator(&self, email: &str, password: &str, role: OperatorRole) -> Result<Operator> {
        let email = self.check_eligible(email)?;
        Self::check_password(password)?;
        let password_hash = auth::hash_password(password).await?;

        let (operator, created) = match self.operator_repo.find_by_email(&email).await? {
            Some(existing) => (
                self.operator_repo
                    .update_role(existing.id, role, Some(&password_hash))
                    .await?,
                false,
            ),
            None => (
                self.operator_repo.create(&email, &password_hash, role).await?,
                true,
            ),
        };

        self.record(&operator, created).await?;
        Ok(operator)
    }

    /// Grants a role to an existing operator account.
    pub async fn elevate_operator(&self, email: &str, role: OperatorRole, password: Option<&str>) -> Result<Operator> {
        let email = self.check_eligible(email)?;

        let existing = self
            .operator_repo
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

        let password_hash = match password {
            Some(password) => {
                Self::check_password(password)?;
                Some(auth::hash_password(password).await?)
            }
            None => None,
        };

        let operator = self
            .operator_repo
            .update_role(existing.id, role, password_hash.as_deref())
            .await?;

        self.record(&operator, false).await?;
        Ok(operator)
    }

    async fn record(&self, operator: &Operator, created: bool) -> Result<()> {
        tracing::info!(
            "Operator {} provisioned as {} (created: {})",
            operator.email,
            operator.role.as_str(),
            created
        );

        self.audit_repo
            .append(NewAuditEntry::new(
                operator.id.to_string(),
                EVENT_OPERATOR_PROVISIONED,
                json!({
                    "email": operator.email,
                    "role": operator.role,
                    "created": created,
                }),
            ))
            .await?;
        Ok(())
    }
}
