pub mod admin_service;
pub mod payment_service;
pub mod voucher_service;

use std::sync::Arc;
use sqlx::SqlitePool;

use crate::config::Settings;
use crate::payments::PaymentProcessor;
use crate::repository::*;
use admin_service::AdminService;
use payment_service::PaymentService;
use voucher_service::VoucherService;

pub use payment_service::{CaptureOutcome, ChargeResult};

pub struct ServiceContext {
    pub booking_repo: Arc<dyn BookingRepository>,
    pub voucher_repo: Arc<dyn VoucherRepository>,
    pub audit_repo: Arc<dyn AuditLogRepository>,
    pub operator_repo: Arc<dyn OperatorRepository>,
    pub payment_service: Arc<PaymentService>,
    pub voucher_service: Arc<VoucherService>,
    pub admin_service: Arc<AdminService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    /// `processor` is `None` when Stripe is not configured; payment endpoints
    /// then answer with a configuration error.
    pub fn new(
        db_pool: SqlitePool,
        processor: Option<Arc<dyn PaymentProcessor>>,
        settings: &Settings,
    ) -> Self {
        let booking_repo: Arc<dyn BookingRepository> =
            Arc::new(SqliteBookingRepository::new(db_pool.clone()));
        let voucher_repo: Arc<dyn VoucherRepository> =
            Arc::new(SqliteVoucherRepository::new(db_pool.clone()));
        let audit_repo: Arc<dyn AuditLogRepository> =
            Arc::new(SqliteAuditLogRepository::new(db_pool.clone()));
        let operator_repo: Arc<dyn OperatorRepository> =
            Arc::new(SqliteOperatorRepository::new(db_pool.clone()));

        let payment_service = Arc::new(PaymentService::new(
            booking_repo.clone(),
            audit_repo.clone(),
            processor,
        ));
        let voucher_service = Arc::new(VoucherService::new(voucher_repo.clone()));
        let admin_service = Arc::new(AdminService::new(
            operator_repo.clone(),
            audit_repo.clone(),
            settings.admin.clone(),
        ));

        Self {
            booking_repo,
            voucher_repo,
            audit_repo,
            operator_repo,
            payment_service,
            voucher_service,
            admin_service,
            db_pool,
        }
    }
}
