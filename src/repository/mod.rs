use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::*;
use crate::error::Result;

pub mod audit_repository;
pub mod booking_repository;
pub mod operator_repository;
pub mod voucher_repository;

pub use audit_repository::SqliteAuditLogRepository;
pub use booking_repository::SqliteBookingRepository;
pub use operator_repository::SqliteOperatorRepository;
pub use voucher_repository::SqliteVoucherRepository;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, booking: NewBooking) -> Result<Booking>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>>;
    /// Stores a capture result. Returns `false` when the booking's current
    /// status does not allow moving to `status`; nothing is written then.
    async fn record_capture(&self, id: Uuid, amount_captured: i64, status: PaymentStatus) -> Result<bool>;
    /// Stores an off-session charge result, with the same no-regression rule.
    async fn record_charge(&self, id: Uuid, payment_intent_id: &str, status: PaymentStatus) -> Result<bool>;
}

#[async_trait]
pub trait VoucherRepository: Send + Sync {
    async fn create(&self, voucher: NewVoucher) -> Result<Voucher>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Voucher>>;
    /// Atomically consumes one session and records who used it.
    ///
    /// Domain rejections come back as [`crate::error::AppError::Procedure`]
    /// carrying a human-readable message.
    async fn redeem_session(&self, voucher_id: Uuid, note: Option<&str>, actor: &Actor) -> Result<Redemption>;
}

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry>;
    async fn list_for_subject(&self, subject_id: &str) -> Result<Vec<AuditEntry>>;
}

#[async_trait]
pub trait OperatorRepository: Send + Sync {
    async fn create(&self, email: &str, password_hash: &str, role: OperatorRole) -> Result<Operator>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Operator>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Operator>>;
    async fn update_role(&self, id: Uuid, role: OperatorRole, password_hash: Option<&str>) -> Result<Operator>;
}
