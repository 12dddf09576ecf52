use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{Actor, Redemption},
    error::Result,
    repository::VoucherRepository,
};

const MAX_NOTE_LEN: usize = 500;

pub struct VoucherService {
    voucher_repo: Arc<dyn VoucherRepository>,
}

impl VoucherService {
    pub fn new(voucher_repo: Arc<dyn VoucherRepository>) -> Self {
        Self { voucher_repo }
    }

    /// Uses one session of a voucher. All checks and the decrement happen in a
    /// single atomic repository call.
    pub async fn redeem(&self, voucher_id: Uuid, note: Option<String>, actor: &Actor) -> Result<Redemption> {
        let note = note
            .map(|n| n.trim().chars().take(MAX_NOTE_LEN).collect::<String>())
            .filter(|n| !n.is_empty());

        self.voucher_repo
            .redeem_session(voucher_id, note.as_deref(), actor)
            .await
    }
}
