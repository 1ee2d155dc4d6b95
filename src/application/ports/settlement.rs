use uuid::Uuid;

use crate::app_error::AppResult;

/// Hands a freshly created payment to the settlement worker.
///
/// Implementations must return without waiting for settlement to finish.
pub trait SettlementScheduler: Send + Sync {
    fn schedule(&self, payment_id: Uuid) -> AppResult<()>;
}
