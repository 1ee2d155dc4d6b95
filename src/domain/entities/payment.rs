use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use super::{
    feature_type::FeatureType, mobile_money_provider::MobileMoneyProvider,
    payment_status::PaymentStatus,
};

/// One charge attempt against a payer's mobile wallet.
///
/// `amount`, `currency` and the subscription window are copied from the plan
/// at creation and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub feature_type: FeatureType,
    pub plan_type: String,
    pub amount: i64,
    pub currency: String,
    pub provider: MobileMoneyProvider,
    pub phone_number: String,
    pub transaction_id: String,
    pub idempotency_key: Option<String>,
    #[serde(skip)]
    pub request_fingerprint: String,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Payment {
    pub fn age(&self, now: NaiveDateTime) -> chrono::Duration {
        now - self.created_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_payment;

    #[test]
    fn test_age_is_measured_from_creation() {
        let payment = create_test_payment(Uuid::new_v4(), |_| {});
        let later = payment.created_at + chrono::Duration::seconds(45);
        assert_eq!(payment.age(later), chrono::Duration::seconds(45));
    }

    #[test]
    fn test_fingerprint_is_not_serialized() {
        let payment = create_test_payment(Uuid::new_v4(), |p| {
            p.request_fingerprint = "abc123".to_string();
        });
        let json = serde_json::to_value(&payment).unwrap();
        assert!(json.get("requestFingerprint").is_none());
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["featureType"], "SURVEY");
    }
}
