//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;

use crate::{
    domain::entities::{
        feature_type::FeatureType, mobile_money_provider::MobileMoneyProvider, payment::Payment,
        payment_status::PaymentStatus, plan::Plan,
    },
    use_cases::payment::request_fingerprint,
};

pub const TEST_PHONE_NUMBER: &str = "0772123456";

/// Create a PENDING monthly survey payment created just now.
pub fn create_test_payment(user_id: Uuid, overrides: impl FnOnce(&mut Payment)) -> Payment {
    let now = now();
    let mut payment = Payment {
        id: Uuid::new_v4(),
        user_id,
        feature_type: FeatureType::Survey,
        plan_type: "MONTHLY".to_string(),
        amount: 5000,
        currency: "UGX".to_string(),
        provider: MobileMoneyProvider::Mtn,
        phone_number: TEST_PHONE_NUMBER.to_string(),
        transaction_id: Uuid::new_v4().to_string(),
        idempotency_key: None,
        request_fingerprint: request_fingerprint(
            user_id,
            FeatureType::Survey,
            "MONTHLY",
            MobileMoneyProvider::Mtn,
            TEST_PHONE_NUMBER,
        ),
        status: PaymentStatus::Pending,
        failure_reason: None,
        start_date: now,
        end_date: now + chrono::Duration::days(30),
        created_at: now,
        updated_at: now,
    };
    overrides(&mut payment);
    payment
}

/// Create a test plan with sensible defaults.
pub fn create_test_plan(overrides: impl FnOnce(&mut Plan)) -> Plan {
    let mut plan = Plan {
        plan_type: "MONTHLY".to_string(),
        feature_type: FeatureType::Survey,
        name: "Survey Monthly".to_string(),
        price: 5000,
        currency: "UGX".to_string(),
        duration_days: 30,
    };
    overrides(&mut plan);
    plan
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}
