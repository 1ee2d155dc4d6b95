use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{app_error::AppResult, domain::entities::mobile_money_provider::MobileMoneyProvider};

// ============================================================================
// Port Types - Provider-agnostic collection types
// ============================================================================

/// Request-to-pay sent to the payer's wallet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRequest {
    pub amount: i64,
    pub currency: String,
    pub phone_number: String,
    /// System-generated reference, later used for status lookups.
    pub reference_id: String,
    pub payer_message: String,
}

/// Single verdict returned by `initiate_collection`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionResult {
    pub success: bool,
    pub message: Option<String>,
}

impl CollectionResult {
    pub fn approved() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn declined(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionStatus {
    Pending,
    Successful,
    Failed,
}

impl CollectionStatus {
    /// Maps the status vocabulary used by MTN and Airtel collection APIs.
    /// Unrecognized values are treated as still pending.
    pub fn from_provider_str(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUCCESSFUL" | "SUCCESS" | "SUCCEEDED" | "COMPLETED" | "TS" => {
                CollectionStatus::Successful
            }
            "FAILED" | "FAILURE" | "REJECTED" | "DECLINED" | "EXPIRED" | "CANCELLED" | "TF" => {
                CollectionStatus::Failed
            }
            _ => CollectionStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CollectionStatus::Pending)
    }
}

// ============================================================================
// Port Trait
// ============================================================================

/// Provider Gateway contract. One implementation per mobile-money network.
///
/// The payment core never retries these calls; any retry policy belongs
/// inside the adapter.
#[async_trait]
pub trait MobileMoneyGateway: Send + Sync {
    fn provider(&self) -> MobileMoneyProvider;

    /// Sends the payment prompt and waits for the payer's verdict.
    async fn initiate_collection(&self, request: &CollectionRequest)
    -> AppResult<CollectionResult>;

    /// Read-only status lookup by the reference passed at initiation.
    async fn check_collection_status(&self, reference_id: &str) -> AppResult<CollectionStatus>;
}
