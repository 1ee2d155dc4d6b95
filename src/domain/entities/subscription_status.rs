use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::feature_type::FeatureType;

/// Per-feature subscription flag stored on the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
}

impl SubscriptionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        SubscriptionStatus::Inactive
    }
}

/// Subscription flags for one user, one per feature family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSubscriptions {
    pub user_id: Uuid,
    pub survey_subscription_status: SubscriptionStatus,
    pub video_subscription_status: SubscriptionStatus,
}

impl UserSubscriptions {
    pub fn inactive(user_id: Uuid) -> Self {
        Self {
            user_id,
            survey_subscription_status: SubscriptionStatus::Inactive,
            video_subscription_status: SubscriptionStatus::Inactive,
        }
    }

    pub fn for_feature(&self, feature: FeatureType) -> SubscriptionStatus {
        match feature {
            FeatureType::Survey => self.survey_subscription_status,
            FeatureType::Video => self.video_subscription_status,
        }
    }

    pub fn activate(&mut self, feature: FeatureType) {
        match feature {
            FeatureType::Survey => self.survey_subscription_status = SubscriptionStatus::Active,
            FeatureType::Video => self.video_subscription_status = SubscriptionStatus::Active,
        }
    }
}
