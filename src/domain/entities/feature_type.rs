use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Subscription family unlocked by a payment.
///
/// Concurrency and reconciliation rules are scoped per (user, feature).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, AsRefStr, Display,
    EnumString,
)]
#[sqlx(type_name = "feature_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FeatureType {
    #[serde(alias = "survey")]
    Survey,
    #[serde(alias = "video")]
    Video,
}

impl FeatureType {
    pub fn display_name(&self) -> &'static str {
        match self {
            FeatureType::Survey => "Surveys",
            FeatureType::Video => "Videos",
        }
    }

    pub fn all() -> &'static [FeatureType] {
        &[FeatureType::Survey, FeatureType::Video]
    }
}
