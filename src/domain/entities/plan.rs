use serde::{Deserialize, Serialize};

use super::feature_type::FeatureType;

/// Longest plan a catalog may define (about a century).
pub const MAX_DURATION_DAYS: i64 = 36_500;

/// A purchasable subscription plan. Prices are whole units of `currency`
/// (UGX has no minor unit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub plan_type: String,
    pub feature_type: FeatureType,
    pub name: String,
    pub price: i64,
    pub currency: String,
    pub duration_days: i64,
}

impl Plan {
    /// `None` when `duration_days` does not fit a `chrono::Duration`.
    pub fn duration(&self) -> Option<chrono::Duration> {
        chrono::Duration::try_days(self.duration_days)
    }
}
