use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Mobile-money network used to collect a payment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, AsRefStr, Display,
    EnumString,
)]
#[sqlx(type_name = "mobile_money_provider", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MobileMoneyProvider {
    #[serde(alias = "mtn")]
    Mtn,
    #[serde(alias = "airtel")]
    Airtel,
}

impl MobileMoneyProvider {
    /// Human-readable display name for the provider
    pub fn display_name(&self) -> &'static str {
        match self {
            MobileMoneyProvider::Mtn => "MTN Mobile Money",
            MobileMoneyProvider::Airtel => "Airtel Money",
        }
    }

    /// Prefix for provider-scoped environment variables (e.g. `MTN_GATEWAY_URL`).
    pub fn env_prefix(&self) -> &'static str {
        match self {
            MobileMoneyProvider::Mtn => "MTN",
            MobileMoneyProvider::Airtel => "AIRTEL",
        }
    }

    pub fn all() -> &'static [MobileMoneyProvider] {
        &[MobileMoneyProvider::Mtn, MobileMoneyProvider::Airtel]
    }
}
