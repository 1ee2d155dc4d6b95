use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::mobile_money::MobileMoneyGateway,
    domain::entities::mobile_money_provider::MobileMoneyProvider,
};

/// Resolves the gateway adapter for a mobile-money provider.
///
/// Providers without a registered adapter are rejected at initiation time,
/// before any payment row is written.
#[derive(Default, Clone)]
pub struct GatewayRegistry {
    gateways: HashMap<MobileMoneyProvider, Arc<dyn MobileMoneyGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn MobileMoneyGateway>) -> Self {
        self.register(gateway);
        self
    }

    /// Registers under `gateway.provider()`, replacing any previous adapter.
    pub fn register(&mut self, gateway: Arc<dyn MobileMoneyGateway>) {
        self.gateways.insert(gateway.provider(), gateway);
    }

    pub fn get(&self, provider: MobileMoneyProvider) -> AppResult<Arc<dyn MobileMoneyGateway>> {
        self.gateways.get(&provider).cloned().ok_or_else(|| {
            AppError::InvalidInput(format!(
                "{} is not available for payments",
                provider.display_name()
            ))
        })
    }

    pub fn supports(&self, provider: MobileMoneyProvider) -> bool {
        self.gateways.contains_key(&provider)
    }

    pub fn providers(&self) -> Vec<MobileMoneyProvider> {
        let mut providers: Vec<_> = self.gateways.keys().copied().collect();
        providers.sort_by_key(|p| p.as_ref().to_string());
        providers
    }
}
