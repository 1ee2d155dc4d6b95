use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::mobile_money::{
        CollectionRequest, CollectionResult, CollectionStatus, MobileMoneyGateway,
    },
    domain::entities::mobile_money_provider::MobileMoneyProvider,
};

/// Payer number outcome, chosen by the last four digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SandboxScenario {
    Approve,
    Decline,
    ProviderError,
    NeverConfirms,
}

impl SandboxScenario {
    fn for_phone(phone_number: &str) -> Self {
        if phone_number.ends_with("0000") {
            SandboxScenario::Decline
        } else if phone_number.ends_with("9999") {
            SandboxScenario::ProviderError
        } else if phone_number.ends_with("1111") {
            SandboxScenario::NeverConfirms
        } else {
            SandboxScenario::Approve
        }
    }
}

/// Local stand-in for a provider collection API. No network calls.
///
/// | number ends in | outcome                       |
/// |----------------|-------------------------------|
/// | `0000`         | declined by payer             |
/// | `9999`         | provider error                |
/// | `1111`         | prompt never confirmed        |
/// | anything else  | approved                      |
pub struct SandboxGateway {
    provider: MobileMoneyProvider,
    statuses: Mutex<HashMap<String, CollectionStatus>>,
}

impl SandboxGateway {
    pub fn new(provider: MobileMoneyProvider) -> Self {
        Self {
            provider,
            statuses: Mutex::new(HashMap::new()),
        }
    }

    fn record(&self, reference_id: &str, status: CollectionStatus) -> AppResult<()> {
        self.statuses
            .lock()
            .map_err(|_| AppError::Internal("sandbox status table poisoned".into()))?
            .insert(reference_id.to_string(), status);
        Ok(())
    }
}

#[async_trait]
impl MobileMoneyGateway for SandboxGateway {
    fn provider(&self) -> MobileMoneyProvider {
        self.provider
    }

    async fn initiate_collection(
        &self,
        request: &CollectionRequest,
    ) -> AppResult<CollectionResult> {
        let scenario = SandboxScenario::for_phone(&request.phone_number);
        info!(
            provider = %self.provider,
            reference_id = %request.reference_id,
            ?scenario,
            "Sandbox collection"
        );

        match scenario {
            SandboxScenario::Approve => {
                self.record(&request.reference_id, CollectionStatus::Successful)?;
                Ok(CollectionResult::approved())
            }
            SandboxScenario::Decline => {
                self.record(&request.reference_id, CollectionStatus::Failed)?;
                Ok(CollectionResult::declined("Payer declined the prompt"))
            }
            SandboxScenario::ProviderError => Err(AppError::Gateway(format!(
                "{} sandbox is unavailable",
                self.provider.display_name()
            ))),
            SandboxScenario::NeverConfirms => {
                self.record(&request.reference_id, CollectionStatus::Pending)?;
                Ok(CollectionResult::declined(
                    "Payer did not confirm the prompt in time",
                ))
            }
        }
    }

    async fn check_collection_status(&self, reference_id: &str) -> AppResult<CollectionStatus> {
        let statuses = self
            .statuses
            .lock()
            .map_err(|_| AppError::Internal("sandbox status table poisoned".into()))?;
        Ok(statuses
            .get(reference_id)
            .copied()
            .unwrap_or(CollectionStatus::Pending))
    }
}
