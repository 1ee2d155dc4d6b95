use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::mobile_money::{
        CollectionRequest, CollectionResult, CollectionStatus, MobileMoneyGateway,
    },
    domain::entities::mobile_money_provider::MobileMoneyProvider,
    infra::{config::GatewayConfig, http_client::build_client},
};

const POLL_INTERVAL: Duration = Duration::from_secs(3);
const MAX_POLLS: u32 = 15;
const STATUS_RETRIES: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Debug, Deserialize)]
struct CollectionStatusResponse {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

/// JSON client for a provider collection bridge.
///
/// `POST {base}/collections` sends the prompt, after which
/// `GET {base}/collections/{reference}` is polled until the payer answers.
pub struct HttpCollectionGateway {
    provider: MobileMoneyProvider,
    client: reqwest::Client,
    base_url: Url,
    api_user: String,
    api_key: SecretString,
    poll_interval: Duration,
    max_polls: u32,
}

impl HttpCollectionGateway {
    pub fn new(config: GatewayConfig, request_timeout: Duration) -> AppResult<Self> {
        let client = build_client(request_timeout)
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            provider: config.provider,
            client,
            base_url: config.base_url,
            api_user: config.api_user,
            api_key: config.api_key,
            poll_interval: POLL_INTERVAL,
            max_polls: MAX_POLLS,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Internal(format!("{} gateway URL cannot be a base", self.provider)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.basic_auth(&self.api_user, Some(self.api_key.expose_secret()))
    }

    async fn fetch_status(&self, reference_id: &str) -> AppResult<CollectionStatusResponse> {
        let url = self.endpoint(&["collections", reference_id])?;
        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("{} status request failed: {e}", self.provider)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Gateway(format!(
                "{} status request returned {status}",
                self.provider
            )));
        }

        response
            .json::<CollectionStatusResponse>()
            .await
            .map_err(|e| AppError::Gateway(format!("{} status response unreadable: {e}", self.provider)))
    }
}

#[async_trait]
impl MobileMoneyGateway for HttpCollectionGateway {
    fn provider(&self) -> MobileMoneyProvider {
        self.provider
    }

    /// Never retried: a repeated POST could prompt the payer twice.
    async fn initiate_collection(
        &self,
        request: &CollectionRequest,
    ) -> AppResult<CollectionResult> {
        let url = self.endpoint(&["collections"])?;
        let response = self
            .authorized(self.client.post(url))
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("{} collection request failed: {e}", self.provider)))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Ok(CollectionResult::declined(format!(
                "{} rejected the collection ({status}): {}",
                self.provider.display_name(),
                truncate(&body, 200)
            )));
        }
        if !status.is_success() {
            return Err(AppError::Gateway(format!(
                "{} collection request returned {status}",
                self.provider
            )));
        }

        let initial = response
            .json::<CollectionStatusResponse>()
            .await
            .map_err(|e| AppError::Gateway(format!("{} collection response unreadable: {e}", self.provider)))?;

        let mut current = initial;
        for poll in 0..=self.max_polls {
            match CollectionStatus::from_provider_str(&current.status) {
                CollectionStatus::Successful => return Ok(CollectionResult::approved()),
                CollectionStatus::Failed => {
                    return Ok(CollectionResult::declined(
                        current
                            .reason
                            .unwrap_or_else(|| "Collection failed at provider".to_string()),
                    ));
                }
                CollectionStatus::Pending if poll == self.max_polls => break,
                CollectionStatus::Pending => {}
            }

            tokio::time::sleep(self.poll_interval).await;
            match self.fetch_status(&request.reference_id).await {
                Ok(next) => current = next,
                Err(e) => debug!(error = %e, poll, "Collection poll failed, retrying"),
            }
        }

        Ok(CollectionResult::declined(
            "Payer did not confirm the prompt in time",
        ))
    }

    async fn check_collection_status(&self, reference_id: &str) -> AppResult<CollectionStatus> {
        let mut attempt = 0;
        loop {
            match self.fetch_status(reference_id).await {
                Ok(response) => return Ok(CollectionStatus::from_provider_str(&response.status)),
                Err(e) if attempt < STATUS_RETRIES => {
                    attempt += 1;
                    warn!(error = %e, attempt, "Status check failed, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
