use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::{
            mobile_money::{CollectionRequest, CollectionStatus},
            plan_catalog::PlanCatalog,
            settlement::SettlementScheduler,
        },
        use_cases::gateway_registry::GatewayRegistry,
        validators::{is_valid_idempotency_key, normalize_phone_number},
    },
    domain::entities::{
        caller::Caller, feature_type::FeatureType, mobile_money_provider::MobileMoneyProvider,
        payment::Payment, payment_status::PaymentStatus, plan::Plan,
        subscription_status::UserSubscriptions,
    },
};

// ============================================================================
// Constants
// ============================================================================

const CREATE_ATTEMPTS: usize = 2;

pub const STALE_FAILURE_REASON: &str = "Payment expired before confirmation";
pub const SUPERSEDED_FAILURE_REASON: &str = "Superseded by a newer payment attempt";
pub const PROVIDER_FAILURE_REASON: &str = "Provider reported the collection as failed";

// ============================================================================
// Policy
// ============================================================================

/// Timing rules for the payment lifecycle.
#[derive(Debug, Clone)]
pub struct PaymentPolicy {
    /// Window in which a PENDING payment blocks a new one for the same feature.
    pub in_flight_window: chrono::Duration,
    /// Minimum age before a status poll queries the provider.
    pub reconcile_after: chrono::Duration,
    /// Age after which the janitor fails a PENDING payment.
    pub stale_after: chrono::Duration,
    /// Expiry hint returned to the client at initiation.
    pub prompt_expiry: chrono::Duration,
    pub gateway_timeout: std::time::Duration,
    pub status_check_timeout: std::time::Duration,
}

impl Default for PaymentPolicy {
    fn default() -> Self {
        Self {
            in_flight_window: chrono::Duration::minutes(15),
            reconcile_after: chrono::Duration::seconds(30),
            stale_after: chrono::Duration::minutes(15),
            prompt_expiry: chrono::Duration::minutes(5),
            gateway_timeout: std::time::Duration::from_secs(60),
            status_check_timeout: std::time::Duration::from_secs(5),
        }
    }
}

// ============================================================================
// Input / Output Types
// ============================================================================

#[derive(Debug, Clone)]
pub struct InitiatePaymentInput {
    pub user_id: Uuid,
    pub phone_number: String,
    pub provider: MobileMoneyProvider,
    pub plan_type: String,
    pub feature_type: FeatureType,
    pub idempotency_key: Option<String>,
}

/// Row to insert. The repository assigns `id`, `status` and timestamps.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub feature_type: FeatureType,
    pub plan_type: String,
    pub amount: i64,
    pub currency: String,
    pub provider: MobileMoneyProvider,
    pub phone_number: String,
    pub transaction_id: String,
    pub idempotency_key: Option<String>,
    pub request_fingerprint: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub enum CreatePaymentOutcome {
    Created(Payment),
    /// Another row already owns the idempotency key.
    DuplicateIdempotencyKey,
    /// Another PENDING row exists for the same (user, feature).
    PendingExists,
}

/// Result of a conditional `PENDING -> terminal` write.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    Applied(Payment),
    /// The payment was already terminal; carries the stored row.
    Unchanged(Payment),
}

impl TransitionOutcome {
    pub fn was_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }

    pub fn into_payment(self) -> Payment {
        match self {
            TransitionOutcome::Applied(p) | TransitionOutcome::Unchanged(p) => p,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatedPayment {
    pub payment: Payment,
    pub idempotent: bool,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub count: u64,
}

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait PaymentRepo: Send + Sync {
    async fn create(&self, input: &NewPayment) -> AppResult<CreatePaymentOutcome>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Payment>>;

    async fn get_by_idempotency_key(&self, key: &str) -> AppResult<Option<Payment>>;

    /// Most recent PENDING payment for the pair created at or after `since`.
    async fn find_pending_since(
        &self,
        user_id: Uuid,
        feature_type: FeatureType,
        since: NaiveDateTime,
    ) -> AppResult<Option<Payment>>;

    /// Fails PENDING payments for the pair created before `cutoff`.
    async fn fail_pending_before(
        &self,
        user_id: Uuid,
        feature_type: FeatureType,
        cutoff: NaiveDateTime,
        reason: &str,
    ) -> AppResult<u64>;

    /// Conditionally moves a PENDING payment to `status`. A SUCCESSFUL
    /// transition activates the owner's subscription flag in the same unit.
    async fn complete(
        &self,
        id: Uuid,
        status: PaymentStatus,
        failure_reason: Option<&str>,
    ) -> AppResult<TransitionOutcome>;

    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Payment>>;

    /// Fails every PENDING payment created before `cutoff`.
    async fn fail_stale(&self, cutoff: NaiveDateTime, reason: &str) -> AppResult<u64>;
}

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    /// Unknown users read as all-inactive.
    async fn get_subscriptions(&self, user_id: Uuid) -> AppResult<UserSubscriptions>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct PaymentUseCases {
    repo: Arc<dyn PaymentRepo>,
    subscription_repo: Arc<dyn SubscriptionRepo>,
    plans: Arc<dyn PlanCatalog>,
    gateways: Arc<GatewayRegistry>,
    scheduler: Arc<dyn SettlementScheduler>,
    policy: PaymentPolicy,
}

impl PaymentUseCases {
    pub fn new(
        repo: Arc<dyn PaymentRepo>,
        subscription_repo: Arc<dyn SubscriptionRepo>,
        plans: Arc<dyn PlanCatalog>,
        gateways: Arc<GatewayRegistry>,
        scheduler: Arc<dyn SettlementScheduler>,
        policy: PaymentPolicy,
    ) -> Self {
        Self {
            repo,
            subscription_repo,
            plans,
            gateways,
            scheduler,
            policy,
        }
    }

    /// Validates the request, applies idempotency and the in-flight guard,
    /// persists a PENDING payment and schedules settlement.
    #[instrument(skip(self, input), fields(user_id = %caller.user_id, feature = %input.feature_type))]
    pub async fn initiate(
        &self,
        caller: &Caller,
        input: InitiatePaymentInput,
    ) -> AppResult<InitiatedPayment> {
        if caller.user_id != input.user_id {
            return Err(AppError::Forbidden);
        }

        let idempotency_key = match input.idempotency_key.as_deref().map(str::trim) {
            Some(key) if !is_valid_idempotency_key(key) => {
                return Err(AppError::InvalidInput(
                    "Idempotency key must be 1-128 printable characters".into(),
                ));
            }
            Some(key) => Some(key.to_string()),
            None => None,
        };

        let phone_number = normalize_phone_number(&input.phone_number).ok_or_else(|| {
            AppError::InvalidInput("Phone number must have at least 10 digits".into())
        })?;

        let plan = self
            .plans
            .get_plan(&input.plan_type, input.feature_type)
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Unknown plan '{}' for {}",
                    input.plan_type,
                    input.feature_type.display_name()
                ))
            })?;

        self.gateways.get(input.provider)?;

        let fingerprint = request_fingerprint(
            input.user_id,
            input.feature_type,
            &plan.plan_type,
            input.provider,
            &phone_number,
        );

        if let Some(key) = idempotency_key.as_deref() {
            if let Some(existing) = self.repo.get_by_idempotency_key(key).await? {
                return self.replay(existing, input.user_id, &fingerprint);
            }
        }

        let now = Utc::now().naive_utc();
        let window_start = now - self.policy.in_flight_window;

        let new_payment = build_new_payment(
            &input,
            &plan,
            phone_number,
            idempotency_key,
            fingerprint,
            now,
        )?;

        self.expire_outside_window(input.user_id, input.feature_type, window_start)
            .await?;

        if let Some(existing) = self
            .repo
            .find_pending_since(input.user_id, input.feature_type, window_start)
            .await?
        {
            warn!(payment_id = %existing.id, "Payment already in progress");
            return Err(AppError::PaymentInProgress {
                payment_id: existing.id,
            });
        }

        for attempt in 1..=CREATE_ATTEMPTS {
            match self.repo.create(&new_payment).await? {
                CreatePaymentOutcome::Created(payment) => {
                    info!(
                        payment_id = %payment.id,
                        amount = payment.amount,
                        currency = %payment.currency,
                        provider = %payment.provider,
                        "Payment created"
                    );
                    if let Err(e) = self.scheduler.schedule(payment.id) {
                        error!(payment_id = %payment.id, error = %e, "Failed to schedule settlement");
                    }
                    let expires_at = payment.created_at + self.policy.prompt_expiry;
                    return Ok(InitiatedPayment {
                        payment,
                        idempotent: false,
                        expires_at,
                    });
                }
                CreatePaymentOutcome::DuplicateIdempotencyKey => {
                    if let Some(key) = new_payment.idempotency_key.as_deref() {
                        if let Some(existing) = self.repo.get_by_idempotency_key(key).await? {
                            return self.replay(
                                existing,
                                input.user_id,
                                &new_payment.request_fingerprint,
                            );
                        }
                    }
                }
                CreatePaymentOutcome::PendingExists => {
                    if let Some(key) = new_payment.idempotency_key.as_deref() {
                        if let Some(existing) = self.repo.get_by_idempotency_key(key).await? {
                            return self.replay(
                                existing,
                                input.user_id,
                                &new_payment.request_fingerprint,
                            );
                        }
                    }
                    if let Some(existing) = self
                        .repo
                        .find_pending_since(input.user_id, input.feature_type, window_start)
                        .await?
                    {
                        warn!(payment_id = %existing.id, "Concurrent payment won the insert");
                        return Err(AppError::PaymentInProgress {
                            payment_id: existing.id,
                        });
                    }
                    self.expire_outside_window(input.user_id, input.feature_type, window_start)
                        .await?;
                }
            }
            debug!(attempt, "Retrying payment insert after a concurrent change");
        }

        Err(AppError::Internal(
            "Payment could not be created after concurrent updates".into(),
        ))
    }

    /// Calls the provider for a PENDING payment and records the outcome.
    /// Already-terminal payments are returned untouched.
    #[instrument(skip(self))]
    pub async fn settle(&self, payment_id: Uuid) -> AppResult<Payment> {
        let payment = self
            .repo
            .get_by_id(payment_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if payment.status.is_terminal() {
            debug!(status = %payment.status, "Payment already finalized, skipping settlement");
            return Ok(payment);
        }

        let (status, reason) = self.collect(&payment).await;
        let outcome = self
            .repo
            .complete(payment.id, status, reason.as_deref())
            .await?;

        if outcome.was_applied() {
            info!(status = %status, "Payment settled");
        } else {
            info!("Payment was finalized concurrently, settlement result discarded");
        }
        Ok(outcome.into_payment())
    }

    /// Returns the stored payment, repairing it from the provider when it has
    /// been PENDING longer than the reconciliation threshold.
    #[instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn get_status(&self, caller: &Caller, payment_id: Uuid) -> AppResult<Payment> {
        let payment = self
            .repo
            .get_by_id(payment_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !caller.can_access(payment.user_id) {
            return Err(AppError::Forbidden);
        }

        let now = Utc::now().naive_utc();
        if !payment.is_pending() || payment.age(now) <= self.policy.reconcile_after {
            return Ok(payment);
        }

        Ok(self.reconcile(payment).await)
    }

    #[instrument(skip(self), fields(caller_id = %caller.user_id))]
    pub async fn get_history(&self, caller: &Caller, user_id: Uuid) -> AppResult<Vec<Payment>> {
        if !caller.can_access(user_id) {
            return Err(AppError::Forbidden);
        }
        self.repo.list_by_user(user_id).await
    }

    /// Fails every PENDING payment older than the stale cutoff.
    /// Subscription flags are never touched.
    #[instrument(skip(self))]
    pub async fn sweep_stale(&self) -> AppResult<SweepReport> {
        let cutoff = Utc::now().naive_utc() - self.policy.stale_after;
        let count = self.repo.fail_stale(cutoff, STALE_FAILURE_REASON).await?;
        if count > 0 {
            info!(count, "Failed stale pending payments");
        }
        Ok(SweepReport { count })
    }

    pub async fn sweep_stale_as(&self, caller: &Caller) -> AppResult<SweepReport> {
        if !caller.is_elevated() {
            return Err(AppError::Forbidden);
        }
        self.sweep_stale().await
    }

    pub fn list_plans(&self, feature_type: Option<FeatureType>) -> Vec<Plan> {
        self.plans.list_plans(feature_type)
    }

    #[instrument(skip(self), fields(caller_id = %caller.user_id))]
    pub async fn get_subscriptions(
        &self,
        caller: &Caller,
        user_id: Uuid,
    ) -> AppResult<UserSubscriptions> {
        if !caller.can_access(user_id) {
            return Err(AppError::Forbidden);
        }
        self.subscription_repo.get_subscriptions(user_id).await
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn replay(
        &self,
        existing: Payment,
        user_id: Uuid,
        fingerprint: &str,
    ) -> AppResult<InitiatedPayment> {
        if existing.user_id != user_id || existing.request_fingerprint != fingerprint {
            warn!(payment_id = %existing.id, "Idempotency key reused with different parameters");
            return Err(AppError::InvalidInput(
                "Idempotency key was already used for a different request".into(),
            ));
        }

        info!(payment_id = %existing.id, status = %existing.status, "Idempotent replay");
        let expires_at = existing.created_at + self.policy.prompt_expiry;
        Ok(InitiatedPayment {
            payment: existing,
            idempotent: true,
            expires_at,
        })
    }

    async fn expire_outside_window(
        &self,
        user_id: Uuid,
        feature_type: FeatureType,
        window_start: NaiveDateTime,
    ) -> AppResult<()> {
        let expired = self
            .repo
            .fail_pending_before(user_id, feature_type, window_start, SUPERSEDED_FAILURE_REASON)
            .await?;
        if expired > 0 {
            info!(count = expired, "Failed pending payments outside the in-flight window");
        }
        Ok(())
    }

    /// Any error, decline or timeout maps to FAILED with a reason.
    async fn collect(&self, payment: &Payment) -> (PaymentStatus, Option<String>) {
        let gateway = match self.gateways.get(payment.provider) {
            Ok(g) => g,
            Err(e) => {
                warn!(error = %e, "No gateway for payment provider");
                return (PaymentStatus::Failed, Some(e.to_string()));
            }
        };

        let request = CollectionRequest {
            amount: payment.amount,
            currency: payment.currency.clone(),
            phone_number: payment.phone_number.clone(),
            reference_id: payment.transaction_id.clone(),
            payer_message: format!("{} {} subscription", payment.plan_type, payment.feature_type),
        };

        let timeout = self.policy.gateway_timeout;
        match tokio::time::timeout(timeout, gateway.initiate_collection(&request)).await {
            Ok(Ok(result)) if result.success => (PaymentStatus::Successful, None),
            Ok(Ok(result)) => {
                let reason = result
                    .message
                    .unwrap_or_else(|| "Collection declined".to_string());
                warn!(reason = %reason, "Collection declined by provider");
                (PaymentStatus::Failed, Some(reason))
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Collection request failed");
                (PaymentStatus::Failed, Some(e.to_string()))
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs_f64(), "Collection request timed out");
                (
                    PaymentStatus::Failed,
                    Some(format!(
                        "Collection timed out after {}s",
                        timeout.as_secs_f64()
                    )),
                )
            }
        }
    }

    /// Best effort: every failure returns the stored payment unchanged.
    async fn reconcile(&self, payment: Payment) -> Payment {
        let gateway = match self.gateways.get(payment.provider) {
            Ok(g) => g,
            Err(e) => {
                warn!(payment_id = %payment.id, error = %e, "Cannot reconcile payment");
                return payment;
            }
        };

        let timeout = self.policy.status_check_timeout;
        let reported = match tokio::time::timeout(
            timeout,
            gateway.check_collection_status(&payment.transaction_id),
        )
        .await
        {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                warn!(payment_id = %payment.id, error = %e, "Status check failed");
                return payment;
            }
            Err(_) => {
                warn!(payment_id = %payment.id, "Status check timed out");
                return payment;
            }
        };

        let (status, reason) = match reported {
            CollectionStatus::Pending => return payment,
            CollectionStatus::Successful => (PaymentStatus::Successful, None),
            CollectionStatus::Failed => (PaymentStatus::Failed, Some(PROVIDER_FAILURE_REASON)),
        };

        match self.repo.complete(payment.id, status, reason).await {
            Ok(outcome) => {
                if outcome.was_applied() {
                    info!(payment_id = %payment.id, status = %status, "Payment reconciled");
                }
                outcome.into_payment()
            }
            Err(e) => {
                error!(payment_id = %payment.id, error = %e, "Failed to record reconciled status");
                payment
            }
        }
    }
}

fn build_new_payment(
    input: &InitiatePaymentInput,
    plan: &Plan,
    phone_number: String,
    idempotency_key: Option<String>,
    request_fingerprint: String,
    now: NaiveDateTime,
) -> AppResult<NewPayment> {
    let end_date = plan
        .duration()
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(|| {
            AppError::Internal(format!(
                "Plan {} {} has an out-of-range duration of {} days",
                plan.feature_type, plan.plan_type, plan.duration_days
            ))
        })?;

    Ok(NewPayment {
        user_id: input.user_id,
        feature_type: input.feature_type,
        plan_type: plan.plan_type.clone(),
        amount: plan.price,
        currency: plan.currency.clone(),
        provider: input.provider,
        phone_number,
        transaction_id: Uuid::new_v4().to_string(),
        idempotency_key,
        request_fingerprint,
        start_date: now,
        end_date,
    })
}

/// SHA-256 over the parameters that define "the same request".
pub fn request_fingerprint(
    user_id: Uuid,
    feature_type: FeatureType,
    plan_type: &str,
    provider: MobileMoneyProvider,
    phone_number: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(
        format!(
            "{}|{}|{}|{}|{}",
            user_id,
            feature_type,
            plan_type.to_ascii_uppercase(),
            provider,
            phone_number
        )
        .as_bytes(),
    );
    hex::encode(hasher.finalize())
}
