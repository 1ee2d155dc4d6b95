//! In-memory doubles for the payment repositories, gateway and scheduler.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::{
        mobile_money::{CollectionRequest, CollectionResult, CollectionStatus, MobileMoneyGateway},
        settlement::SettlementScheduler,
    },
    domain::entities::{
        feature_type::FeatureType, mobile_money_provider::MobileMoneyProvider, payment::Payment,
        payment_status::PaymentStatus, subscription_status::UserSubscriptions,
    },
    use_cases::payment::{
        CreatePaymentOutcome, NewPayment, PaymentRepo, SubscriptionRepo, TransitionOutcome,
    },
};

// ============================================================================
// InMemoryPaymentStore
// ============================================================================

#[derive(Default)]
struct StoreState {
    payments: HashMap<Uuid, Payment>,
    subscriptions: HashMap<Uuid, UserSubscriptions>,
    transitions: HashMap<Uuid, Vec<PaymentStatus>>,
}

impl StoreState {
    fn fail(&mut self, id: Uuid, reason: &str) {
        if let Some(payment) = self.payments.get_mut(&id) {
            payment.status = PaymentStatus::Failed;
            payment.failure_reason = Some(reason.to_string());
            payment.updated_at = Utc::now().naive_utc();
            self.transitions
                .entry(id)
                .or_default()
                .push(PaymentStatus::Failed);
        }
    }
}

/// Payments and subscription flags behind one lock, so `complete` is atomic
/// the way the Postgres transaction is.
///
/// `create` enforces both unique constraints. `insert` bypasses them for
/// seeding fixtures.
#[derive(Default)]
pub struct InMemoryPaymentStore {
    state: Mutex<StoreState>,
    blind_guard: AtomicBool,
    blind_key_lookup: AtomicBool,
    pending_index_first: AtomicBool,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `find_pending_since` that would find a row reports none,
    /// simulating a concurrent insert landing after the guard check.
    pub fn with_blind_guard(self) -> Self {
        self.blind_guard.store(true, Ordering::SeqCst);
        self
    }

    /// Same as `with_blind_guard` for the next `get_by_idempotency_key` that
    /// would find a row.
    pub fn with_blind_key_lookup(self) -> Self {
        self.blind_key_lookup.store(true, Ordering::SeqCst);
        self
    }

    /// `create` checks the one-pending index before the idempotency key.
    pub fn with_pending_index_checked_first(self) -> Self {
        self.pending_index_first.store(true, Ordering::SeqCst);
        self
    }

    pub fn insert(&self, payment: Payment) {
        self.state
            .lock()
            .unwrap()
            .payments
            .insert(payment.id, payment);
    }

    pub fn get(&self, id: Uuid) -> Option<Payment> {
        self.state.lock().unwrap().payments.get(&id).cloned()
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.state
            .lock()
            .unwrap()
            .payments
            .values()
            .cloned()
            .collect()
    }

    pub fn subscriptions(&self, user_id: Uuid) -> UserSubscriptions {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .get(&user_id)
            .copied()
            .unwrap_or_else(|| UserSubscriptions::inactive(user_id))
    }

    /// Payment and flags read under the same lock.
    pub fn snapshot(&self, id: Uuid, user_id: Uuid) -> (Option<Payment>, UserSubscriptions) {
        let state = self.state.lock().unwrap();
        let payment = state.payments.get(&id).cloned();
        let subs = state
            .subscriptions
            .get(&user_id)
            .copied()
            .unwrap_or_else(|| UserSubscriptions::inactive(user_id));
        (payment, subs)
    }

    /// Terminal statuses applied to `id`, in order.
    pub fn transitions(&self, id: Uuid) -> Vec<PaymentStatus> {
        self.state
            .lock()
            .unwrap()
            .transitions
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl PaymentRepo for InMemoryPaymentStore {
    async fn create(&self, input: &NewPayment) -> AppResult<CreatePaymentOutcome> {
        let mut state = self.state.lock().unwrap();

        let key_taken = input.idempotency_key.as_deref().is_some_and(|key| {
            state
                .payments
                .values()
                .any(|p| p.idempotency_key.as_deref() == Some(key))
        });
        let pending_taken = state.payments.values().any(|p| {
            p.user_id == input.user_id && p.feature_type == input.feature_type && p.is_pending()
        });

        let pending_first = self.pending_index_first.load(Ordering::SeqCst);
        match (key_taken, pending_taken) {
            (true, true) if pending_first => return Ok(CreatePaymentOutcome::PendingExists),
            (true, _) => return Ok(CreatePaymentOutcome::DuplicateIdempotencyKey),
            (false, true) => return Ok(CreatePaymentOutcome::PendingExists),
            (false, false) => {}
        }

        let payment = Payment {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            feature_type: input.feature_type,
            plan_type: input.plan_type.clone(),
            amount: input.amount,
            currency: input.currency.clone(),
            provider: input.provider,
            phone_number: input.phone_number.clone(),
            transaction_id: input.transaction_id.clone(),
            idempotency_key: input.idempotency_key.clone(),
            request_fingerprint: input.request_fingerprint.clone(),
            status: PaymentStatus::Pending,
            failure_reason: None,
            start_date: input.start_date,
            end_date: input.end_date,
            created_at: input.start_date,
            updated_at: input.start_date,
        };
        state.payments.insert(payment.id, payment.clone());
        Ok(CreatePaymentOutcome::Created(payment))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Payment>> {
        Ok(self.get(id))
    }

    async fn get_by_idempotency_key(&self, key: &str) -> AppResult<Option<Payment>> {
        let found = self
            .state
            .lock()
            .unwrap()
            .payments
            .values()
            .find(|p| p.idempotency_key.as_deref() == Some(key))
            .cloned();

        if found.is_some() && self.blind_key_lookup.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(found)
    }

    async fn find_pending_since(
        &self,
        user_id: Uuid,
        feature_type: FeatureType,
        since: NaiveDateTime,
    ) -> AppResult<Option<Payment>> {
        let found = self
            .state
            .lock()
            .unwrap()
            .payments
            .values()
            .filter(|p| {
                p.user_id == user_id
                    && p.feature_type == feature_type
                    && p.is_pending()
                    && p.created_at >= since
            })
            .max_by_key(|p| p.created_at)
            .cloned();

        if found.is_some() && self.blind_guard.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(found)
    }

    async fn fail_pending_before(
        &self,
        user_id: Uuid,
        feature_type: FeatureType,
        cutoff: NaiveDateTime,
        reason: &str,
    ) -> AppResult<u64> {
        let mut state = self.state.lock().unwrap();
        let ids: Vec<Uuid> = state
            .payments
            .values()
            .filter(|p| {
                p.user_id == user_id
                    && p.feature_type == feature_type
                    && p.is_pending()
                    && p.created_at < cutoff
            })
            .map(|p| p.id)
            .collect();
        for id in &ids {
            state.fail(*id, reason);
        }
        Ok(ids.len() as u64)
    }

    async fn complete(
        &self,
        id: Uuid,
        status: PaymentStatus,
        failure_reason: Option<&str>,
    ) -> AppResult<TransitionOutcome> {
        if !PaymentStatus::Pending.can_transition_to(status) {
            return Err(AppError::Internal(format!(
                "Refusing transition to non-terminal status {status}"
            )));
        }

        let mut state = self.state.lock().unwrap();
        let payment = state.payments.get_mut(&id).ok_or(AppError::NotFound)?;
        if !payment.is_pending() {
            return Ok(TransitionOutcome::Unchanged(payment.clone()));
        }

        payment.status = status;
        payment.failure_reason = failure_reason.map(str::to_string);
        payment.updated_at = Utc::now().naive_utc();
        let payment = payment.clone();

        state.transitions.entry(id).or_default().push(status);
        if status.is_successful() {
            state
                .subscriptions
                .entry(payment.user_id)
                .or_insert_with(|| UserSubscriptions::inactive(payment.user_id))
                .activate(payment.feature_type);
        }
        Ok(TransitionOutcome::Applied(payment))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .state
            .lock()
            .unwrap()
            .payments
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    async fn fail_stale(&self, cutoff: NaiveDateTime, reason: &str) -> AppResult<u64> {
        let mut state = self.state.lock().unwrap();
        let ids: Vec<Uuid> = state
            .payments
            .values()
            .filter(|p| p.is_pending() && p.created_at < cutoff)
            .map(|p| p.id)
            .collect();
        for id in &ids {
            state.fail(*id, reason);
        }
        Ok(ids.len() as u64)
    }
}

#[async_trait]
impl SubscriptionRepo for InMemoryPaymentStore {
    async fn get_subscriptions(&self, user_id: Uuid) -> AppResult<UserSubscriptions> {
        Ok(self.subscriptions(user_id))
    }
}

// ============================================================================
// MockGateway
// ============================================================================

const HANG: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub enum CollectionBehavior {
    Approve,
    /// Approves once `Duration` has elapsed.
    ApproveAfter(Duration),
    Decline(String),
    Error(String),
    /// Never answers; exercises the caller's timeout.
    Hang,
}

#[derive(Debug, Clone)]
pub enum StatusBehavior {
    Report(CollectionStatus),
    Error(String),
    Hang,
}

pub struct MockGateway {
    provider: MobileMoneyProvider,
    collection: CollectionBehavior,
    status: StatusBehavior,
    collection_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl MockGateway {
    pub fn new(
        provider: MobileMoneyProvider,
        collection: CollectionBehavior,
        status: StatusBehavior,
    ) -> Self {
        Self {
            provider,
            collection,
            status,
            collection_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub fn approving(provider: MobileMoneyProvider) -> Self {
        Self::new(
            provider,
            CollectionBehavior::Approve,
            StatusBehavior::Report(CollectionStatus::Successful),
        )
    }

    pub fn collection_calls(&self) -> usize {
        self.collection_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MobileMoneyGateway for MockGateway {
    fn provider(&self) -> MobileMoneyProvider {
        self.provider
    }

    async fn initiate_collection(
        &self,
        _request: &CollectionRequest,
    ) -> AppResult<CollectionResult> {
        self.collection_calls.fetch_add(1, Ordering::SeqCst);
        match &self.collection {
            CollectionBehavior::Approve => Ok(CollectionResult::approved()),
            CollectionBehavior::ApproveAfter(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(CollectionResult::approved())
            }
            CollectionBehavior::Decline(msg) => Ok(CollectionResult::declined(msg.clone())),
            CollectionBehavior::Error(msg) => Err(AppError::Gateway(msg.clone())),
            CollectionBehavior::Hang => {
                tokio::time::sleep(HANG).await;
                Ok(CollectionResult::approved())
            }
        }
    }

    async fn check_collection_status(&self, _reference_id: &str) -> AppResult<CollectionStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        match &self.status {
            StatusBehavior::Report(status) => Ok(*status),
            StatusBehavior::Error(msg) => Err(AppError::Gateway(msg.clone())),
            StatusBehavior::Hang => {
                tokio::time::sleep(HANG).await;
                Ok(CollectionStatus::Pending)
            }
        }
    }
}

// ============================================================================
// RecordingScheduler
// ============================================================================

/// Records scheduled payment ids instead of settling them.
#[derive(Default)]
pub struct RecordingScheduler {
    scheduled: Mutex<Vec<Uuid>>,
    fail: bool,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            scheduled: Mutex::new(vec![]),
            fail: true,
        }
    }

    pub fn scheduled(&self) -> Vec<Uuid> {
        self.scheduled.lock().unwrap().clone()
    }
}

impl SettlementScheduler for RecordingScheduler {
    fn schedule(&self, payment_id: Uuid) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Internal("Settlement queue is full".into()));
        }
        self.scheduled.lock().unwrap().push(payment_id);
        Ok(())
    }
}
