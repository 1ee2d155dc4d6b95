//! Builders wiring `PaymentUseCases` and `AppState` from in-memory doubles.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        jwt,
        ports::plan_catalog::PlanCatalog,
        use_cases::{
            gateway_registry::GatewayRegistry,
            payment::{PaymentPolicy, PaymentRepo, PaymentUseCases, SubscriptionRepo},
        },
    },
    domain::entities::{caller::CallerRole, mobile_money_provider::MobileMoneyProvider},
    infra::{config::AppConfig, plan_catalog::StaticPlanCatalog},
    test_utils::{InMemoryPaymentStore, MockGateway, RecordingScheduler},
};

const TEST_JWT_SECRET: &str = "test-jwt-secret-that-is-long-enough-for-hs256";

/// Default policy with gateway timeouts short enough for `Hang` doubles.
pub fn test_policy() -> PaymentPolicy {
    PaymentPolicy {
        gateway_timeout: std::time::Duration::from_millis(100),
        status_check_timeout: std::time::Duration::from_millis(100),
        ..PaymentPolicy::default()
    }
}

// ============================================================================
// PaymentHarness
// ============================================================================

/// Use cases plus handles to every double behind them.
pub struct PaymentHarness {
    pub store: Arc<InMemoryPaymentStore>,
    pub gateway: Arc<MockGateway>,
    pub scheduler: Arc<RecordingScheduler>,
    pub use_cases: PaymentUseCases,
}

impl PaymentHarness {
    /// Approving MTN gateway and a recording scheduler.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_store(store: Arc<InMemoryPaymentStore>) -> Self {
        Self::builder().store(store).build()
    }

    pub fn builder() -> PaymentHarnessBuilder {
        PaymentHarnessBuilder::default()
    }
}

#[derive(Default)]
pub struct PaymentHarnessBuilder {
    store: Option<Arc<InMemoryPaymentStore>>,
    gateway: Option<MockGateway>,
    scheduler: Option<RecordingScheduler>,
    plans: Option<StaticPlanCatalog>,
}

impl PaymentHarnessBuilder {
    pub fn store(mut self, store: Arc<InMemoryPaymentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn gateway(mut self, gateway: MockGateway) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn scheduler(mut self, scheduler: RecordingScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn plans(mut self, plans: StaticPlanCatalog) -> Self {
        self.plans = Some(plans);
        self
    }

    pub fn build(self) -> PaymentHarness {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryPaymentStore::new()));
        let gateway = Arc::new(
            self.gateway
                .unwrap_or_else(|| MockGateway::approving(MobileMoneyProvider::Mtn)),
        );
        let scheduler = Arc::new(self.scheduler.unwrap_or_default());
        let plans = self.plans.unwrap_or_else(StaticPlanCatalog::builtin);

        let gateways = GatewayRegistry::new().with_gateway(gateway.clone());
        let use_cases = PaymentUseCases::new(
            store.clone() as Arc<dyn PaymentRepo>,
            store.clone() as Arc<dyn SubscriptionRepo>,
            Arc::new(plans) as Arc<dyn PlanCatalog>,
            Arc::new(gateways),
            scheduler.clone(),
            test_policy(),
        );

        PaymentHarness {
            store,
            gateway,
            scheduler,
            use_cases,
        }
    }
}

// ============================================================================
// TestAppStateBuilder
// ============================================================================

pub struct TestApp {
    pub app_state: AppState,
    pub store: Arc<InMemoryPaymentStore>,
    pub gateway: Arc<MockGateway>,
    pub scheduler: Arc<RecordingScheduler>,
}

impl TestApp {
    /// Signed access token accepted by `app_state`.
    pub fn token(&self, user_id: Uuid, role: CallerRole) -> String {
        jwt::issue(
            user_id,
            role,
            &self.app_state.config.jwt_secret,
            Duration::minutes(15),
        )
        .unwrap()
    }
}

/// Creates an `AppState` backed by in-memory doubles for route tests.
#[derive(Default)]
pub struct TestAppStateBuilder {
    gateway: Option<MockGateway>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gateway(mut self, gateway: MockGateway) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn build(self) -> TestApp {
        let mut harness = PaymentHarness::builder();
        if let Some(gateway) = self.gateway {
            harness = harness.gateway(gateway);
        }
        let harness = harness.build();

        let app_state = AppState {
            config: Arc::new(test_config()),
            payment_use_cases: Arc::new(harness.use_cases),
        };

        TestApp {
            app_state,
            store: harness.store,
            gateway: harness.gateway,
            scheduler: harness.scheduler,
        }
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://localhost/momo_billing_test".to_string(),
        jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        run_migrations: false,
        payment_policy: test_policy(),
        settlement_queue_capacity: 16,
        settlement_max_concurrent: 1,
        janitor_interval: None,
        plan_catalog_path: None,
        gateways: vec![],
        sandbox_gateways: false,
    }
}
