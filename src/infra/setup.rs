use crate::{
    adapters::http::app_state::AppState,
    application::ports::plan_catalog::PlanCatalog,
    domain::entities::mobile_money_provider::MobileMoneyProvider,
    infra::{
        config::AppConfig,
        db::run_migrations,
        http_collection_gateway::HttpCollectionGateway,
        plan_catalog::StaticPlanCatalog,
        postgres_persistence,
        sandbox_gateway::SandboxGateway,
        settlement_worker::{SettlementWorker, settlement_channel},
    },
    use_cases::{
        gateway_registry::GatewayRegistry,
        payment::{PaymentRepo, PaymentUseCases, SubscriptionRepo},
    },
};
use anyhow::Context;
use std::fs::File;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const GATEWAY_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Builds the application state and the settlement worker that must be
/// spawned alongside the server.
pub async fn init_app_state() -> anyhow::Result<(AppState, SettlementWorker)> {
    let mut config = AppConfig::from_env()?;

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);
    if config.run_migrations {
        run_migrations(postgres_arc.pool()).await?;
    }

    let plans: Arc<dyn PlanCatalog> = match &config.plan_catalog_path {
        Some(path) => {
            info!("Loading plan catalog from {}", path.display());
            Arc::new(StaticPlanCatalog::from_json_file(path)?)
        }
        None => Arc::new(StaticPlanCatalog::builtin()),
    };

    let gateways = build_gateways(&mut config)?;
    if gateways.providers().is_empty() {
        warn!("No mobile money gateway configured; every payment will be rejected");
    }

    let (queue, worker) = settlement_channel(
        config.settlement_queue_capacity,
        config.settlement_max_concurrent,
    );

    let payment_use_cases = PaymentUseCases::new(
        postgres_arc.clone() as Arc<dyn PaymentRepo>,
        postgres_arc as Arc<dyn SubscriptionRepo>,
        plans,
        Arc::new(gateways),
        Arc::new(queue),
        config.payment_policy.clone(),
    );

    let app_state = AppState {
        config: Arc::new(config),
        payment_use_cases: Arc::new(payment_use_cases),
    };
    Ok((app_state, worker))
}

/// HTTP gateways for configured bridges, sandbox gateways for the rest when
/// enabled. Gateway credentials are moved out of the config.
fn build_gateways(config: &mut AppConfig) -> anyhow::Result<GatewayRegistry> {
    let mut registry = GatewayRegistry::new();

    for gateway_config in std::mem::take(&mut config.gateways) {
        let provider = gateway_config.provider;
        info!(%provider, url = %gateway_config.base_url, "Registering collection gateway");
        let gateway = HttpCollectionGateway::new(gateway_config, GATEWAY_REQUEST_TIMEOUT)
            .with_context(|| format!("cannot build {provider} gateway"))?;
        registry.register(Arc::new(gateway));
    }

    if config.sandbox_gateways {
        for provider in MobileMoneyProvider::all() {
            if registry.supports(*provider) {
                continue;
            }
            warn!(%provider, "Registering sandbox gateway");
            registry.register(Arc::new(SandboxGateway::new(*provider)));
        }
    }

    Ok(registry)
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "momo_billing=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let json_layer = match File::create("app.log") {
        Ok(file) => Some(
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(true)
                .with_span_list(true),
        ),
        Err(e) => {
            eprintln!("cannot create app.log, file logging disabled: {e}");
            None
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
