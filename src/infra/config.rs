use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};
use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

use crate::{
    domain::entities::mobile_money_provider::MobileMoneyProvider,
    use_cases::payment::PaymentPolicy,
};

/// Connection settings for one provider's collection bridge.
pub struct GatewayConfig {
    pub provider: MobileMoneyProvider,
    pub base_url: Url,
    pub api_user: String,
    pub api_key: SecretString,
}

pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: SecretString,
    pub bind_addr: SocketAddr,
    pub cors_origin: HeaderValue,
    /// Apply `migrations/` at startup.
    pub run_migrations: bool,
    pub payment_policy: PaymentPolicy,
    pub settlement_queue_capacity: usize,
    pub settlement_max_concurrent: usize,
    /// `None` disables the scheduled sweep; the admin endpoint still works.
    pub janitor_interval: Option<std::time::Duration>,
    /// JSON file replacing the built-in plan catalog.
    pub plan_catalog_path: Option<PathBuf>,
    pub gateways: Vec<GatewayConfig>,
    /// Register the sandbox gateway for providers without a bridge URL.
    pub sandbox_gateways: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url: String = get_env("DATABASE_URL");
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());

        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", String::from("127.0.0.1:3001"))
            .parse()
            .context("BIND_ADDR must be a socket address")?;
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .context("CORS_ORIGIN must be a valid header value")?;
        let run_migrations: bool = get_env_default("RUN_MIGRATIONS", true);

        let in_flight_window_secs: i64 = get_env_default("PAYMENT_IN_FLIGHT_WINDOW_SECS", 900);
        let reconcile_after_secs: i64 = get_env_default("PAYMENT_RECONCILE_AFTER_SECS", 30);
        let stale_after_secs: i64 = get_env_default("PAYMENT_STALE_AFTER_SECS", 900);
        let prompt_expiry_secs: i64 = get_env_default("PAYMENT_PROMPT_EXPIRY_SECS", 300);
        let gateway_timeout_secs: u64 = get_env_default("GATEWAY_TIMEOUT_SECS", 60);
        let status_timeout_secs: u64 = get_env_default("GATEWAY_STATUS_TIMEOUT_SECS", 5);

        if in_flight_window_secs <= 0 || stale_after_secs <= 0 {
            bail!("PAYMENT_IN_FLIGHT_WINDOW_SECS and PAYMENT_STALE_AFTER_SECS must be positive");
        }
        if gateway_timeout_secs == 0 || status_timeout_secs == 0 {
            bail!("Gateway timeouts must be at least one second");
        }

        let payment_policy = PaymentPolicy {
            in_flight_window: chrono::Duration::seconds(in_flight_window_secs),
            reconcile_after: chrono::Duration::seconds(reconcile_after_secs.max(0)),
            stale_after: chrono::Duration::seconds(stale_after_secs),
            prompt_expiry: chrono::Duration::seconds(prompt_expiry_secs.max(0)),
            gateway_timeout: std::time::Duration::from_secs(gateway_timeout_secs),
            status_check_timeout: std::time::Duration::from_secs(status_timeout_secs),
        };
        check_policy(&payment_policy)?;

        let settlement_queue_capacity: usize = get_env_default("SETTLEMENT_QUEUE_CAPACITY", 1024);
        let settlement_max_concurrent: usize = get_env_default("SETTLEMENT_MAX_CONCURRENT", 16);
        if settlement_queue_capacity == 0 || settlement_max_concurrent == 0 {
            bail!("SETTLEMENT_QUEUE_CAPACITY and SETTLEMENT_MAX_CONCURRENT must be positive");
        }

        let janitor_interval_secs: u64 = get_env_default("JANITOR_INTERVAL_SECS", 60);
        let janitor_interval =
            (janitor_interval_secs > 0).then(|| std::time::Duration::from_secs(janitor_interval_secs));

        let plan_catalog_path: Option<PathBuf> =
            std::env::var("PLAN_CATALOG_PATH").ok().map(PathBuf::from);

        let mut gateways = Vec::new();
        for provider in MobileMoneyProvider::all() {
            if let Some(gateway) = gateway_from_env(*provider)? {
                gateways.push(gateway);
            }
        }
        let sandbox_gateways: bool = get_env_default("SANDBOX_GATEWAYS", false);

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            cors_origin,
            run_migrations,
            payment_policy,
            settlement_queue_capacity,
            settlement_max_concurrent,
            janitor_interval,
            plan_catalog_path,
            gateways,
            sandbox_gateways,
        })
    }
}

/// Reads `{PREFIX}_GATEWAY_URL`, `{PREFIX}_GATEWAY_API_USER` and
/// `{PREFIX}_GATEWAY_API_KEY`. The provider is skipped when no URL is set.
fn gateway_from_env(provider: MobileMoneyProvider) -> anyhow::Result<Option<GatewayConfig>> {
    gateway_from_lookup(provider, |key| std::env::var(key).ok())
}

fn gateway_from_lookup(
    provider: MobileMoneyProvider,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Option<GatewayConfig>> {
    let prefix = provider.env_prefix();
    let Some(raw_url) = lookup(&format!("{prefix}_GATEWAY_URL")) else {
        return Ok(None);
    };

    let base_url = Url::parse(&raw_url)
        .with_context(|| format!("{prefix}_GATEWAY_URL must be an absolute URL"))?;
    let api_user = lookup(&format!("{prefix}_GATEWAY_API_USER")).unwrap_or_default();
    let api_key = lookup(&format!("{prefix}_GATEWAY_API_KEY")).unwrap_or_default();

    Ok(Some(GatewayConfig {
        provider,
        base_url,
        api_user,
        api_key: SecretString::new(api_key.into()),
    }))
}

/// The in-flight window and stale cutoff must both exceed the gateway timeout
/// so no PENDING row is failed while its collection is still running.
fn check_policy(policy: &PaymentPolicy) -> anyhow::Result<()> {
    let gateway_timeout = chrono::Duration::from_std(policy.gateway_timeout)
        .context("GATEWAY_TIMEOUT_SECS is out of range")?;
    if policy.in_flight_window <= gateway_timeout {
        bail!("PAYMENT_IN_FLIGHT_WINDOW_SECS must exceed GATEWAY_TIMEOUT_SECS");
    }
    if policy.stale_after <= gateway_timeout {
        bail!("PAYMENT_STALE_AFTER_SECS must exceed GATEWAY_TIMEOUT_SECS");
    }
    Ok(())
}
