use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use crate::use_cases::payment::PaymentUseCases;

pub async fn run_stale_payment_janitor(payment_use_cases: Arc<PaymentUseCases>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Stale payment janitor started (sweeping every {}s)",
        every.as_secs()
    );

    loop {
        ticker.tick().await;
        sweep_once(&payment_use_cases).await;
    }
}

async fn sweep_once(payment_use_cases: &PaymentUseCases) {
    if let Err(e) = payment_use_cases.sweep_stale().await {
        error!(error = ?e, "Stale payment sweep failed");
    }
}
