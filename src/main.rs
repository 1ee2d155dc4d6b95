use dotenvy::dotenv;
use tracing::info;

use momo_billing::infra::{
    app::create_app,
    setup::{init_app_state, init_tracing},
    stale_payment_janitor::run_stale_payment_janitor,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let (app_state, settlement_worker) = init_app_state().await?;

    // Read bind address from config before moving app_state
    let bind_addr = app_state.config.bind_addr;

    tokio::spawn(settlement_worker.run(Arc::clone(&app_state.payment_use_cases)));

    if let Some(every) = app_state.config.janitor_interval {
        tokio::spawn(run_stale_payment_janitor(
            Arc::clone(&app_state.payment_use_cases),
            every,
        ));
    }

    let app = create_app(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Backend listening at {}", &listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
