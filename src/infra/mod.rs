use crate::{adapters::persistence::PostgresPersistence, infra::db::init_db};

pub mod app;
pub mod config;
pub mod db;
pub mod http_client;
pub mod http_collection_gateway;
pub mod plan_catalog;
pub mod sandbox_gateway;
pub mod settlement_worker;
pub mod setup;
pub mod stale_payment_janitor;

pub async fn postgres_persistence(database_url: &str) -> anyhow::Result<PostgresPersistence> {
    let pool = init_db(database_url).await?;
    let persistence = PostgresPersistence::new(pool);
    Ok(persistence)
}
