pub mod admin;
pub mod payments;
pub mod plans;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(payments::router())
        .merge(plans::router())
        .nest("/admin", admin::router())
}
