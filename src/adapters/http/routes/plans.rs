use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::app_state::AppState,
    domain::entities::{feature_type::FeatureType, plan::Plan},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/plans", get(list_plans))
}

#[derive(Deserialize)]
struct PlansQuery {
    feature_type: Option<FeatureType>,
}

#[derive(Serialize)]
struct PlansResponse {
    plans: Vec<Plan>,
}

/// GET /api/plans
/// Public; optionally filtered by `feature_type`.
async fn list_plans(
    State(app_state): State<AppState>,
    Query(query): Query<PlansQuery>,
) -> impl IntoResponse {
    let plans = app_state.payment_use_cases.list_plans(query.feature_type);
    Json(PlansResponse { plans })
}
