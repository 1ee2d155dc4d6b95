use axum::{
    Json, Router, extract::State, http::HeaderMap, response::IntoResponse, routing::post,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    adapters::http::{app_state::AppState, auth::current_caller},
    app_error::AppResult,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/payments/sweep", post(sweep_stale_payments))
}

/// POST /api/admin/payments/sweep
async fn sweep_stale_payments(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    let caller = current_caller(&headers, &jar, &app_state)?;
    let report = app_state.payment_use_cases.sweep_stale_as(&caller).await?;
    Ok(Json(report))
}
