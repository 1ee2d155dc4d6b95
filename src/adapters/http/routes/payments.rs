use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, auth::current_caller},
    app_error::{AppError, AppResult},
    application::use_cases::payment::InitiatePaymentInput,
    domain::entities::{feature_type::FeatureType, mobile_money_provider::MobileMoneyProvider},
};

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payments", post(initiate_payment))
        .route("/payments/history", get(get_history))
        .route("/payments/subscriptions", get(get_subscriptions))
        .route("/payments/{id}", get(get_payment))
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiatePaymentPayload {
    /// Defaults to the caller.
    user_id: Option<Uuid>,
    phone_number: String,
    provider: MobileMoneyProvider,
    plan_type: String,
    feature_type: FeatureType,
    idempotency_key: Option<String>,
}

#[derive(Deserialize)]
struct UserQuery {
    user_id: Option<Uuid>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/payments
/// 201 for a new payment, 200 for an idempotent replay.
async fn initiate_payment(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(payload): Json<InitiatePaymentPayload>,
) -> AppResult<impl IntoResponse> {
    let caller = current_caller(&headers, &jar, &app_state)?;
    let idempotency_key = resolve_idempotency_key(&headers, payload.idempotency_key)?;

    let input = InitiatePaymentInput {
        user_id: payload.user_id.unwrap_or(caller.user_id),
        phone_number: payload.phone_number,
        provider: payload.provider,
        plan_type: payload.plan_type,
        feature_type: payload.feature_type,
        idempotency_key,
    };

    let result = app_state.payment_use_cases.initiate(&caller, input).await?;
    let status = if result.idempotent {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(result)))
}

/// GET /api/payments/{id}
/// May reconcile a stale PENDING payment with the provider before answering.
async fn get_payment(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let caller = current_caller(&headers, &jar, &app_state)?;
    let payment = app_state.payment_use_cases.get_status(&caller, id).await?;
    Ok(Json(payment))
}

/// GET /api/payments/history
async fn get_history(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<UserQuery>,
) -> AppResult<impl IntoResponse> {
    let caller = current_caller(&headers, &jar, &app_state)?;
    let user_id = query.user_id.unwrap_or(caller.user_id);
    let payments = app_state
        .payment_use_cases
        .get_history(&caller, user_id)
        .await?;
    Ok(Json(payments))
}

/// GET /api/payments/subscriptions
async fn get_subscriptions(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<UserQuery>,
) -> AppResult<impl IntoResponse> {
    let caller = current_caller(&headers, &jar, &app_state)?;
    let user_id = query.user_id.unwrap_or(caller.user_id);
    let subscriptions = app_state
        .payment_use_cases
        .get_subscriptions(&caller, user_id)
        .await?;
    Ok(Json(subscriptions))
}

/// Header and body may both carry the key, but they must agree.
fn resolve_idempotency_key(
    headers: &HeaderMap,
    body_key: Option<String>,
) -> AppResult<Option<String>> {
    let header_key = match headers.get(IDEMPOTENCY_KEY_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| AppError::InvalidInput("Idempotency-Key must be ASCII".into()))?
                .to_string(),
        ),
        None => None,
    };

    match (header_key, body_key) {
        (Some(h), Some(b)) if h.trim() != b.trim() => Err(AppError::InvalidInput(
            "Idempotency-Key header does not match idempotencyKey".into(),
        )),
        (Some(h), _) => Ok(Some(h)),
        (None, b) => Ok(b),
    }
}
