use axum::http::{HeaderMap, header::AUTHORIZATION};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt,
    domain::entities::caller::Caller,
};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Resolves the caller from a Bearer token, falling back to the
/// `access_token` cookie.
pub fn current_caller(
    headers: &HeaderMap,
    jar: &CookieJar,
    app_state: &AppState,
) -> AppResult<Caller> {
    let token = match bearer_token(headers) {
        Some(token) => token.to_string(),
        None => jar
            .get(ACCESS_TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or(AppError::InvalidCredentials)?,
    };

    let claims = jwt::verify(&token, &app_state.config.jwt_secret)?;
    claims.caller()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() { None } else { Some(token) }
}
