use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        // Log the error before it gets converted into a status response.
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        let code = self.code();
        match self {
            AppError::InvalidInput(msg) => error_resp(status, code, Some(msg), None),
            AppError::PaymentInProgress { payment_id } => error_resp(
                status,
                code,
                Some("A payment for this feature is already in progress".into()),
                Some(payment_id),
            ),
            _ => error_resp(status, code, None, None),
        }
    }
}

fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AppError::PaymentInProgress { .. } => StatusCode::CONFLICT,
        AppError::Forbidden => StatusCode::FORBIDDEN,
        AppError::NotFound => StatusCode::NOT_FOUND,
        AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_resp(
    status: StatusCode,
    code: ErrorCode,
    message: Option<String>,
    payment_id: Option<Uuid>,
) -> Response {
    let mut body = serde_json::json!({ "code": code.as_str() });
    if let Some(msg) = message {
        body["message"] = serde_json::Value::String(msg);
    }
    if let Some(id) = payment_id {
        body["payment_id"] = serde_json::Value::String(id.to_string());
    }
    (status, Json(body)).into_response()
}
