use sqlx::PgPool;

use crate::app_error::AppError;

pub mod payment;
pub mod user_subscription;

/// Unique constraint on `payments.idempotency_key`.
pub const IDEMPOTENCY_KEY_CONSTRAINT: &str = "payments_idempotency_key_key";
/// Unique partial index: one PENDING payment per (user_id, feature_type).
pub const ONE_PENDING_CONSTRAINT: &str = "payments_one_pending_per_feature";

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::InvalidInput("Payment owner does not exist".into())
            }
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                tracing::warn!(constraint = ?db_err.constraint(), "Payment row rejected by check");
                AppError::InvalidInput("Payment violates a schema constraint".into())
            }
            sqlx::Error::PoolTimedOut => {
                tracing::error!("Database pool exhausted");
                AppError::Database("Database unavailable".into())
            }
            _ => {
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}
