use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    adapters::persistence::{IDEMPOTENCY_KEY_CONSTRAINT, ONE_PENDING_CONSTRAINT, PostgresPersistence},
    app_error::{AppError, AppResult},
    application::use_cases::payment::{
        CreatePaymentOutcome, NewPayment, PaymentRepo, TransitionOutcome,
    },
    domain::entities::{feature_type::FeatureType, payment::Payment, payment_status::PaymentStatus},
};

const SELECT_COLS: &str = r#"
    id, user_id, feature_type, plan_type, amount, currency, provider,
    phone_number, transaction_id, idempotency_key, request_fingerprint,
    status, failure_reason, start_date, end_date, created_at, updated_at
"#;

fn subscription_column(feature_type: FeatureType) -> &'static str {
    match feature_type {
        FeatureType::Survey => "survey_subscription_status",
        FeatureType::Video => "video_subscription_status",
    }
}

#[async_trait]
impl PaymentRepo for PostgresPersistence {
    async fn create(&self, input: &NewPayment) -> AppResult<CreatePaymentOutcome> {
        let id = Uuid::new_v4();
        let result = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (
                id, user_id, feature_type, plan_type, amount, currency, provider,
                phone_number, transaction_id, idempotency_key, request_fingerprint,
                status, start_date, end_date, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'pending', $12, $13, $12, $12)
            RETURNING {SELECT_COLS}
            "#
        ))
        .bind(id)
        .bind(input.user_id)
        .bind(input.feature_type)
        .bind(&input.plan_type)
        .bind(input.amount)
        .bind(&input.currency)
        .bind(input.provider)
        .bind(&input.phone_number)
        .bind(&input.transaction_id)
        .bind(&input.idempotency_key)
        .bind(&input.request_fingerprint)
        .bind(input.start_date)
        .bind(input.end_date)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(payment) => Ok(CreatePaymentOutcome::Created(payment)),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                let constraint = db_err.constraint().map(str::to_owned);
                match constraint.as_deref() {
                    Some(IDEMPOTENCY_KEY_CONSTRAINT) => {
                        Ok(CreatePaymentOutcome::DuplicateIdempotencyKey)
                    }
                    Some(ONE_PENDING_CONSTRAINT) => Ok(CreatePaymentOutcome::PendingExists),
                    _ => Err(AppError::from(sqlx::Error::Database(db_err))),
                }
            }
            Err(e) => Err(AppError::from(e)),
        }
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Payment>> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {SELECT_COLS} FROM payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn get_by_idempotency_key(&self, key: &str) -> AppResult<Option<Payment>> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {SELECT_COLS} FROM payments WHERE idempotency_key = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn find_pending_since(
        &self,
        user_id: Uuid,
        feature_type: FeatureType,
        since: NaiveDateTime,
    ) -> AppResult<Option<Payment>> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {SELECT_COLS}
            FROM payments
            WHERE user_id = $1
              AND feature_type = $2
              AND status = 'pending'
              AND created_at >= $3
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .bind(feature_type)
        .bind(since)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn fail_pending_before(
        &self,
        user_id: Uuid,
        feature_type: FeatureType,
        cutoff: NaiveDateTime,
        reason: &str,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'failed',
                failure_reason = $4,
                updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE user_id = $1
              AND feature_type = $2
              AND status = 'pending'
              AND created_at < $3
            "#,
        )
        .bind(user_id)
        .bind(feature_type)
        .bind(cutoff)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected())
    }

    async fn complete(
        &self,
        id: Uuid,
        status: PaymentStatus,
        failure_reason: Option<&str>,
    ) -> AppResult<TransitionOutcome> {
        if !PaymentStatus::Pending.can_transition_to(status) {
            return Err(AppError::Internal(format!(
                "Refusing transition to non-terminal status {status}"
            )));
        }

        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let updated = sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET status = $2,
                failure_reason = $3,
                updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE id = $1 AND status = 'pending'
            RETURNING {SELECT_COLS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(failure_reason)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?;

        let Some(payment) = updated else {
            tx.rollback().await.map_err(AppError::from)?;
            let current = self.get_by_id(id).await?.ok_or(AppError::NotFound)?;
            return Ok(TransitionOutcome::Unchanged(current));
        };

        if status.is_successful() {
            let activated = sqlx::query(&format!(
                r#"
                UPDATE users
                SET {} = 'active',
                    updated_at = (NOW() AT TIME ZONE 'utc')
                WHERE id = $1
                "#,
                subscription_column(payment.feature_type)
            ))
            .bind(payment.user_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;

            if activated.rows_affected() == 0 {
                tx.rollback().await.map_err(AppError::from)?;
                return Err(AppError::Internal(format!(
                    "Owner {} of payment {} not found",
                    payment.user_id, payment.id
                )));
            }
        }

        tx.commit().await.map_err(AppError::from)?;
        Ok(TransitionOutcome::Applied(payment))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Payment>> {
        sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {SELECT_COLS}
            FROM payments
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn fail_stale(&self, cutoff: NaiveDateTime, reason: &str) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'failed',
                failure_reason = $2,
                updated_at = (NOW() AT TIME ZONE 'utc')
            WHERE status = 'pending' AND created_at < $1
            "#,
        )
        .bind(cutoff)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected())
    }
}
