use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::payment::SubscriptionRepo,
    domain::entities::subscription_status::{SubscriptionStatus, UserSubscriptions},
};

#[derive(sqlx::FromRow)]
struct SubscriptionFlagsRow {
    id: Uuid,
    survey_subscription_status: SubscriptionStatus,
    video_subscription_status: SubscriptionStatus,
}

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn get_subscriptions(&self, user_id: Uuid) -> AppResult<UserSubscriptions> {
        let row = sqlx::query_as::<_, SubscriptionFlagsRow>(
            r#"
            SELECT id, survey_subscription_status, video_subscription_status
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(match row {
            Some(r) => UserSubscriptions {
                user_id: r.id,
                survey_subscription_status: r.survey_subscription_status,
                video_subscription_status: r.video_subscription_status,
            },
            None => UserSubscriptions::inactive(user_id),
        })
    }
}
