use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use legacykeeper::{
    domain::repositories::subscribers::SubscriberRepository,
    infra::db::{
        postgres::postgres_connection::PgPoolSquad, repositories::subscribers::SubscriberPostgres,
    },
};
use serde::Serialize;
use tracing::error;

use crate::auth::AuthUser;
use crate::axum_http::error_responses::AppError;

/// Snapshot served from the local subscriber table only; the webhook keeps it
/// in sync with the billing provider.
#[derive(Debug, Serialize, Default)]
pub struct SubscriptionStatusResponse {
    pub subscribed: bool,
    pub status: Option<String>,
    pub plan_id: Option<String>,
    pub subscription_tier: Option<String>,
    pub billing_interval: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub stripe_product_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: Option<bool>,
}

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let subscriber_repo = SubscriberPostgres::new(Arc::clone(&db_pool));

    Router::new()
        .route("/", get(current_subscription))
        .with_state(Arc::new(subscriber_repo))
}

pub async fn current_subscription<T>(
    State(subscriber_repo): State<Arc<T>>,
    auth: AuthUser,
) -> Response
where
    T: SubscriberRepository + Send + Sync + 'static,
{
    match subscriber_repo.find_by_user_id(auth.user_id).await {
        Ok(Some(subscriber)) => Json(SubscriptionStatusResponse {
            subscribed: subscriber.subscribed,
            status: subscriber.status,
            plan_id: subscriber.plan_id,
            subscription_tier: subscriber.subscription_tier,
            billing_interval: subscriber.billing_interval,
            stripe_customer_id: subscriber.stripe_customer_id,
            stripe_price_id: subscriber.stripe_price_id,
            stripe_product_id: subscriber.stripe_product_id,
            current_period_end: subscriber
                .current_period_end
                .or(subscriber.subscription_end),
            cancel_at_period_end: subscriber.cancel_at_period_end,
        })
        .into_response(),
        Ok(None) => Json(SubscriptionStatusResponse::default()).into_response(),
        Err(err) => {
            error!(
                user_id = %auth.user_id,
                db_error = ?err,
                "subscription: failed to load subscriber row"
            );
            AppError::Internal(err).into_response()
        }
    }
}
