use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
};
use legacykeeper::{
    billing::{BillingGateway, stripe_client::StripeClient},
    domain::repositories::{
        plan_catalog::PlanCatalogRepository, subscribers::SubscriberRepository,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{plan_catalog::PlanCatalogPostgres, subscribers::SubscriberPostgres},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::auth::AuthUser;
use crate::axum_http::error_responses::ErrorResponse;
use crate::usecases::checkout::{CheckoutRequest, CheckoutUseCase};

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmCheckoutRequest {
    pub price_id: String,
    pub customer_id: String,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, stripe: Arc<StripeClient>) -> Router {
    let subscriber_repo = Arc::new(SubscriberPostgres::new(Arc::clone(&db_pool)));
    let plan_catalog = Arc::new(PlanCatalogPostgres::new(Arc::clone(&db_pool)));
    let usecase = CheckoutUseCase::new(subscriber_repo, plan_catalog, stripe);

    Router::new()
        .route("/", post(create_checkout))
        .route("/confirm", post(confirm_checkout))
        .with_state(Arc::new(usecase))
}

pub async fn create_checkout<Sub, Cat, B>(
    State(usecase): State<Arc<CheckoutUseCase<Sub, Cat, B>>>,
    auth: AuthUser,
    Json(request): Json<CheckoutRequest>,
) -> Response
where
    Sub: SubscriberRepository + Send + Sync + 'static,
    Cat: PlanCatalogRepository + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    match usecase
        .create_checkout(auth.user_id, auth.email, request)
        .await
    {
        Ok(url) => Json(CheckoutResponse { url }).into_response(),
        Err(err) => {
            let status = err.status_code();
            warn!(
                user_id = %auth.user_id,
                status = status.as_u16(),
                error = %err,
                "checkout: request failed"
            );
            (
                status,
                Json(ErrorResponse {
                    code: status.as_u16(),
                    message: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub async fn confirm_checkout<Sub, Cat, B>(
    State(usecase): State<Arc<CheckoutUseCase<Sub, Cat, B>>>,
    auth: AuthUser,
    Json(request): Json<ConfirmCheckoutRequest>,
) -> Response
where
    Sub: SubscriberRepository + Send + Sync + 'static,
    Cat: PlanCatalogRepository + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    match usecase
        .confirm_checkout(
            auth.user_id,
            auth.email,
            &request.price_id,
            &request.customer_id,
        )
        .await
    {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(err) => {
            let status = err.status_code();
            warn!(
                user_id = %auth.user_id,
                status = status.as_u16(),
                error = %err,
                "checkout: confirmation failed"
            );
            (
                status,
                Json(ErrorResponse {
                    code: status.as_u16(),
                    message: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}
