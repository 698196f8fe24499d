use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use legacykeeper::{
    billing::{BillingGateway, stripe_client::StripeClient},
    domain::repositories::{
        directory::UserDirectory, plan_catalog::PlanCatalogRepository,
        profiles::ProfileRepository, subscribers::SubscriberRepository,
    },
    infra::{
        db::{
            postgres::postgres_connection::PgPoolSquad,
            repositories::{
                plan_catalog::PlanCatalogPostgres, profiles::ProfilePostgres,
                subscribers::SubscriberPostgres,
            },
        },
        directory::supabase_auth::SupabaseAuthAdmin,
    },
};
use serde_json::json;
use tracing::error;

use crate::usecases::{
    billing_webhook::BillingWebhookUseCase, identity::IdentityResolver,
    price_plan::PricePlanResolver,
};

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    stripe: Arc<StripeClient>,
    auth_admin: Arc<SupabaseAuthAdmin>,
) -> Router {
    let subscriber_repo = Arc::new(SubscriberPostgres::new(Arc::clone(&db_pool)));
    let price_resolver = Arc::new(PricePlanResolver::new(Arc::new(PlanCatalogPostgres::new(
        Arc::clone(&db_pool),
    ))));
    let identity = Arc::new(IdentityResolver::new(
        Arc::new(ProfilePostgres::new(Arc::clone(&db_pool))),
        auth_admin,
    ));
    let usecase = BillingWebhookUseCase::new(subscriber_repo, price_resolver, identity, stripe);

    Router::new()
        .route("/webhook", post(receive_webhook))
        .with_state(Arc::new(usecase))
}

/// Raw-body endpoint: the signature covers the exact bytes, so the payload
/// must not pass through a JSON extractor first.
pub async fn receive_webhook<Sub, Plan, Prof, Dir, B>(
    State(usecase): State<Arc<BillingWebhookUseCase<Sub, Plan, Prof, Dir, B>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    Sub: SubscriberRepository + Send + Sync + 'static,
    Plan: PlanCatalogRepository + Send + Sync + 'static,
    Prof: ProfileRepository + Send + Sync + 'static,
    Dir: UserDirectory + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match usecase.handle_webhook(&body, signature).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "received": true }))).into_response(),
        Err(err) => {
            error!(
                status = err.status_code().as_u16(),
                error = %err,
                "billing_webhook: event rejected"
            );
            (
                err.status_code(),
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}
