use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use legacykeeper::{
    domain::{
        repositories::{
            access::AccessRepository, content_usage::ContentUsageRepository,
            plan_catalog::PlanCatalogRepository, storage::StorageLister,
            subscribers::SubscriberRepository,
        },
        value_objects::{
            entitlements::PlanGateLimits,
            enums::{content_kinds::ContentKind, plan_aliases::PlanAlias},
            usage::UsageSnapshot,
        },
    },
    infra::{
        db::{
            postgres::postgres_connection::PgPoolSquad,
            repositories::{
                access::AccessPostgres, content_usage::ContentUsagePostgres,
                plan_catalog::PlanCatalogPostgres, subscribers::SubscriberPostgres,
            },
        },
        storages::supabase_storage::SupabaseStorageClient,
    },
};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::usecases::{entitlement_gate::EntitlementGateUseCase, usage::UsageAggregator};

#[derive(Debug, Serialize)]
pub struct EntitlementStateResponse {
    pub plan_id: PlanAlias,
    pub limits: PlanGateLimits,
    pub can_view_mentorship: bool,
    pub can_post_wisdom: bool,
    pub can_see_progress_tracker: bool,
    pub usage: UsageSnapshot,
}

#[derive(Debug, serde::Deserialize)]
pub struct CanCreateRequest {
    pub kind: ContentKind,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, storage: Arc<SupabaseStorageClient>) -> Router {
    let usage_aggregator = Arc::new(UsageAggregator::new(
        Arc::new(ContentUsagePostgres::new(Arc::clone(&db_pool))),
        storage,
    ));
    let usecase = EntitlementGateUseCase::new(
        Arc::new(SubscriberPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PlanCatalogPostgres::new(Arc::clone(&db_pool))),
        Arc::new(AccessPostgres::new(Arc::clone(&db_pool))),
        usage_aggregator,
    );

    Router::new()
        .route("/", get(current_entitlements))
        .route("/can-create", post(can_create))
        .with_state(Arc::new(usecase))
}

pub async fn current_entitlements<Sub, Cat, Acc, C, St>(
    State(usecase): State<Arc<EntitlementGateUseCase<Sub, Cat, Acc, C, St>>>,
    auth: AuthUser,
) -> Response
where
    Sub: SubscriberRepository + Send + Sync + 'static,
    Cat: PlanCatalogRepository + Send + Sync + 'static,
    Acc: AccessRepository + Send + Sync + 'static,
    C: ContentUsageRepository + Send + Sync + 'static,
    St: StorageLister + Send + Sync + 'static,
{
    let gate = usecase.evaluate(auth.user_id).await;

    Json(EntitlementStateResponse {
        plan_id: gate.entitlements.plan,
        limits: gate.entitlements.limits,
        can_view_mentorship: gate.entitlements.can_view_mentorship,
        can_post_wisdom: gate.entitlements.can_post_wisdom,
        can_see_progress_tracker: gate.can_see_progress_tracker(),
        usage: gate.usage.unwrap_or_default(),
    })
    .into_response()
}

/// Defense in depth behind the client-side gate: consulted before persisting
/// gated content. Denials are ordinary 200 responses with `{ ok, reason }`.
pub async fn can_create<Sub, Cat, Acc, C, St>(
    State(usecase): State<Arc<EntitlementGateUseCase<Sub, Cat, Acc, C, St>>>,
    auth: AuthUser,
    Json(request): Json<CanCreateRequest>,
) -> Response
where
    Sub: SubscriberRepository + Send + Sync + 'static,
    Cat: PlanCatalogRepository + Send + Sync + 'static,
    Acc: AccessRepository + Send + Sync + 'static,
    C: ContentUsageRepository + Send + Sync + 'static,
    St: StorageLister + Send + Sync + 'static,
{
    let outcome = usecase.can_create(auth.user_id, request.kind).await;
    Json(outcome).into_response()
}
