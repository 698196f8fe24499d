use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use legacykeeper::{
    domain::{
        entities::plan_configurations::PlanConfigurationEntity,
        repositories::plan_catalog::PlanCatalogRepository,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::plan_catalog::PlanCatalogPostgres,
    },
};
use serde::Serialize;
use tracing::error;

use crate::axum_http::error_responses::AppError;

/// Public catalog row for the pricing page. External price ids stay internal.
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub plan_id: String,
    pub name: String,
    pub description: Option<String>,
    pub monthly_price_minor: Option<i32>,
    pub annual_price_minor: Option<i32>,
    pub lifetime_price_minor: Option<i32>,
    pub features: serde_json::Value,
    pub is_popular: bool,
}

impl From<PlanConfigurationEntity> for PlanResponse {
    fn from(value: PlanConfigurationEntity) -> Self {
        Self {
            plan_id: value.plan_id,
            name: value.name,
            description: value.description,
            monthly_price_minor: value.monthly_price_minor,
            annual_price_minor: value.annual_price_minor,
            lifetime_price_minor: value.lifetime_price_minor,
            features: value.features,
            is_popular: value.is_popular,
        }
    }
}

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let plan_catalog = PlanCatalogPostgres::new(Arc::clone(&db_pool));

    Router::new()
        .route("/", get(list_plans))
        .with_state(Arc::new(plan_catalog))
}

pub async fn list_plans<T>(State(plan_catalog): State<Arc<T>>) -> Response
where
    T: PlanCatalogRepository + Send + Sync + 'static,
{
    match plan_catalog.list_plans().await {
        Ok(plans) => Json(
            plans
                .into_iter()
                .map(PlanResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(err) => {
            error!(db_error = ?err, "plans: failed to list plan catalog");
            AppError::Internal(err).into_response()
        }
    }
}
