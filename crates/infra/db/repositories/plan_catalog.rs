use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*};

use crate::{
    domain::{
        entities::{plan_configurations::PlanConfigurationEntity, plan_limits::PlanLimitEntity},
        repositories::plan_catalog::PlanCatalogRepository,
        value_objects::enums::mentorship_levels::MentorshipLevel,
    },
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{plan_configurations, plan_limits},
    },
};

const MENTORSHIP_RESOURCE: &str = "mentorship_access";

pub struct PlanCatalogPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PlanCatalogPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PlanCatalogRepository for PlanCatalogPostgres {
    async fn find_by_stripe_price_id(
        &self,
        price_id: &str,
    ) -> Result<Option<PlanConfigurationEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let plan = plan_configurations::table
            .filter(
                plan_configurations::stripe_price_id_monthly
                    .eq(price_id)
                    .or(plan_configurations::stripe_price_id_annual.eq(price_id))
                    .or(plan_configurations::stripe_price_id_lifetime.eq(price_id)),
            )
            .select(PlanConfigurationEntity::as_select())
            .first::<PlanConfigurationEntity>(&mut conn)
            .optional()?;

        Ok(plan)
    }

    async fn list_plans(&self) -> Result<Vec<PlanConfigurationEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let plans = plan_configurations::table
            .order(plan_configurations::monthly_price_minor.asc())
            .select(PlanConfigurationEntity::as_select())
            .load::<PlanConfigurationEntity>(&mut conn)?;

        Ok(plans)
    }

    async fn find_mentorship_value(&self, plan_id: &str) -> Result<Option<MentorshipLevel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let limit = plan_limits::table
            .filter(plan_limits::plan_id.eq(plan_id))
            .filter(plan_limits::resource.eq(MENTORSHIP_RESOURCE))
            .select(PlanLimitEntity::as_select())
            .first::<PlanLimitEntity>(&mut conn)
            .optional()?;

        Ok(limit.and_then(|row| row.mentorship()))
    }
}
