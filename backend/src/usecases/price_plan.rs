use anyhow::Result;
use legacykeeper::domain::{
    repositories::plan_catalog::PlanCatalogRepository,
    value_objects::enums::billing_intervals::BillingInterval,
};
use std::sync::Arc;
use tracing::debug;

/// Outcome of mapping an external price id onto the plan catalog. All-`None`
/// is a valid result: legacy and test prices reference no configured plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceResolution {
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
    pub billing_interval: Option<BillingInterval>,
}

impl PriceResolution {
    pub fn not_found() -> Self {
        Self::default()
    }
}

/// Maps external price ids onto internal plans by checking which interval
/// slot of a catalog entry carries the price.
pub struct PricePlanResolver<P>
where
    P: PlanCatalogRepository + Send + Sync + 'static,
{
    plan_catalog: Arc<P>,
}

impl<P> PricePlanResolver<P>
where
    P: PlanCatalogRepository + Send + Sync + 'static,
{
    pub fn new(plan_catalog: Arc<P>) -> Self {
        Self { plan_catalog }
    }

    pub async fn resolve(&self, price_id: &str) -> Result<PriceResolution> {
        let Some(plan) = self.plan_catalog.find_by_stripe_price_id(price_id).await? else {
            debug!(price_id, "price_plan: no plan references this price");
            return Ok(PriceResolution::not_found());
        };

        let billing_interval = plan.match_price(price_id);
        Ok(PriceResolution {
            plan_id: Some(plan.plan_id),
            plan_name: Some(plan.name),
            billing_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use legacykeeper::domain::{
        entities::plan_configurations::PlanConfigurationEntity,
        repositories::plan_catalog::MockPlanCatalogRepository,
    };
    use mockall::predicate::eq;
    use uuid::Uuid;

    fn builder_plan() -> PlanConfigurationEntity {
        PlanConfigurationEntity {
            id: Uuid::new_v4(),
            plan_id: "builder".to_string(),
            name: "Builder – Legacy Builder".to_string(),
            description: None,
            monthly_price_minor: Some(900),
            annual_price_minor: Some(9000),
            lifetime_price_minor: None,
            stripe_price_id_monthly: Some("price_123".to_string()),
            stripe_price_id_annual: Some("price_456".to_string()),
            stripe_price_id_lifetime: None,
            features: serde_json::json!([]),
            is_popular: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn resolves_the_monthly_slot() {
        let mut plan_catalog = MockPlanCatalogRepository::new();
        plan_catalog
            .expect_find_by_stripe_price_id()
            .with(eq("price_123"))
            .returning(|_| Box::pin(async { Ok(Some(builder_plan())) }));

        let resolver = PricePlanResolver::new(Arc::new(plan_catalog));
        let resolution = resolver.resolve("price_123").await.unwrap();

        assert_eq!(resolution.plan_id.as_deref(), Some("builder"));
        assert_eq!(
            resolution.plan_name.as_deref(),
            Some("Builder – Legacy Builder")
        );
        assert_eq!(resolution.billing_interval, Some(BillingInterval::Month));
    }

    #[tokio::test]
    async fn unknown_price_resolves_to_all_none_without_error() {
        let mut plan_catalog = MockPlanCatalogRepository::new();
        plan_catalog
            .expect_find_by_stripe_price_id()
            .with(eq("price_dead"))
            .returning(|_| Box::pin(async { Ok(None) }));

        let resolver = PricePlanResolver::new(Arc::new(plan_catalog));
        let resolution = resolver.resolve("price_dead").await.unwrap();

        assert_eq!(resolution, PriceResolution::not_found());
    }
}
