use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::plan_configurations::PlanConfigurationEntity;
use crate::domain::value_objects::enums::mentorship_levels::MentorshipLevel;

#[async_trait]
#[automock]
pub trait PlanCatalogRepository {
    /// Finds the plan whose monthly, annual, or lifetime price slot references
    /// the given external price id. `None` is a valid outcome (legacy or test
    /// prices), not an error.
    async fn find_by_stripe_price_id(
        &self,
        price_id: &str,
    ) -> Result<Option<PlanConfigurationEntity>>;

    async fn list_plans(&self) -> Result<Vec<PlanConfigurationEntity>>;

    /// Mentorship-access value from the plan-limits catalog for one plan id.
    async fn find_mentorship_value(&self, plan_id: &str) -> Result<Option<MentorshipLevel>>;
}
