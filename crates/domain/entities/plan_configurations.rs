use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::billing_intervals::BillingInterval,
    infra::db::postgres::schema::plan_configurations,
};

/// Purchasable plan catalog entry. Read-only from the application's
/// perspective; rows are maintained administratively. Prices are minor units.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plan_configurations)]
pub struct PlanConfigurationEntity {
    pub id: Uuid,
    pub plan_id: String,
    pub name: String,
    pub description: Option<String>,
    pub monthly_price_minor: Option<i32>,
    pub annual_price_minor: Option<i32>,
    pub lifetime_price_minor: Option<i32>,
    pub stripe_price_id_monthly: Option<String>,
    pub stripe_price_id_annual: Option<String>,
    pub stripe_price_id_lifetime: Option<String>,
    pub features: serde_json::Value,
    pub is_popular: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlanConfigurationEntity {
    /// Reports which interval slot references the given external price id.
    /// `None` means the plan does not sell under that price.
    pub fn match_price(&self, price_id: &str) -> Option<BillingInterval> {
        if self.stripe_price_id_monthly.as_deref() == Some(price_id) {
            Some(BillingInterval::Month)
        } else if self.stripe_price_id_annual.as_deref() == Some(price_id) {
            Some(BillingInterval::Year)
        } else if self.stripe_price_id_lifetime.as_deref() == Some(price_id) {
            Some(BillingInterval::Lifetime)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> PlanConfigurationEntity {
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
            is_popular: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn matches_the_interval_slot_that_carries_the_price() {
        assert_eq!(plan().match_price("price_123"), Some(BillingInterval::Month));
        assert_eq!(plan().match_price("price_456"), Some(BillingInterval::Year));
    }

    #[test]
    fn unknown_price_matches_nothing() {
        assert_eq!(plan().match_price("price_999"), None);
    }
}
