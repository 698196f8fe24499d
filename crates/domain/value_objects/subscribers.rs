use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::enums::billing_intervals::BillingInterval;

/// Latest-known-state write for one subscriber row. Every webhook path and the
/// checkout-confirmation fallback funnel into this one value; the repository
/// applies it keyed by `user_id`, skipping writes whose `event_at` is older
/// than what is already stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberUpsert {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub stripe_product_id: Option<String>,
    pub plan_id: Option<String>,
    pub billing_interval: Option<BillingInterval>,
    pub status: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at: Option<DateTime<Utc>>,
    pub subscribed: bool,
    pub subscription_tier: Option<String>,
    pub subscription_end: Option<DateTime<Utc>>,
    pub event_at: DateTime<Utc>,
}

impl SubscriberUpsert {
    /// Whether this write may overwrite a row whose last applied event was
    /// `stored_event_at`. Equal timestamps re-apply: redelivery of the same
    /// event must converge to the same terminal state, not be rejected.
    pub fn supersedes(&self, stored_event_at: Option<DateTime<Utc>>) -> bool {
        stored_event_at.map_or(true, |stored| stored <= self.event_at)
    }
}
