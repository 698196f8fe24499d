use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::subscribers::SubscriberUpsert,
    infra::db::postgres::schema::subscribers,
};

/// Authoritative local mirror of one user's billing state. One row per user;
/// webhook deliveries and the checkout-confirmation fallback both converge
/// onto it via upsert-by-user-id.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscribers)]
pub struct SubscriberEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub stripe_product_id: Option<String>,
    pub plan_id: Option<String>,
    pub billing_interval: Option<String>,
    pub status: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at: Option<DateTime<Utc>>,
    pub cancel_at_period_end: Option<bool>,
    pub subscribed: bool,
    pub subscription_tier: Option<String>,
    pub subscription_end: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert/update image of a subscriber write. `treat_none_as_null` matters:
/// a subscription-deleted event must clear plan and price linkage, not leave
/// the previous values behind.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = subscribers)]
#[diesel(treat_none_as_null = true)]
pub struct UpsertSubscriberEntity {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub stripe_product_id: Option<String>,
    pub plan_id: Option<String>,
    pub billing_interval: Option<String>,
    pub status: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at: Option<DateTime<Utc>>,
    pub subscribed: bool,
    pub subscription_tier: Option<String>,
    pub subscription_end: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<SubscriberUpsert> for UpsertSubscriberEntity {
    fn from(value: SubscriberUpsert) -> Self {
        Self {
            user_id: value.user_id,
            email: value.email,
            stripe_customer_id: value.stripe_customer_id,
            stripe_subscription_id: value.stripe_subscription_id,
            stripe_price_id: value.stripe_price_id,
            stripe_product_id: value.stripe_product_id,
            plan_id: value.plan_id,
            billing_interval: value
                .billing_interval
                .map(|interval| interval.as_str().to_string()),
            status: value.status,
            current_period_start: value.current_period_start,
            current_period_end: value.current_period_end,
            cancel_at: value.cancel_at,
            subscribed: value.subscribed,
            subscription_tier: value.subscription_tier,
            subscription_end: value.subscription_end,
            last_event_at: Some(value.event_at),
            updated_at: Utc::now(),
        }
    }
}
