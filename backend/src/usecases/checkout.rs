use std::{collections::HashMap, sync::Arc};

use chrono::{Duration, Utc};
use legacykeeper::{
    billing::BillingGateway,
    domain::{
        repositories::{plan_catalog::PlanCatalogRepository, subscribers::SubscriberRepository},
        value_objects::{
            enums::billing_intervals::BillingInterval, subscribers::SubscriberUpsert,
        },
    },
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("user email is required for checkout")]
    MissingEmail,
    #[error("no price id provided or resolved")]
    MissingPrice,
    #[error("no matching price found for plan: {0}")]
    UnknownPlanLabel(String),
    #[error("no plan found for price id")]
    PlanNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CheckoutError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            CheckoutError::MissingEmail
            | CheckoutError::MissingPrice
            | CheckoutError::UnknownPlanLabel(_) => StatusCode::BAD_REQUEST,
            CheckoutError::PlanNotFound => StatusCode::NOT_FOUND,
            CheckoutError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type CheckoutResult<T> = std::result::Result<T, CheckoutError>;

/// Callers pass either an explicit price id or a plan label to resolve
/// against the provider's active prices.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub price_id: Option<String>,
    pub plan: Option<String>,
}

pub struct CheckoutUseCase<Sub, Cat, B>
where
    Sub: SubscriberRepository + Send + Sync + 'static,
    Cat: PlanCatalogRepository + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    subscriber_repo: Arc<Sub>,
    plan_catalog: Arc<Cat>,
    billing: Arc<B>,
}

impl<Sub, Cat, B> CheckoutUseCase<Sub, Cat, B>
where
    Sub: SubscriberRepository + Send + Sync + 'static,
    Cat: PlanCatalogRepository + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    pub fn new(subscriber_repo: Arc<Sub>, plan_catalog: Arc<Cat>, billing: Arc<B>) -> Self {
        Self {
            subscriber_repo,
            plan_catalog,
            billing,
        }
    }

    /// Creates a provider checkout session and returns its redirect URL. The
    /// caller's user id is embedded in the session metadata so the webhook
    /// can resolve identity without the e-mail fallback.
    pub async fn create_checkout(
        &self,
        user_id: Uuid,
        user_email: Option<String>,
        request: CheckoutRequest,
    ) -> CheckoutResult<String> {
        info!(
            %user_id,
            price_id = ?request.price_id,
            plan = ?request.plan,
            "checkout: session requested"
        );

        let email = user_email.ok_or_else(|| {
            warn!(%user_id, "checkout: caller has no email");
            CheckoutError::MissingEmail
        })?;

        let price_id = match request.price_id {
            Some(price_id) => price_id,
            None => match request.plan {
                Some(label) => self.price_for_plan_label(&label).await?,
                None => return Err(CheckoutError::MissingPrice),
            },
        };

        let price = self
            .billing
            .retrieve_price(&price_id)
            .await
            .map_err(|err| {
                error!(%user_id, price_id = %price_id, error = ?err, "checkout: price retrieval failed");
                CheckoutError::Internal(err)
            })?;
        let mode = if price.recurring.is_some() {
            "subscription"
        } else {
            "payment"
        };

        let customer_id = self
            .billing
            .find_or_create_customer(&email, user_id)
            .await
            .map_err(|err| {
                error!(%user_id, error = ?err, "checkout: customer resolution failed");
                CheckoutError::Internal(err)
            })?;

        let metadata = HashMap::from([("user_id".to_string(), user_id.to_string())]);

        let checkout_url = self
            .billing
            .create_checkout_session(&price_id, mode, Some(customer_id.clone()), metadata)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    price_id = %price_id,
                    customer_id = %customer_id,
                    error = ?err,
                    "checkout: session creation failed"
                );
                CheckoutError::Internal(err)
            })?;

        info!(%user_id, checkout_url = %checkout_url, "checkout: session created");
        Ok(checkout_url)
    }

    /// Best-effort upsert from the payment confirmation page, covering the
    /// window before the webhook lands. The period end is provisional (slot
    /// interval from `now`); the webhook's authoritative periods supersede it
    /// because this write carries the current time as its event timestamp.
    pub async fn confirm_checkout(
        &self,
        user_id: Uuid,
        user_email: Option<String>,
        price_id: &str,
        customer_id: &str,
    ) -> CheckoutResult<()> {
        let plan = self
            .plan_catalog
            .find_by_stripe_price_id(price_id)
            .await
            .map_err(|err| {
                error!(%user_id, price_id, db_error = ?err, "checkout: plan lookup failed");
                CheckoutError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%user_id, price_id, "checkout: no plan found for confirmed price");
                CheckoutError::PlanNotFound
            })?;

        let billing_interval = plan.match_price(price_id);
        let now = Utc::now();
        let subscription_end = match billing_interval {
            Some(BillingInterval::Month) => now.checked_add_signed(Duration::days(30)),
            Some(BillingInterval::Year) => now.checked_add_signed(Duration::days(365)),
            Some(BillingInterval::Lifetime) | None => None,
        };

        self.subscriber_repo
            .upsert_subscriber(SubscriberUpsert {
                user_id,
                email: user_email,
                stripe_customer_id: Some(customer_id.to_string()),
                stripe_subscription_id: None,
                stripe_price_id: Some(price_id.to_string()),
                stripe_product_id: None,
                plan_id: Some(plan.plan_id.clone()),
                billing_interval,
                status: Some("active".to_string()),
                current_period_start: Some(now),
                current_period_end: subscription_end,
                cancel_at: None,
                subscribed: true,
                subscription_tier: Some(plan.name.clone()),
                subscription_end,
                event_at: now,
            })
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: confirmation upsert failed");
                CheckoutError::Internal(err)
            })?;

        info!(%user_id, plan_id = %plan.plan_id, "checkout: confirmation upsert applied");
        Ok(())
    }

    /// Fallback resolution from a human plan label by listing active prices:
    /// Monthly/Yearly match on the recurring interval, Lifetime on the first
    /// one-time price.
    async fn price_for_plan_label(&self, label: &str) -> CheckoutResult<String> {
        let prices = self.billing.list_active_prices().await.map_err(|err| {
            error!(label, error = ?err, "checkout: listing prices failed");
            CheckoutError::Internal(err)
        })?;

        let wanted_interval = match label {
            "Monthly" => Some("month"),
            "Yearly" => Some("year"),
            "Lifetime" => None,
            _ => return Err(CheckoutError::UnknownPlanLabel(label.to_string())),
        };

        prices
            .into_iter()
            .find(|price| {
                let interval = price
                    .recurring
                    .as_ref()
                    .and_then(|recurring| recurring.interval.as_deref());
                interval == wanted_interval
            })
            .and_then(|price| price.id)
            .ok_or_else(|| CheckoutError::UnknownPlanLabel(label.to_string()))
    }
}
