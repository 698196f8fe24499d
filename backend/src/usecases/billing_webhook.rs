use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use legacykeeper::{
    billing::BillingGateway,
    billing::stripe_client::{StripeClient, StripeEvent},
    domain::{
        repositories::{
            directory::UserDirectory, plan_catalog::PlanCatalogRepository,
            profiles::ProfileRepository, subscribers::SubscriberRepository,
        },
        value_objects::{
            enums::billing_intervals::BillingInterval, subscribers::SubscriberUpsert,
        },
    },
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::usecases::{
    identity::IdentityResolver,
    price_plan::{PricePlanResolver, PriceResolution},
};

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook signature verification failed")]
    InvalidSignature,
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl WebhookError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            WebhookError::InvalidSignature | WebhookError::InvalidPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type WebhookResult<T> = std::result::Result<T, WebhookError>;

/// Consumes signed billing events and converges the local subscriber row
/// toward the provider's view. Each delivery is treated as a latest-known-
/// state write, never a delta: redeliveries are harmless and out-of-order
/// deliveries are rejected by the repository's event-timestamp guard.
pub struct BillingWebhookUseCase<Sub, Plan, Prof, Dir, B>
where
    Sub: SubscriberRepository + Send + Sync + 'static,
    Plan: PlanCatalogRepository + Send + Sync + 'static,
    Prof: ProfileRepository + Send + Sync + 'static,
    Dir: UserDirectory + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    subscriber_repo: Arc<Sub>,
    price_resolver: Arc<PricePlanResolver<Plan>>,
    identity: Arc<IdentityResolver<Prof, Dir>>,
    billing: Arc<B>,
}

impl<Sub, Plan, Prof, Dir, B> BillingWebhookUseCase<Sub, Plan, Prof, Dir, B>
where
    Sub: SubscriberRepository + Send + Sync + 'static,
    Plan: PlanCatalogRepository + Send + Sync + 'static,
    Prof: ProfileRepository + Send + Sync + 'static,
    Dir: UserDirectory + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    pub fn new(
        subscriber_repo: Arc<Sub>,
        price_resolver: Arc<PricePlanResolver<Plan>>,
        identity: Arc<IdentityResolver<Prof, Dir>>,
        billing: Arc<B>,
    ) -> Self {
        Self {
            subscriber_repo,
            price_resolver,
            identity,
            billing,
        }
    }

    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> WebhookResult<()> {
        let event = self
            .billing
            .verify_webhook_signature(payload, signature)
            .map_err(|err| {
                warn!(error = %err, "billing_webhook: signature verification failed");
                WebhookError::InvalidSignature
            })?;

        info!(
            event_id = ?event.id,
            event_type = %event.type_,
            livemode = ?event.livemode,
            "billing_webhook: event verified"
        );

        match event.type_.as_str() {
            "checkout.session.completed" => self.handle_checkout_completed(&event).await,
            "customer.subscription.created" | "customer.subscription.updated" => {
                self.handle_subscription_upserted(&event).await
            }
            "customer.subscription.deleted" => self.handle_subscription_deleted(&event).await,
            _ => {
                debug!(event_type = %event.type_, "billing_webhook: unhandled event type");
                Ok(())
            }
        }
    }

    async fn handle_checkout_completed(&self, event: &StripeEvent) -> WebhookResult<()> {
        let session = StripeClient::extract_checkout_session(event).ok_or_else(|| {
            warn!("billing_webhook: checkout session missing in event");
            WebhookError::InvalidPayload("missing checkout session".to_string())
        })?;

        let event_at = ts_to_datetime(event.created).unwrap_or_else(Utc::now);
        let session_email = session
            .customer_details
            .as_ref()
            .and_then(|details| details.email.clone());

        let mut stripe_subscription_id = session.subscription.clone();
        let mut price_id = None;
        let mut product_id = None;
        let mut provider_interval = None;
        let mut status = None;
        let mut period_start = None;
        let mut period_end = None;
        let mut cancel_at = None;

        // One-time (lifetime) checkouts have no subscription to resolve; the
        // session alone carries no price, so those fields stay empty.
        if let Some(subscription_id) = session.subscription.as_deref() {
            let subscription = self
                .billing
                .retrieve_subscription(subscription_id)
                .await
                .map_err(|err| {
                    error!(
                        subscription_id,
                        error = ?err,
                        "billing_webhook: failed to retrieve subscription"
                    );
                    WebhookError::Internal(err)
                })?;

            if let Some(price) = subscription.item_price() {
                price_id = price.id.clone();
                product_id = price.product.clone();
                provider_interval = BillingInterval::from_provider_interval(
                    price
                        .recurring
                        .as_ref()
                        .and_then(|recurring| recurring.interval.as_deref()),
                );
            }
            status = subscription.status.clone();
            period_start = ts_to_datetime(subscription.period_start());
            period_end = ts_to_datetime(subscription.period_end());
            cancel_at = ts_to_datetime(subscription.cancel_at);
            stripe_subscription_id = subscription.id.clone().or(stripe_subscription_id);
        }

        let resolution = self.resolve_price(price_id.as_deref()).await?;
        let billing_interval = provider_interval.or(resolution.billing_interval);

        let metadata_user_id = session
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.get("user_id"))
            .map(String::as_str);

        let Some(user_id) = self
            .identity
            .resolve(metadata_user_id, session_email.as_deref())
            .await
        else {
            warn!(
                event_id = ?event.id,
                email = ?session_email,
                "billing_webhook: no user resolved for checkout, dropping event"
            );
            return Ok(());
        };

        let subscribed = status.as_deref() == Some("active");
        self.upsert(SubscriberUpsert {
            user_id,
            email: session_email,
            stripe_customer_id: session.customer.clone(),
            stripe_subscription_id,
            stripe_price_id: price_id,
            stripe_product_id: product_id,
            plan_id: resolution.plan_id,
            billing_interval,
            status,
            current_period_start: period_start,
            current_period_end: period_end,
            cancel_at,
            subscribed,
            subscription_tier: resolution.plan_name,
            subscription_end: period_end,
            event_at,
        })
        .await?;

        info!(%user_id, "billing_webhook: processed checkout completed");
        Ok(())
    }

    async fn handle_subscription_upserted(&self, event: &StripeEvent) -> WebhookResult<()> {
        let subscription = StripeClient::extract_subscription(event).ok_or_else(|| {
            warn!("billing_webhook: invalid subscription payload in event");
            WebhookError::InvalidPayload("invalid subscription payload".to_string())
        })?;

        let event_at = ts_to_datetime(event.created).unwrap_or_else(Utc::now);

        let mut price_id = None;
        let mut product_id = None;
        let mut provider_interval = None;
        if let Some(price) = subscription.item_price() {
            price_id = price.id.clone();
            product_id = price.product.clone();
            provider_interval = BillingInterval::from_provider_interval(
                price
                    .recurring
                    .as_ref()
                    .and_then(|recurring| recurring.interval.as_deref()),
            );
        }

        let email = self.payer_email(subscription.customer.as_deref()).await;
        let resolution = self.resolve_price(price_id.as_deref()).await?;
        let billing_interval = provider_interval.or(resolution.billing_interval);

        let metadata_user_id = subscription
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.get("user_id"))
            .map(String::as_str);

        let Some(user_id) = self.identity.resolve(metadata_user_id, email.as_deref()).await
        else {
            warn!(
                event_id = ?event.id,
                email = ?email,
                "billing_webhook: no user resolved for subscription event, dropping"
            );
            return Ok(());
        };

        let status = subscription.status.clone();
        let subscribed = status.as_deref() == Some("active");
        let period_end = ts_to_datetime(subscription.period_end());

        self.upsert(SubscriberUpsert {
            user_id,
            email,
            stripe_customer_id: subscription.customer.clone(),
            stripe_subscription_id: subscription.id.clone(),
            stripe_price_id: price_id,
            stripe_product_id: product_id,
            plan_id: resolution.plan_id,
            billing_interval,
            status,
            current_period_start: ts_to_datetime(subscription.period_start()),
            current_period_end: period_end,
            cancel_at: ts_to_datetime(subscription.cancel_at),
            subscribed,
            subscription_tier: resolution.plan_name,
            subscription_end: period_end,
            event_at,
        })
        .await?;

        info!(%user_id, "billing_webhook: processed subscription upsert");
        Ok(())
    }

    async fn handle_subscription_deleted(&self, event: &StripeEvent) -> WebhookResult<()> {
        let subscription = StripeClient::extract_subscription(event).ok_or_else(|| {
            warn!("billing_webhook: invalid subscription payload in event");
            WebhookError::InvalidPayload("invalid subscription payload".to_string())
        })?;

        let event_at = ts_to_datetime(event.created).unwrap_or_else(Utc::now);
        let email = self.payer_email(subscription.customer.as_deref()).await;

        let metadata_user_id = subscription
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.get("user_id"))
            .map(String::as_str);

        let Some(user_id) = self.identity.resolve(metadata_user_id, email.as_deref()).await
        else {
            warn!(
                event_id = ?event.id,
                email = ?email,
                "billing_webhook: no user resolved for subscription deletion, dropping"
            );
            return Ok(());
        };

        let period_end = ts_to_datetime(subscription.period_end());

        // Plan and price linkage is cleared; the customer reference survives
        // so a later checkout reuses the same billing customer.
        self.upsert(SubscriberUpsert {
            user_id,
            email,
            stripe_customer_id: subscription.customer.clone(),
            stripe_subscription_id: subscription.id.clone(),
            stripe_price_id: None,
            stripe_product_id: None,
            plan_id: None,
            billing_interval: None,
            status: subscription
                .status
                .clone()
                .or_else(|| Some("canceled".to_string())),
            current_period_start: ts_to_datetime(subscription.period_start()),
            current_period_end: period_end,
            cancel_at: ts_to_datetime(subscription.cancel_at),
            subscribed: false,
            subscription_tier: None,
            subscription_end: period_end,
            event_at,
        })
        .await?;

        info!(%user_id, "billing_webhook: processed subscription deletion");
        Ok(())
    }

    async fn resolve_price(&self, price_id: Option<&str>) -> WebhookResult<PriceResolution> {
        match price_id {
            Some(price_id) => self.price_resolver.resolve(price_id).await.map_err(|err| {
                error!(price_id, db_error = ?err, "billing_webhook: price resolution failed");
                WebhookError::Internal(err)
            }),
            None => Ok(PriceResolution::not_found()),
        }
    }

    /// Best-effort e-mail for identity resolution. A failed or deleted
    /// customer lookup yields `None` rather than failing the event.
    async fn payer_email(&self, customer_id: Option<&str>) -> Option<String> {
        let customer_id = customer_id?;
        match self.billing.retrieve_customer(customer_id).await {
            Ok(customer) if !customer.deleted => customer.email,
            Ok(_) => None,
            Err(err) => {
                warn!(
                    customer_id,
                    error = ?err,
                    "billing_webhook: customer lookup failed, continuing without email"
                );
                None
            }
        }
    }

    async fn upsert(&self, upsert: SubscriberUpsert) -> WebhookResult<()> {
        let user_id = upsert.user_id;
        self.subscriber_repo
            .upsert_subscriber(upsert)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "billing_webhook: subscriber upsert failed"
                );
                WebhookError::Internal(err)
            })
    }
}

fn ts_to_datetime(ts: Option<i64>) -> Option<DateTime<Utc>> {
    ts.and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use legacykeeper::{
        billing::MockBillingGateway,
        domain::{
            entities::plan_configurations::PlanConfigurationEntity,
            repositories::{
                directory::MockUserDirectory, plan_catalog::MockPlanCatalogRepository,
                profiles::MockProfileRepository, subscribers::MockSubscriberRepository,
            },
        },
    };
    use mockall::predicate::eq;
    use uuid::Uuid;

    const EVENT_CREATED: i64 = 1_700_000_000;

    fn stripe_event(type_: &str, object: serde_json::Value) -> StripeEvent {
        serde_json::from_value(serde_json::json!({
            "id": "evt_1",
            "type": type_,
            "created": EVENT_CREATED,
            "livemode": false,
            "data": { "object": object }
        }))
        .expect("event fixture should deserialize")
    }

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

    fn subscription_object(user_id: Uuid, status: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "sub_123",
            "customer": null,
            "status": status,
            "metadata": { "user_id": user_id.to_string() },
            "current_period_start": 1_699_000_000,
            "current_period_end": 1_701_600_000,
            "items": { "data": [{
                "price": {
                    "id": "price_123",
                    "product": "prod_1",
                    "recurring": { "interval": "month" }
                }
            }]}
        })
    }

    struct Fixture {
        subscriber_repo: MockSubscriberRepository,
        plan_catalog: MockPlanCatalogRepository,
        profiles: MockProfileRepository,
        directory: MockUserDirectory,
        billing: MockBillingGateway,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                subscriber_repo: MockSubscriberRepository::new(),
                plan_catalog: MockPlanCatalogRepository::new(),
                profiles: MockProfileRepository::new(),
                directory: MockUserDirectory::new(),
                billing: MockBillingGateway::new(),
            }
        }

        fn verifying(mut self, type_: &'static str, object: serde_json::Value) -> Self {
            self.billing
                .expect_verify_webhook_signature()
                .returning(move |_, _| Ok(stripe_event(type_, object.clone())));
            self
        }

        fn build(
            self,
        ) -> BillingWebhookUseCase<
            MockSubscriberRepository,
            MockPlanCatalogRepository,
            MockProfileRepository,
            MockUserDirectory,
            MockBillingGateway,
        > {
            BillingWebhookUseCase::new(
                Arc::new(self.subscriber_repo),
                Arc::new(PricePlanResolver::new(Arc::new(self.plan_catalog))),
                Arc::new(IdentityResolver::new(
                    Arc::new(self.profiles),
                    Arc::new(self.directory),
                )),
                Arc::new(self.billing),
            )
        }
    }

    #[tokio::test]
    async fn rejects_an_invalid_signature_without_touching_state() {
        let mut fixture = Fixture::new();
        fixture
            .billing
            .expect_verify_webhook_signature()
            .returning(|_, _| Err(anyhow::anyhow!("bad signature")));
        fixture.subscriber_repo.expect_upsert_subscriber().never();

        let result = fixture.build().handle_webhook(b"{}", "t=1,v1=deadbeef").await;

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[tokio::test]
    async fn subscription_updated_upserts_the_mapped_plan() {
        let user_id = Uuid::new_v4();
        let mut fixture = Fixture::new().verifying(
            "customer.subscription.updated",
            subscription_object(user_id, "active"),
        );

        fixture
            .plan_catalog
            .expect_find_by_stripe_price_id()
            .with(eq("price_123"))
            .returning(|_| Box::pin(async { Ok(Some(builder_plan())) }));

        fixture
            .subscriber_repo
            .expect_upsert_subscriber()
            .withf(move |upsert| {
                upsert.user_id == user_id
                    && upsert.plan_id.as_deref() == Some("builder")
                    && upsert.billing_interval == Some(BillingInterval::Month)
                    && upsert.subscribed
                    && upsert.status.as_deref() == Some("active")
                    && upsert.subscription_tier.as_deref() == Some("Builder – Legacy Builder")
                    && upsert.stripe_subscription_id.as_deref() == Some("sub_123")
                    && upsert.event_at == ts_to_datetime(Some(EVENT_CREATED)).unwrap()
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let result = fixture.build().handle_webhook(b"{}", "sig").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn redelivering_the_same_event_produces_the_same_upsert() {
        let user_id = Uuid::new_v4();
        let mut fixture = Fixture::new().verifying(
            "customer.subscription.updated",
            subscription_object(user_id, "active"),
        );

        fixture
            .plan_catalog
            .expect_find_by_stripe_price_id()
            .returning(|_| Box::pin(async { Ok(Some(builder_plan())) }));

        fixture
            .subscriber_repo
            .expect_upsert_subscriber()
            .withf(move |upsert| {
                upsert.user_id == user_id
                    && upsert.event_at == ts_to_datetime(Some(EVENT_CREATED)).unwrap()
            })
            .times(2)
            .returning(|_| Box::pin(async { Ok(()) }));

        let usecase = fixture.build();
        assert!(usecase.handle_webhook(b"{}", "sig").await.is_ok());
        assert!(usecase.handle_webhook(b"{}", "sig").await.is_ok());
    }

    #[tokio::test]
    async fn subscription_deleted_clears_plan_linkage() {
        let user_id = Uuid::new_v4();
        let mut fixture = Fixture::new().verifying(
            "customer.subscription.deleted",
            subscription_object(user_id, "canceled"),
        );

        fixture
            .subscriber_repo
            .expect_upsert_subscriber()
            .withf(move |upsert| {
                upsert.user_id == user_id
                    && !upsert.subscribed
                    && upsert.plan_id.is_none()
                    && upsert.stripe_price_id.is_none()
                    && upsert.billing_interval.is_none()
                    && upsert.subscription_tier.is_none()
                    && upsert.status.as_deref() == Some("canceled")
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let result = fixture.build().handle_webhook(b"{}", "sig").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn checkout_completed_resolves_the_subscription_and_user() {
        let user_id = Uuid::new_v4();
        let mut fixture = Fixture::new().verifying(
            "checkout.session.completed",
            serde_json::json!({
                "id": "cs_1",
                "mode": "subscription",
                "subscription": "sub_123",
                "customer": "cus_9",
                "metadata": { "user_id": user_id.to_string() },
                "customer_details": { "email": "payer@example.com" }
            }),
        );

        fixture
            .billing
            .expect_retrieve_subscription()
            .with(eq("sub_123"))
            .returning(move |_| {
                Box::pin(async move {
                    Ok(serde_json::from_value(subscription_object(
                        user_id, "active",
                    ))?)
                })
            });

        fixture
            .plan_catalog
            .expect_find_by_stripe_price_id()
            .with(eq("price_123"))
            .returning(|_| Box::pin(async { Ok(Some(builder_plan())) }));

        fixture
            .subscriber_repo
            .expect_upsert_subscriber()
            .withf(move |upsert| {
                upsert.user_id == user_id
                    && upsert.email.as_deref() == Some("payer@example.com")
                    && upsert.stripe_customer_id.as_deref() == Some("cus_9")
                    && upsert.plan_id.as_deref() == Some("builder")
                    && upsert.subscribed
                    && upsert.current_period_end.is_some()
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let result = fixture.build().handle_webhook(b"{}", "sig").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn unresolvable_user_drops_the_event_without_error() {
        let object = serde_json::json!({
            "id": "sub_123",
            "customer": null,
            "status": "active",
            "metadata": {},
            "items": { "data": [] }
        });
        let mut fixture = Fixture::new().verifying("customer.subscription.updated", object);

        fixture.subscriber_repo.expect_upsert_subscriber().never();

        let result = fixture.build().handle_webhook(b"{}", "sig").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn unhandled_event_types_are_acknowledged() {
        let mut fixture =
            Fixture::new().verifying("invoice.payment_succeeded", serde_json::json!({}));
        fixture.subscriber_repo.expect_upsert_subscriber().never();

        let result = fixture.build().handle_webhook(b"{}", "sig").await;
        assert!(result.is_ok());
    }
}
