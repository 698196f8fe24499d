pub mod stripe_client;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use stripe_client::{
    StripeClient, StripeCustomer, StripeEvent, StripePrice, StripeSubscription,
};

/// Seam between the use cases and the payment provider. The concrete client
/// talks to Stripe over HTTPS; tests substitute a mock.
#[async_trait]
#[automock]
pub trait BillingGateway: Send + Sync {
    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<StripeEvent>;

    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<StripeSubscription>;

    async fn retrieve_customer(&self, customer_id: &str) -> Result<StripeCustomer>;

    async fn retrieve_price(&self, price_id: &str) -> Result<StripePrice>;

    async fn list_active_prices(&self) -> Result<Vec<StripePrice>>;

    async fn find_or_create_customer(&self, email: &str, user_id: Uuid) -> Result<String>;

    async fn create_checkout_session(
        &self,
        price_id: &str,
        mode: &str,
        customer_id: Option<String>,
        metadata: HashMap<String, String>,
    ) -> Result<String>;
}

#[async_trait]
impl BillingGateway for StripeClient {
    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<StripeEvent> {
        StripeClient::verify_webhook_signature(self, payload, signature)
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<StripeSubscription> {
        StripeClient::retrieve_subscription(self, subscription_id).await
    }

    async fn retrieve_customer(&self, customer_id: &str) -> Result<StripeCustomer> {
        StripeClient::retrieve_customer(self, customer_id).await
    }

    async fn retrieve_price(&self, price_id: &str) -> Result<StripePrice> {
        StripeClient::retrieve_price(self, price_id).await
    }

    async fn list_active_prices(&self) -> Result<Vec<StripePrice>> {
        StripeClient::list_active_prices(self).await
    }

    async fn find_or_create_customer(&self, email: &str, user_id: Uuid) -> Result<String> {
        StripeClient::find_or_create_customer(self, email, user_id).await
    }

    async fn create_checkout_session(
        &self,
        price_id: &str,
        mode: &str,
        customer_id: Option<String>,
        metadata: HashMap<String, String>,
    ) -> Result<String> {
        StripeClient::create_checkout_session(self, price_id, mode, customer_id, metadata).await
    }
}
