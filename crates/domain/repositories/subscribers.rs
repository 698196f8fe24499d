use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscribers::SubscriberEntity;
use crate::domain::value_objects::subscribers::SubscriberUpsert;

#[async_trait]
#[automock]
pub trait SubscriberRepository {
    /// Idempotent latest-known-state write keyed by user id. Implementations
    /// must skip the write when the stored row carries a newer `event_at`.
    async fn upsert_subscriber(&self, upsert: SubscriberUpsert) -> Result<()>;

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<SubscriberEntity>>;
}
