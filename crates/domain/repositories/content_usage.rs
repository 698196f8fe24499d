use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::enums::content_kinds::ContentKind;

#[async_trait]
#[automock]
pub trait ContentUsageRepository {
    /// Counts rows of one content kind owned by the user and created at or
    /// after `since`, excluding soft-deleted rows where the backing table has
    /// the flag. Implementations must retry without the deletion filter when
    /// the column does not exist yet.
    async fn count_created_since(
        &self,
        kind: ContentKind,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64>;
}
