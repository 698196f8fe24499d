use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::storage::StoredObject;

#[async_trait]
#[automock]
pub trait StorageLister {
    /// One page of the object listing under `prefix`. A page shorter than
    /// `limit` signals the end of the listing.
    async fn list_page(&self, prefix: &str, limit: i64, offset: i64)
        -> Result<Vec<StoredObject>>;
}
