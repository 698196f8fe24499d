use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

#[async_trait]
#[automock]
pub trait ProfileRepository {
    /// Matches the address against both the email and username columns.
    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<Uuid>>;
}
