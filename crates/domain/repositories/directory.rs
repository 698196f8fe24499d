use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

#[async_trait]
#[automock]
pub trait UserDirectory {
    /// Identity-provider lookup by e-mail, used as the last resort when
    /// neither event metadata nor a profile row identifies the payer.
    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<Uuid>>;
}
