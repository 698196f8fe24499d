use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::entitlements::AccessRow;

#[async_trait]
#[automock]
pub trait AccessRepository {
    /// Live server-side capability row for a user. Entitlements can be
    /// adjusted manually (grants, trials) without changing the nominal plan,
    /// so this row overrides plan-derived defaults when present. `None` means
    /// no row exists and the static defaults apply.
    async fn current_access(&self, user_id: Uuid) -> Result<Option<AccessRow>>;
}
