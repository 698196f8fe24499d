use legacykeeper::domain::repositories::{
    directory::UserDirectory, profiles::ProfileRepository,
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Resolves which application user a billing event belongs to. Strategies run
/// in order, stopping at the first hit:
///   1. `metadata.user_id` stamped on the checkout session (exact),
///   2. profile row matching the payer's e-mail (or legacy username),
///   3. identity-provider admin lookup by e-mail.
/// A strategy failure is logged and the chain continues; exhausting the chain
/// yields `None` and the caller drops the event.
pub struct IdentityResolver<Prof, Dir>
where
    Prof: ProfileRepository + Send + Sync + 'static,
    Dir: UserDirectory + Send + Sync + 'static,
{
    profiles: Arc<Prof>,
    directory: Arc<Dir>,
}

impl<Prof, Dir> IdentityResolver<Prof, Dir>
where
    Prof: ProfileRepository + Send + Sync + 'static,
    Dir: UserDirectory + Send + Sync + 'static,
{
    pub fn new(profiles: Arc<Prof>, directory: Arc<Dir>) -> Self {
        Self {
            profiles,
            directory,
        }
    }

    pub async fn resolve(
        &self,
        metadata_user_id: Option<&str>,
        email: Option<&str>,
    ) -> Option<Uuid> {
        if let Some(user_id) = Self::from_metadata(metadata_user_id) {
            debug!(%user_id, "identity: resolved from event metadata");
            return Some(user_id);
        }

        let email = email?;

        if let Some(user_id) = self.from_profiles(email).await {
            debug!(%user_id, "identity: resolved from profile email match");
            return Some(user_id);
        }

        if let Some(user_id) = self.from_directory(email).await {
            debug!(%user_id, "identity: resolved from auth directory lookup");
            return Some(user_id);
        }

        None
    }

    fn from_metadata(metadata_user_id: Option<&str>) -> Option<Uuid> {
        metadata_user_id.and_then(|raw| Uuid::parse_str(raw).ok())
    }

    async fn from_profiles(&self, email: &str) -> Option<Uuid> {
        match self.profiles.find_user_id_by_email(email).await {
            Ok(user_id) => user_id,
            Err(err) => {
                warn!(error = ?err, "identity: profile lookup failed, trying next strategy");
                None
            }
        }
    }

    async fn from_directory(&self, email: &str) -> Option<Uuid> {
        match self.directory.find_user_id_by_email(email).await {
            Ok(user_id) => user_id,
            Err(err) => {
                warn!(error = ?err, "identity: auth directory lookup failed");
                None
            }
        }
    }
}
