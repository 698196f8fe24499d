use chrono::{DateTime, Local, Utc};
use legacykeeper::domain::{
    repositories::{content_usage::ContentUsageRepository, storage::StorageLister},
    value_objects::{enums::content_kinds::ContentKind, usage::UsageSnapshot},
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Storage listings page in bounded chunks; a shorter page ends the listing.
const STORAGE_PAGE_SIZE: i64 = 1000;

/// Computes month-to-date usage for a user: one count per content kind plus
/// the total bytes under the user's storage prefix. Sources run concurrently
/// and fail independently; a failed source contributes zero and the first
/// error is kept on the snapshot.
pub struct UsageAggregator<C, S>
where
    C: ContentUsageRepository + Send + Sync + 'static,
    S: StorageLister + Send + Sync + 'static,
{
    content_repo: Arc<C>,
    storage: Arc<S>,
}

impl<C, S> UsageAggregator<C, S>
where
    C: ContentUsageRepository + Send + Sync + 'static,
    S: StorageLister + Send + Sync + 'static,
{
    pub fn new(content_repo: Arc<C>, storage: Arc<S>) -> Self {
        Self {
            content_repo,
            storage,
        }
    }

    pub async fn collect(&self, user_id: Uuid) -> UsageSnapshot {
        let since = month_start(Local::now());

        let (legacy, idea, timeless, wisdom, storage_bytes) = tokio::join!(
            self.count(ContentKind::Legacy, user_id, since),
            self.count(ContentKind::Idea, user_id, since),
            self.count(ContentKind::Timeless, user_id, since),
            self.count(ContentKind::Wisdom, user_id, since),
            self.total_storage_bytes(user_id),
        );

        let mut error = None;
        let mut unwrap_count = |result: Result<i64, String>| match result {
            Ok(count) => count,
            Err(message) => {
                error.get_or_insert(message);
                0
            }
        };

        let legacy_count_month = unwrap_count(legacy);
        let idea_count_month = unwrap_count(idea);
        let timeless_count_month = unwrap_count(timeless);
        let wisdom_count_month = unwrap_count(wisdom);
        let storage_bytes = unwrap_count(storage_bytes);

        debug!(
            %user_id,
            legacy_count_month,
            idea_count_month,
            timeless_count_month,
            wisdom_count_month,
            storage_bytes,
            degraded = error.is_some(),
            "usage: snapshot collected"
        );

        UsageSnapshot {
            legacy_count_month,
            idea_count_month,
            timeless_count_month,
            wisdom_count_month,
            storage_bytes,
            error,
        }
    }

    async fn count(
        &self,
        kind: ContentKind,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, String> {
        self.content_repo
            .count_created_since(kind, user_id, since)
            .await
            .map_err(|err| {
                warn!(%user_id, %kind, error = ?err, "usage: content count failed");
                err.to_string()
            })
    }

    /// Sums object sizes under the user's prefix, page by page. A listing
    /// failure degrades to zero bytes so the content counts still go through.
    async fn total_storage_bytes(&self, user_id: Uuid) -> Result<i64, String> {
        let prefix = user_id.to_string();
        let mut total = 0_i64;
        let mut offset = 0_i64;

        loop {
            let page = self
                .storage
                .list_page(&prefix, STORAGE_PAGE_SIZE, offset)
                .await
                .map_err(|err| {
                    warn!(%user_id, error = ?err, "usage: storage listing failed");
                    err.to_string()
                })?;

            let page_len = page.len() as i64;
            total += page.iter().map(|object| object.effective_size()).sum::<i64>();

            if page_len < STORAGE_PAGE_SIZE {
                break;
            }
            offset += STORAGE_PAGE_SIZE;
        }

        Ok(total)
    }
}

/// First instant of the current calendar month by the evaluating process's
/// clock. Users in other timezones get the process-local window; accepted.
fn month_start(now: DateTime<Local>) -> DateTime<Utc> {
    use chrono::Datelike;

    now.date_naive()
        .with_day(1)
        .and_then(|first| first.and_hms_opt(0, 0, 0))
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}
