use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, sql_types};
use tracing::warn;
use uuid::Uuid;

use crate::{
    domain::{
        repositories::content_usage::ContentUsageRepository,
        value_objects::enums::content_kinds::ContentKind,
    },
    infra::db::postgres::postgres_connection::PgPoolSquad,
};

#[derive(diesel::QueryableByName)]
struct CountRow {
    #[diesel(sql_type = sql_types::BigInt)]
    count: i64,
}

pub struct ContentUsagePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ContentUsagePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ContentUsageRepository for ContentUsagePostgres {
    async fn count_created_since(
        &self,
        kind: ContentKind,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Table and owner column come from the fixed ContentKind enum, never
        // from user input. Raw SQL because the deployed database may predate
        // the is_deleted column on some content tables.
        let base = format!(
            "SELECT COUNT(*) AS count FROM {} WHERE {} = $1 AND created_at >= $2",
            kind.table(),
            kind.owner_column()
        );
        let with_deletion_filter = format!("{base} AND is_deleted IS NOT TRUE");

        let filtered = diesel::sql_query(&with_deletion_filter)
            .bind::<sql_types::Uuid, _>(user_id)
            .bind::<sql_types::Timestamptz, _>(since)
            .get_result::<CountRow>(&mut conn);

        match filtered {
            Ok(row) => Ok(row.count),
            Err(err) if err.to_string().contains("is_deleted") => {
                warn!(
                    table = kind.table(),
                    "content_usage: is_deleted column missing, counting without it"
                );
                let row = diesel::sql_query(&base)
                    .bind::<sql_types::Uuid, _>(user_id)
                    .bind::<sql_types::Timestamptz, _>(since)
                    .get_result::<CountRow>(&mut conn)?;
                Ok(row.count)
            }
            Err(err) => Err(err.into()),
        }
    }
}
