use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*};
use tracing::debug;
use uuid::Uuid;

use crate::{
    domain::{
        entities::subscribers::{SubscriberEntity, UpsertSubscriberEntity},
        repositories::subscribers::SubscriberRepository,
        value_objects::subscribers::SubscriberUpsert,
    },
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::subscribers},
};

pub struct SubscriberPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriberPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriberRepository for SubscriberPostgres {
    async fn upsert_subscriber(&self, upsert: SubscriberUpsert) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Billing events can be redelivered and reordered; only the newest
        // known state may overwrite the row. Concurrent writers still race
        // between the read and the write (tolerated, writes are rare).
        let stored_event_at = subscribers::table
            .filter(subscribers::user_id.eq(upsert.user_id))
            .select(subscribers::last_event_at)
            .first::<Option<DateTime<Utc>>>(&mut conn)
            .optional()?;

        if !upsert.supersedes(stored_event_at.flatten()) {
            debug!(
                user_id = %upsert.user_id,
                stored_event_at = ?stored_event_at,
                incoming_event_at = %upsert.event_at,
                "subscribers: skipping stale billing event"
            );
            return Ok(());
        }

        let entity = UpsertSubscriberEntity::from(upsert);
        insert_into(subscribers::table)
            .values(&entity)
            .on_conflict(subscribers::user_id)
            .do_update()
            .set(&entity)
            .execute(&mut conn)?;

        Ok(())
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<SubscriberEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let subscriber = subscribers::table
            .filter(subscribers::user_id.eq(user_id))
            .select(SubscriberEntity::as_select())
            .first::<SubscriberEntity>(&mut conn)
            .optional()?;

        Ok(subscriber)
    }
}
