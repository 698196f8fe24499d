use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, sql_types};
use uuid::Uuid;

use crate::{
    domain::{
        repositories::access::AccessRepository,
        value_objects::{
            entitlements::AccessRow, enums::mentorship_levels::MentorshipLevel,
        },
    },
    infra::db::postgres::postgres_connection::PgPoolSquad,
};

#[derive(diesel::QueryableByName)]
struct AccessRowDb {
    #[diesel(sql_type = sql_types::Nullable<sql_types::Text>)]
    mentorship: Option<String>,
    #[diesel(sql_type = sql_types::Nullable<sql_types::Bool>)]
    can_view_mentorship: Option<bool>,
    #[diesel(sql_type = sql_types::Nullable<sql_types::Bool>)]
    can_post_wisdom: Option<bool>,
    #[diesel(sql_type = sql_types::Nullable<sql_types::Bool>)]
    can_see_progress_tracker: Option<bool>,
}

pub struct AccessPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl AccessPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl AccessRepository for AccessPostgres {
    async fn current_access(&self, user_id: Uuid) -> Result<Option<AccessRow>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // current_access() folds manual grants and trials into one capability
        // row; it lives in the database so admin tooling shares it.
        let rows = diesel::sql_query(
            "SELECT mentorship, can_view_mentorship, can_post_wisdom, \
             can_see_progress_tracker FROM current_access($1)",
        )
        .bind::<sql_types::Uuid, _>(user_id)
        .load::<AccessRowDb>(&mut conn)?;

        Ok(rows.into_iter().next().map(|row| AccessRow {
            mentorship: row
                .mentorship
                .as_deref()
                .map(MentorshipLevel::from_db_value),
            can_view_mentorship: row.can_view_mentorship,
            can_post_wisdom: row.can_post_wisdom,
            can_see_progress_tracker: row.can_see_progress_tracker,
        }))
    }
}
