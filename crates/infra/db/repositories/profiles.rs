use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*};
use uuid::Uuid;

use crate::{
    domain::repositories::profiles::ProfileRepository,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::profiles},
};

pub struct ProfilePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ProfilePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ProfileRepository for ProfilePostgres {
    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Older rows kept the address in `username`, so match both columns.
        let user_id = profiles::table
            .filter(profiles::email.eq(email).or(profiles::username.eq(email)))
            .select(profiles::id)
            .first::<Uuid>(&mut conn)
            .optional()?;

        Ok(user_id)
    }
}
