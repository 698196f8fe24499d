use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::mentorship_levels::MentorshipLevel,
    infra::db::postgres::schema::plan_limits,
};

/// One resource-scoped limit row. Each (plan_id, resource) pair has at most
/// one active row; numeric resources carry `limit_value` over a `period`
/// window, the mentorship resource carries `mentorship_value` instead.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plan_limits)]
pub struct PlanLimitEntity {
    pub id: Uuid,
    pub plan_id: String,
    pub resource: String,
    pub period: Option<String>,
    pub limit_value: Option<i64>,
    pub mentorship_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PlanLimitEntity {
    pub fn mentorship(&self) -> Option<MentorshipLevel> {
        self.mentorship_value
            .as_deref()
            .map(MentorshipLevel::from_db_value)
    }
}
