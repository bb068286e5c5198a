use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::infra::db::postgres::schema::courses;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = courses)]
pub struct CourseEntity {
    pub id: Uuid,
    pub title: String,
    pub teacher_id: Option<Uuid>,
    pub price: Decimal,
    pub currency: String,
    pub is_free: bool,
    pub created_at: DateTime<Utc>,
}
