use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::infra::db::postgres::schema::earnings;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = earnings)]
pub struct EarningEntity {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub course_id: Uuid,
    pub transaction_id: Uuid,
    pub gross_amount: Decimal,
    pub commission_rate: Decimal,
    pub platform_fee: Decimal,
    pub net_amount: Decimal,
    pub currency: String,
    pub status: String,
    pub payout_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = earnings)]
pub struct InsertEarningEntity {
    pub teacher_id: Uuid,
    pub course_id: Uuid,
    pub transaction_id: Uuid,
    pub gross_amount: Decimal,
    pub commission_rate: Decimal,
    pub platform_fee: Decimal,
    pub net_amount: Decimal,
    pub currency: String,
    pub status: String,
}
