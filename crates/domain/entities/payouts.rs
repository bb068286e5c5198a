use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::infra::db::postgres::schema::{payout_accounts, payouts};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payouts)]
pub struct PayoutEntity {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub transfer_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payouts)]
pub struct InsertPayoutEntity {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payout_accounts)]
#[diesel(primary_key(teacher_id))]
pub struct PayoutAccountEntity {
    pub teacher_id: Uuid,
    pub provider_account_id: String,
    pub compliance_hold: bool,
    pub updated_at: DateTime<Utc>,
}
