use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{payout_accounts, payouts},
    },
};
use domain::{
    entities::payouts::{InsertPayoutEntity, PayoutAccountEntity, PayoutEntity},
    repositories::payouts::PayoutRepository,
    value_objects::enums::payout_statuses::PayoutStatus,
};

pub struct PayoutPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PayoutPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PayoutRepository for PayoutPostgres {
    async fn find_account(&self, teacher_id: Uuid) -> Result<Option<PayoutAccountEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let account = payout_accounts::table
            .find(teacher_id)
            .select(PayoutAccountEntity::as_select())
            .first::<PayoutAccountEntity>(&mut conn)
            .optional()?;

        Ok(account)
    }

    async fn create(&self, payout: InsertPayoutEntity) -> Result<PayoutEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(payouts::table)
            .values(&payout)
            .returning(PayoutEntity::as_returning())
            .get_result::<PayoutEntity>(&mut conn)?;

        Ok(result)
    }

    async fn mark_completed(&self, payout_id: Uuid, transfer_reference: String) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(payouts::table.find(payout_id))
            .set((
                payouts::status.eq(PayoutStatus::Completed.as_str()),
                payouts::transfer_reference.eq(Some(transfer_reference)),
                payouts::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        if updated != 1 {
            bail!("payout {payout_id} was not found when recording its transfer");
        }

        Ok(())
    }

    async fn mark_on_hold(&self, payout_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(payouts::table.find(payout_id))
            .set((
                payouts::status.eq(PayoutStatus::OnHold.as_str()),
                payouts::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn mark_failed(&self, payout_id: Uuid, reason: String) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(payouts::table.find(payout_id))
            .set((
                payouts::status.eq(PayoutStatus::Failed.as_str()),
                payouts::failure_reason.eq(Some(reason)),
                payouts::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
