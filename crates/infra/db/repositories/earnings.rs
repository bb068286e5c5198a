use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::earnings},
};
use domain::{
    entities::earnings::{EarningEntity, InsertEarningEntity},
    repositories::earnings::EarningsRepository,
    value_objects::enums::earning_statuses::EarningStatus,
};

pub struct EarningsPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl EarningsPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl EarningsRepository for EarningsPostgres {
    async fn insert_if_absent(&self, earning: InsertEarningEntity) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let inserted = insert_into(earnings::table)
            .values(&earning)
            .on_conflict(earnings::transaction_id)
            .do_nothing()
            .execute(&mut conn)?;

        Ok(inserted == 1)
    }

    async fn list_available_by_teacher(&self, teacher_id: Uuid) -> Result<Vec<EarningEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = earnings::table
            .filter(earnings::teacher_id.eq(teacher_id))
            .filter(earnings::status.eq(EarningStatus::Available.as_str()))
            .order((earnings::created_at.asc(), earnings::id.asc()))
            .select(EarningEntity::as_select())
            .load::<EarningEntity>(&mut conn)?;

        Ok(results)
    }

    async fn claim_for_payout(
        &self,
        earning_ids: Vec<Uuid>,
        payout_id: Uuid,
        status: EarningStatus,
    ) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let claimed = update(
            earnings::table
                .filter(earnings::id.eq_any(earning_ids))
                .filter(earnings::status.eq(EarningStatus::Available.as_str()))
                .filter(earnings::payout_id.is_null()),
        )
        .set((
            earnings::status.eq(status.as_str()),
            earnings::payout_id.eq(Some(payout_id)),
            earnings::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

        Ok(claimed)
    }

    async fn release_payout(&self, payout_id: Uuid) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let released = update(earnings::table.filter(earnings::payout_id.eq(payout_id)))
            .set((
                earnings::status.eq(EarningStatus::Available.as_str()),
                earnings::payout_id.eq(None::<Uuid>),
                earnings::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(released)
    }

    async fn hold_by_transaction_id(&self, transaction_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let held = update(
            earnings::table
                .filter(earnings::transaction_id.eq(transaction_id))
                .filter(earnings::status.eq(EarningStatus::Available.as_str())),
        )
        .set((
            earnings::status.eq(EarningStatus::Hold.as_str()),
            earnings::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

        Ok(held == 1)
    }
}
