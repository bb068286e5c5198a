use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, dsl::exists, insert_into, prelude::*, select, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::transactions},
};
use domain::{
    entities::transactions::{InsertTransactionEntity, TransactionEntity},
    repositories::transactions::TransactionRepository,
    value_objects::enums::{
        transaction_statuses::TransactionStatus, transaction_types::TransactionType,
    },
};

pub struct TransactionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl TransactionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl TransactionRepository for TransactionPostgres {
    async fn insert(&self, transaction: InsertTransactionEntity) -> Result<TransactionEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(transactions::table)
            .values(&transaction)
            .returning(TransactionEntity::as_returning())
            .get_result::<TransactionEntity>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_id(&self, transaction_id: Uuid) -> Result<Option<TransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = transactions::table
            .find(transaction_id)
            .select(TransactionEntity::as_select())
            .first::<TransactionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_provider_intent_id(
        &self,
        provider_intent_id: &str,
    ) -> Result<Option<TransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = transactions::table
            .filter(transactions::provider_intent_id.eq(provider_intent_id))
            .select(TransactionEntity::as_select())
            .first::<TransactionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn has_completed_purchase(&self, user_id: Uuid, course_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let purchased = select(exists(
            transactions::table
                .filter(transactions::owner_user_id.eq(user_id))
                .filter(transactions::related_id.eq(course_id))
                .filter(transactions::type_.eq(TransactionType::Course.as_str()))
                .filter(transactions::status.eq(TransactionStatus::Completed.as_str())),
        ))
        .get_result::<bool>(&mut conn)?;

        Ok(purchased)
    }

    async fn compare_and_set_status(
        &self,
        provider_intent_id: &str,
        expected: TransactionStatus,
        next: TransactionStatus,
        processed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<TransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        let target = transactions::table
            .filter(transactions::provider_intent_id.eq(provider_intent_id))
            .filter(transactions::status.eq(expected.as_str()));

        let updated = match processed_at {
            Some(processed_at) => update(target)
                .set((
                    transactions::status.eq(next.as_str()),
                    transactions::processed_at.eq(Some(processed_at)),
                    transactions::updated_at.eq(now),
                ))
                .returning(TransactionEntity::as_returning())
                .get_result::<TransactionEntity>(&mut conn)
                .optional()?,
            None => update(target)
                .set((
                    transactions::status.eq(next.as_str()),
                    transactions::updated_at.eq(now),
                ))
                .returning(TransactionEntity::as_returning())
                .get_result::<TransactionEntity>(&mut conn)
                .optional()?,
        };

        Ok(updated)
    }
}
