use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::transactions::{InsertTransactionEntity, TransactionEntity},
    value_objects::enums::transaction_statuses::TransactionStatus,
};

#[automock]
#[async_trait]
pub trait TransactionRepository {
    async fn insert(&self, transaction: InsertTransactionEntity) -> Result<TransactionEntity>;

    async fn find_by_id(&self, transaction_id: Uuid) -> Result<Option<TransactionEntity>>;

    async fn find_by_provider_intent_id(
        &self,
        provider_intent_id: &str,
    ) -> Result<Option<TransactionEntity>>;

    async fn has_completed_purchase(&self, user_id: Uuid, course_id: Uuid) -> Result<bool>;

    /// Moves the row to `next` only while it is still `expected`, in one
    /// conditional write. Returns the updated row when this call performed the
    /// transition and `None` when another delivery got there first.
    /// `processed_at` of `None` leaves the stored value untouched.
    async fn compare_and_set_status(
        &self,
        provider_intent_id: &str,
        expected: TransactionStatus,
        next: TransactionStatus,
        processed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<TransactionEntity>>;
}
