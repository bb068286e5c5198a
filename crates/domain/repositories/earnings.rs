use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::earnings::{EarningEntity, InsertEarningEntity},
    value_objects::enums::earning_statuses::EarningStatus,
};

#[automock]
#[async_trait]
pub trait EarningsRepository {
    /// Returns `false` when a row for the same transaction already exists.
    async fn insert_if_absent(&self, earning: InsertEarningEntity) -> Result<bool>;

    /// Oldest first.
    async fn list_available_by_teacher(&self, teacher_id: Uuid) -> Result<Vec<EarningEntity>>;

    /// Moves the given rows from `available` to `status` and tags them with the
    /// payout. Rows no longer `available` are skipped; returns how many moved.
    async fn claim_for_payout(
        &self,
        earning_ids: Vec<Uuid>,
        payout_id: Uuid,
        status: EarningStatus,
    ) -> Result<usize>;

    /// Compensating transition: every row tagged with the payout goes back to `available`.
    async fn release_payout(&self, payout_id: Uuid) -> Result<usize>;

    /// `available -> hold` for the row of a refunded transaction.
    async fn hold_by_transaction_id(&self, transaction_id: Uuid) -> Result<bool>;
}
