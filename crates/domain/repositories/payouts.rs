use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::payouts::{InsertPayoutEntity, PayoutAccountEntity, PayoutEntity};

#[automock]
#[async_trait]
pub trait PayoutRepository {
    async fn find_account(&self, teacher_id: Uuid) -> Result<Option<PayoutAccountEntity>>;

    async fn create(&self, payout: InsertPayoutEntity) -> Result<PayoutEntity>;

    async fn mark_completed(&self, payout_id: Uuid, transfer_reference: String) -> Result<()>;

    async fn mark_on_hold(&self, payout_id: Uuid) -> Result<()>;

    async fn mark_failed(&self, payout_id: Uuid, reason: String) -> Result<()>;
}
