use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::{SubscriptionEntity, UpsertSubscriptionEntity},
    value_objects::enums::billing_cycles::SubscriptionPeriod,
};

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    async fn find_by_user_and_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Option<SubscriptionEntity>>;

    /// Insert or overwrite the row for `(user_id, plan_id)`.
    async fn upsert(&self, subscription: UpsertSubscriptionEntity) -> Result<SubscriptionEntity>;

    /// Starts a new period and marks the subscription active.
    async fn renew(
        &self,
        subscription_id: Uuid,
        period: SubscriptionPeriod,
    ) -> Result<SubscriptionEntity>;
}
