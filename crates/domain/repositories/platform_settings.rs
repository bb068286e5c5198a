use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use rust_decimal::Decimal;

#[automock]
#[async_trait]
pub trait PlatformSettingsRepository {
    /// Global commission percentage, e.g. `30` for 30%. `None` when unset.
    async fn current_commission_rate(&self) -> Result<Option<Decimal>>;
}
