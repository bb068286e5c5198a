use std::sync::Arc;

use rust_decimal::Decimal;
use settlement::domain::{
    entities::{earnings::InsertEarningEntity, transactions::TransactionEntity},
    repositories::{
        earnings::EarningsRepository, platform_settings::PlatformSettingsRepository,
    },
    value_objects::{
        enums::{earning_statuses::EarningStatus, transaction_types::TransactionType},
        money::CommissionSplit,
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::errors::{PaymentError, UseCaseResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EarningsOutcome {
    Recorded(CommissionSplit),
    AlreadyRecorded,
    Skipped(&'static str),
}

/// Writes the teacher's share of a completed course sale.
pub struct EarningsCalculator {
    earnings_repo: Arc<dyn EarningsRepository + Send + Sync>,
    settings_repo: Arc<dyn PlatformSettingsRepository + Send + Sync>,
    fallback_rate: Decimal,
}

impl EarningsCalculator {
    pub fn new(
        earnings_repo: Arc<dyn EarningsRepository + Send + Sync>,
        settings_repo: Arc<dyn PlatformSettingsRepository + Send + Sync>,
        fallback_rate: Decimal,
    ) -> Self {
        Self {
            earnings_repo,
            settings_repo,
            fallback_rate,
        }
    }

    pub async fn record(&self, transaction: &TransactionEntity) -> UseCaseResult<EarningsOutcome> {
        if transaction.transaction_type() != Some(TransactionType::Course) {
            return Ok(EarningsOutcome::Skipped("not a course sale"));
        }

        let Some(teacher_id) = transaction.metadata().teacher_id else {
            info!(
                transaction_id = %transaction.id,
                "earnings: course has no teacher; nothing to record"
            );
            return Ok(EarningsOutcome::Skipped("no teacher"));
        };

        // The rate is read once here and stored on the row; it is never looked up again.
        let commission_rate = self.snapshot_commission_rate().await?;
        let split = CommissionSplit::compute(transaction.amount, commission_rate)
            .map_err(PaymentError::Internal)?;

        let inserted = self
            .earnings_repo
            .insert_if_absent(InsertEarningEntity {
                teacher_id,
                course_id: transaction.related_id,
                transaction_id: transaction.id,
                gross_amount: split.gross_amount,
                commission_rate: split.commission_rate,
                platform_fee: split.platform_fee,
                net_amount: split.net_amount,
                currency: transaction.currency.clone(),
                status: EarningStatus::Available.to_string(),
            })
            .await
            .map_err(|err| {
                error!(
                    transaction_id = %transaction.id,
                    %teacher_id,
                    db_error = ?err,
                    "earnings: failed to insert earnings row"
                );
                PaymentError::Internal(err)
            })?;

        if !inserted {
            info!(
                transaction_id = %transaction.id,
                %teacher_id,
                "earnings: already recorded for transaction"
            );
            return Ok(EarningsOutcome::AlreadyRecorded);
        }

        info!(
            transaction_id = %transaction.id,
            %teacher_id,
            gross_amount = %split.gross_amount,
            commission_rate = %split.commission_rate,
            platform_fee = %split.platform_fee,
            net_amount = %split.net_amount,
            "earnings: recorded"
        );

        Ok(EarningsOutcome::Recorded(split))
    }

    /// Keeps a refunded sale's earnings out of future payouts.
    pub async fn hold_for_refund(&self, transaction_id: Uuid) -> UseCaseResult<bool> {
        let held = self
            .earnings_repo
            .hold_by_transaction_id(transaction_id)
            .await
            .map_err(|err| {
                error!(
                    %transaction_id,
                    db_error = ?err,
                    "earnings: failed to hold refunded earnings"
                );
                PaymentError::Internal(err)
            })?;

        if held {
            info!(%transaction_id, "earnings: refunded earnings moved to hold");
        } else {
            warn!(
                %transaction_id,
                "earnings: no available earnings to hold for refunded transaction"
            );
        }

        Ok(held)
    }

    async fn snapshot_commission_rate(&self) -> UseCaseResult<Decimal> {
        let rate = self
            .settings_repo
            .current_commission_rate()
            .await
            .map_err(|err| {
                error!(db_error = ?err, "earnings: failed to read commission rate");
                PaymentError::Internal(err)
            })?;

        Ok(match rate {
            Some(rate) => rate,
            None => {
                warn!(
                    fallback_rate = %self.fallback_rate,
                    "earnings: commission rate not configured; using fallback"
                );
                self.fallback_rate
            }
        })
    }
}
