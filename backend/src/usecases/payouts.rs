use std::sync::Arc;

use rust_decimal::Decimal;
use settlement::domain::{
    entities::{earnings::EarningEntity, payouts::InsertPayoutEntity},
    repositories::{earnings::EarningsRepository, payouts::PayoutRepository},
    value_objects::{
        enums::{earning_statuses::EarningStatus, payout_statuses::PayoutStatus},
        money::to_minor_units,
        payouts::{PayoutBalance, PayoutReceipt, PayoutRequest, TransferRequest},
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    errors::{PaymentError, UseCaseResult},
    gateway::TransferExecutor,
};

pub struct PayoutUseCase {
    earnings_repo: Arc<dyn EarningsRepository + Send + Sync>,
    payout_repo: Arc<dyn PayoutRepository + Send + Sync>,
    executor: Arc<dyn TransferExecutor>,
    minimum_payout: Decimal,
    currency: String,
}

impl PayoutUseCase {
    pub fn new(
        earnings_repo: Arc<dyn EarningsRepository + Send + Sync>,
        payout_repo: Arc<dyn PayoutRepository + Send + Sync>,
        executor: Arc<dyn TransferExecutor>,
        minimum_payout: Decimal,
        currency: String,
    ) -> Self {
        Self {
            earnings_repo,
            payout_repo,
            executor,
            minimum_payout,
            currency: currency.to_lowercase(),
        }
    }

    pub async fn available_balance(&self, teacher_id: Uuid) -> UseCaseResult<PayoutBalance> {
        let available: Decimal = self
            .available_earnings(teacher_id)
            .await?
            .iter()
            .map(|earning| earning.net_amount)
            .sum();

        Ok(PayoutBalance {
            teacher_id,
            available,
            currency: self.currency.clone(),
            minimum_payout: self.minimum_payout,
        })
    }

    pub async fn request_payout(
        &self,
        teacher_id: Uuid,
        request: PayoutRequest,
    ) -> UseCaseResult<PayoutReceipt> {
        let requested = request.amount;
        if requested <= Decimal::ZERO {
            return Err(PaymentError::Validation("amount must be positive".into()));
        }

        info!(%teacher_id, %requested, "payouts: payout requested");

        let earnings = self.available_earnings(teacher_id).await?;
        let available: Decimal = earnings.iter().map(|earning| earning.net_amount).sum();

        if requested > available {
            info!(%teacher_id, %requested, %available, "payouts: insufficient funds");
            return Err(PaymentError::InsufficientFunds {
                requested,
                available,
            });
        }
        if requested < self.minimum_payout {
            return Err(PaymentError::BelowMinimum {
                minimum: self.minimum_payout,
            });
        }

        let (selected, amount) = select_oldest_within(&earnings, requested);
        if selected.is_empty() {
            return Err(PaymentError::Validation(
                "requested amount is smaller than the oldest available earning".into(),
            ));
        }
        if amount < self.minimum_payout {
            return Err(PaymentError::BelowMinimum {
                minimum: self.minimum_payout,
            });
        }

        let account = self
            .payout_repo
            .find_account(teacher_id)
            .await
            .map_err(|err| {
                error!(%teacher_id, db_error = ?err, "payouts: failed to load payout account");
                PaymentError::Internal(err)
            })?
            .ok_or_else(|| PaymentError::Validation("no payout account configured".into()))?;

        let payout_id = Uuid::new_v4();
        self.payout_repo
            .create(InsertPayoutEntity {
                id: payout_id,
                teacher_id,
                amount,
                currency: self.currency.clone(),
                status: PayoutStatus::Processing.to_string(),
            })
            .await
            .map_err(|err| {
                error!(%teacher_id, db_error = ?err, "payouts: failed to create payout");
                PaymentError::Internal(err)
            })?;

        let claim_status = if account.compliance_hold {
            EarningStatus::Hold
        } else {
            EarningStatus::Paid
        };
        self.claim(payout_id, &selected, claim_status).await?;

        if account.compliance_hold {
            if let Err(err) = self.payout_repo.mark_on_hold(payout_id).await {
                error!(%payout_id, db_error = ?err, "payouts: failed to mark payout on hold");
                self.compensate(payout_id, "hold could not be recorded").await;
                return Err(PaymentError::Internal(err));
            }
            warn!(%teacher_id, %payout_id, "payouts: account under compliance hold; payout held");

            return Ok(PayoutReceipt {
                payout_id,
                requested_amount: requested,
                amount,
                currency: self.currency.clone(),
                status: PayoutStatus::OnHold,
                transfer_reference: None,
                earnings_count: selected.len(),
            });
        }

        let amount_minor = match to_minor_units(amount, &self.currency) {
            Ok(amount_minor) => amount_minor,
            Err(err) => {
                self.compensate(payout_id, &err.to_string()).await;
                return Err(PaymentError::Internal(err));
            }
        };

        let transfer = self
            .executor
            .transfer(TransferRequest {
                payout_id,
                destination_account: account.provider_account_id.clone(),
                amount_minor,
                currency: self.currency.clone(),
            })
            .await;

        let transfer_reference = match transfer {
            Ok(reference) => reference,
            Err(err) => {
                error!(%payout_id, error = ?err, "payouts: transfer failed");
                self.compensate(payout_id, &err.to_string()).await;
                return Err(PaymentError::Provider(err));
            }
        };

        if let Err(err) = self
            .payout_repo
            .mark_completed(payout_id, transfer_reference.clone())
            .await
        {
            error!(
                %payout_id,
                %transfer_reference,
                db_error = ?err,
                "payouts: failed to record completed transfer; reversing"
            );
            if let Err(reverse_err) = self.executor.reverse(&transfer_reference).await {
                error!(
                    %payout_id,
                    %transfer_reference,
                    error = ?reverse_err,
                    "payouts: transfer reversal failed; manual review required"
                );
            }
            self.compensate(payout_id, "transfer could not be recorded").await;
            return Err(PaymentError::Internal(err));
        }

        info!(
            %teacher_id,
            %payout_id,
            %amount,
            %transfer_reference,
            earnings_count = selected.len(),
            "payouts: payout completed"
        );

        Ok(PayoutReceipt {
            payout_id,
            requested_amount: requested,
            amount,
            currency: self.currency.clone(),
            status: PayoutStatus::Completed,
            transfer_reference: Some(transfer_reference),
            earnings_count: selected.len(),
        })
    }

    async fn available_earnings(&self, teacher_id: Uuid) -> UseCaseResult<Vec<EarningEntity>> {
        let earnings = self
            .earnings_repo
            .list_available_by_teacher(teacher_id)
            .await
            .map_err(|err| {
                error!(%teacher_id, db_error = ?err, "payouts: failed to load earnings");
                PaymentError::Internal(err)
            })?;

        Ok(earnings
            .into_iter()
            .filter(|earning| earning.currency.eq_ignore_ascii_case(&self.currency))
            .collect())
    }

    async fn claim(
        &self,
        payout_id: Uuid,
        selected: &[Uuid],
        status: EarningStatus,
    ) -> UseCaseResult<()> {
        let claimed = self
            .earnings_repo
            .claim_for_payout(selected.to_vec(), payout_id, status)
            .await
            .map_err(|err| {
                error!(%payout_id, db_error = ?err, "payouts: failed to claim earnings");
                PaymentError::Internal(err)
            })?;

        if claimed != selected.len() {
            warn!(
                %payout_id,
                claimed,
                expected = selected.len(),
                "payouts: earnings changed during claim; releasing"
            );
            self.compensate(payout_id, "earnings changed during claim").await;
            return Err(PaymentError::Conflict(
                "earnings changed while the payout was being prepared".into(),
            ));
        }

        Ok(())
    }

    // Puts claimed rows back to available and closes the payout as failed.
    async fn compensate(&self, payout_id: Uuid, reason: &str) {
        match self.earnings_repo.release_payout(payout_id).await {
            Ok(released) => info!(%payout_id, released, "payouts: earnings released"),
            Err(err) => error!(
                %payout_id,
                db_error = ?err,
                "payouts: failed to release earnings; manual review required"
            ),
        }

        if let Err(err) = self
            .payout_repo
            .mark_failed(payout_id, reason.to_string())
            .await
        {
            error!(%payout_id, db_error = ?err, "payouts: failed to mark payout failed");
        }
    }
}

/// Walks earnings oldest first and keeps every whole row that still fits under
/// `limit`. Returns the chosen ids and their sum.
fn select_oldest_within(earnings: &[EarningEntity], limit: Decimal) -> (Vec<Uuid>, Decimal) {
    let mut selected = Vec::new();
    let mut total = Decimal::ZERO;

    for earning in earnings {
        if total + earning.net_amount > limit {
            break;
        }
        total += earning.net_amount;
        selected.push(earning.id);
    }

    (selected, total)
}
