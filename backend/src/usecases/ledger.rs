use std::sync::Arc;

use chrono::Utc;
use settlement::{
    domain::{
        entities::transactions::TransactionEntity,
        repositories::{
            catalog::CatalogRepository, subscriptions::SubscriptionRepository,
            transactions::TransactionRepository,
        },
        value_objects::enums::{
            transaction_statuses::TransactionStatus, transaction_types::TransactionType,
        },
    },
    notifications::{NotificationKind, Notifier, UserNotification},
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    earnings::EarningsCalculator,
    entitlements::EntitlementGrantor,
    errors::{PaymentError, UseCaseResult},
};

/// What a single delivery did to the ledger. Every variant is acknowledged to
/// the provider; only `Err` asks it to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOutcome {
    Applied,
    Duplicate,
    UnknownIntent,
    Ignored(&'static str),
}

/// Owns every status transition of a transaction. Each transition is a single
/// conditional write; the caller that wins it runs the side effects.
pub struct TransactionLedger {
    transaction_repo: Arc<dyn TransactionRepository + Send + Sync>,
    subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
    catalog_repo: Arc<dyn CatalogRepository + Send + Sync>,
    grantor: Arc<EntitlementGrantor>,
    earnings: Arc<EarningsCalculator>,
    notifier: Notifier,
}

impl TransactionLedger {
    pub fn new(
        transaction_repo: Arc<dyn TransactionRepository + Send + Sync>,
        subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
        catalog_repo: Arc<dyn CatalogRepository + Send + Sync>,
        grantor: Arc<EntitlementGrantor>,
        earnings: Arc<EarningsCalculator>,
        notifier: Notifier,
    ) -> Self {
        Self {
            transaction_repo,
            subscription_repo,
            catalog_repo,
            grantor,
            earnings,
            notifier,
        }
    }

    pub async fn apply_intent_succeeded(&self, intent_id: &str) -> UseCaseResult<LedgerOutcome> {
        let transitioned = self
            .transition(
                intent_id,
                TransactionStatus::Pending,
                TransactionStatus::Completed,
            )
            .await?;

        let Some(transaction) = transitioned else {
            return self
                .explain_lost_transition(intent_id, TransactionStatus::Completed)
                .await;
        };

        info!(
            transaction_id = %transaction.id,
            %intent_id,
            user_id = %transaction.owner_user_id,
            "ledger: transaction completed"
        );

        self.run_completion_side_effects(&transaction).await;

        self.notifier.try_notify(
            UserNotification::new(
                transaction.owner_user_id,
                NotificationKind::PaymentSucceeded,
                "Payment received",
                format!(
                    "Your payment of {} {} was successful.",
                    transaction.amount,
                    transaction.currency.to_uppercase()
                ),
            )
            .with_data("transaction_id", transaction.id)
            .with_data("type", &transaction.type_),
        );

        Ok(LedgerOutcome::Applied)
    }

    pub async fn apply_intent_failed(
        &self,
        intent_id: &str,
        failure_message: Option<&str>,
    ) -> UseCaseResult<LedgerOutcome> {
        let transitioned = self
            .transition(intent_id, TransactionStatus::Pending, TransactionStatus::Failed)
            .await?;

        let Some(transaction) = transitioned else {
            return self
                .explain_lost_transition(intent_id, TransactionStatus::Failed)
                .await;
        };

        info!(
            transaction_id = %transaction.id,
            %intent_id,
            failure_message = failure_message.unwrap_or("unknown"),
            "ledger: transaction failed"
        );

        self.notifier.try_notify(
            UserNotification::new(
                transaction.owner_user_id,
                NotificationKind::PaymentFailed,
                "Payment failed",
                failure_message
                    .unwrap_or("Your payment could not be completed.")
                    .to_string(),
            )
            .with_data("transaction_id", transaction.id),
        );

        Ok(LedgerOutcome::Applied)
    }

    /// Renewal for an existing subscription. No transaction row is involved.
    pub async fn apply_invoice_paid(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> UseCaseResult<LedgerOutcome> {
        let subscription = self
            .subscription_repo
            .find_by_user_and_plan(user_id, plan_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %plan_id,
                    db_error = ?err,
                    "ledger: failed to load subscription for renewal"
                );
                PaymentError::Internal(err)
            })?;

        let Some(subscription) = subscription else {
            warn!(
                %user_id,
                %plan_id,
                "ledger: invoice paid for unknown subscription; ignoring"
            );
            return Ok(LedgerOutcome::Ignored("unknown subscription"));
        };

        let plan = self
            .catalog_repo
            .find_plan(plan_id)
            .await
            .map_err(|err| {
                error!(%plan_id, db_error = ?err, "ledger: failed to load plan for renewal");
                PaymentError::Internal(err)
            })?;

        let Some(plan) = plan else {
            error!(
                %plan_id,
                subscription_id = %subscription.id,
                "ledger: invoice paid for a plan missing from the catalog"
            );
            return Ok(LedgerOutcome::Ignored("unknown plan"));
        };

        let period = plan.billing_cycle.period_from(Utc::now());
        let renewed = self
            .subscription_repo
            .renew(subscription.id, period)
            .await
            .map_err(|err| {
                error!(
                    subscription_id = %subscription.id,
                    db_error = ?err,
                    "ledger: failed to renew subscription"
                );
                PaymentError::Internal(err)
            })?;

        info!(
            subscription_id = %renewed.id,
            %user_id,
            %plan_id,
            end_date = ?renewed.end_date,
            "ledger: subscription renewed"
        );

        self.notifier.try_notify(
            UserNotification::new(
                user_id,
                NotificationKind::SubscriptionRenewed,
                "Subscription renewed",
                format!("Your {} subscription has been renewed.", plan.name),
            )
            .with_data("subscription_id", renewed.id),
        );

        Ok(LedgerOutcome::Applied)
    }

    /// `completed -> refunded`. Earnings stop being payable; access is kept.
    pub async fn apply_refund(&self, intent_id: &str) -> UseCaseResult<LedgerOutcome> {
        let transitioned = self
            .transition(
                intent_id,
                TransactionStatus::Completed,
                TransactionStatus::Refunded,
            )
            .await?;

        let Some(transaction) = transitioned else {
            return self
                .explain_lost_transition(intent_id, TransactionStatus::Refunded)
                .await;
        };

        info!(
            transaction_id = %transaction.id,
            %intent_id,
            "ledger: transaction refunded"
        );

        if transaction.transaction_type() == Some(TransactionType::Course) {
            if let Err(err) = self.earnings.hold_for_refund(transaction.id).await {
                error!(
                    transaction_id = %transaction.id,
                    error = %err,
                    "ledger: failed to hold earnings after refund"
                );
            }
        }

        self.notifier.try_notify(
            UserNotification::new(
                transaction.owner_user_id,
                NotificationKind::PaymentRefunded,
                "Payment refunded",
                format!(
                    "{} {} has been refunded.",
                    transaction.amount,
                    transaction.currency.to_uppercase()
                ),
            )
            .with_data("transaction_id", transaction.id),
        );

        Ok(LedgerOutcome::Applied)
    }

    /// Re-runs the side effects of a completed transaction. Used by operators
    /// after a side effect failed past the status transition.
    pub async fn replay_completion(&self, transaction_id: Uuid) -> UseCaseResult<TransactionEntity> {
        let transaction = self
            .transaction_repo
            .find_by_id(transaction_id)
            .await
            .map_err(|err| {
                error!(
                    %transaction_id,
                    db_error = ?err,
                    "ledger: failed to load transaction for replay"
                );
                PaymentError::Internal(err)
            })?
            .ok_or(PaymentError::NotFound("transaction"))?;

        if transaction.status() != Some(TransactionStatus::Completed) {
            return Err(PaymentError::Conflict(format!(
                "transaction is {}, only completed transactions can be replayed",
                transaction.status
            )));
        }

        info!(%transaction_id, "ledger: replaying completion side effects");
        self.grantor.grant(&transaction).await?;
        self.earnings.record(&transaction).await?;

        Ok(transaction)
    }

    async fn transition(
        &self,
        intent_id: &str,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> UseCaseResult<Option<TransactionEntity>> {
        // Only the terminal move out of pending stamps processed_at.
        let processed_at = (expected == TransactionStatus::Pending).then(Utc::now);

        self.transaction_repo
            .compare_and_set_status(intent_id, expected, next, processed_at)
            .await
            .map_err(|err| {
                error!(
                    %intent_id,
                    %expected,
                    %next,
                    db_error = ?err,
                    "ledger: conditional status update failed"
                );
                PaymentError::Internal(err)
            })
    }

    // The conditional write matched nothing. Work out whether this delivery is a
    // duplicate, arrived before the intent was recorded, or conflicts with an
    // earlier terminal status.
    async fn explain_lost_transition(
        &self,
        intent_id: &str,
        wanted: TransactionStatus,
    ) -> UseCaseResult<LedgerOutcome> {
        let current = self
            .transaction_repo
            .find_by_provider_intent_id(intent_id)
            .await
            .map_err(|err| {
                error!(
                    %intent_id,
                    db_error = ?err,
                    "ledger: failed to load transaction by intent"
                );
                PaymentError::Internal(err)
            })?;

        let Some(current) = current else {
            warn!(
                %intent_id,
                wanted = %wanted,
                "ledger: no transaction for provider intent; acknowledging"
            );
            return Ok(LedgerOutcome::UnknownIntent);
        };

        let current_status = current.status();
        if current_status == Some(wanted)
            || (wanted == TransactionStatus::Completed
                && current_status == Some(TransactionStatus::Refunded))
        {
            info!(
                transaction_id = %current.id,
                status = %current.status,
                "ledger: duplicate delivery; already applied"
            );
            return Ok(LedgerOutcome::Duplicate);
        }

        if wanted == TransactionStatus::Failed && current_status == Some(TransactionStatus::Completed)
        {
            // The provider reversed a payment we already fulfilled. Flag it for
            // manual review; nothing is charged back automatically.
            error!(
                transaction_id = %current.id,
                %intent_id,
                "ledger: failure reported for a completed transaction; manual review required"
            );
            return Ok(LedgerOutcome::Ignored("failure after completion"));
        }

        warn!(
            transaction_id = %current.id,
            status = %current.status,
            wanted = %wanted,
            "ledger: transition not allowed from current status; ignoring"
        );
        Ok(LedgerOutcome::Ignored("transition not allowed"))
    }

    async fn run_completion_side_effects(&self, transaction: &TransactionEntity) {
        if let Err(err) = self.grantor.grant(transaction).await {
            error!(
                transaction_id = %transaction.id,
                error = %err,
                "ledger: failed to grant entitlement; replay required"
            );
        }

        if let Err(err) = self.earnings.record(transaction).await {
            error!(
                transaction_id = %transaction.id,
                error = %err,
                "ledger: failed to record earnings; replay required"
            );
        }
    }
}
