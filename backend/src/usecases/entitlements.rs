use std::sync::Arc;

use chrono::{DateTime, Utc};
use settlement::domain::{
    entities::{
        enrollments::InsertEnrollmentEntity,
        subscriptions::{SubscriptionEntity, UpsertSubscriptionEntity},
        transactions::TransactionEntity,
    },
    repositories::{
        catalog::CatalogRepository, enrollments::EnrollmentRepository,
        subscriptions::SubscriptionRepository,
    },
    value_objects::enums::{
        billing_cycles::BillingCycle, subscription_statuses::SubscriptionStatus,
        transaction_types::TransactionType,
    },
};
use tracing::{error, info};
use uuid::Uuid;

use super::errors::{PaymentError, UseCaseResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    EnrollmentCreated,
    AlreadyEnrolled,
    SubscriptionActivated { subscription_id: Uuid },
    NotApplicable,
}

/// Turns a completed transaction into access. Safe to call any number of times
/// for the same transaction.
pub struct EntitlementGrantor {
    catalog_repo: Arc<dyn CatalogRepository + Send + Sync>,
    subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
    enrollment_repo: Arc<dyn EnrollmentRepository + Send + Sync>,
}

impl EntitlementGrantor {
    pub fn new(
        catalog_repo: Arc<dyn CatalogRepository + Send + Sync>,
        subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
        enrollment_repo: Arc<dyn EnrollmentRepository + Send + Sync>,
    ) -> Self {
        Self {
            catalog_repo,
            subscription_repo,
            enrollment_repo,
        }
    }

    pub async fn grant(&self, transaction: &TransactionEntity) -> UseCaseResult<Grant> {
        match transaction.transaction_type() {
            Some(TransactionType::Course) => self.enroll(transaction).await,
            Some(TransactionType::Subscription) => {
                if let Some(existing) = self.subscription_granted_by(transaction).await? {
                    info!(
                        transaction_id = %transaction.id,
                        subscription_id = %existing.id,
                        "entitlements: subscription already granted for transaction"
                    );
                    return Ok(Grant::SubscriptionActivated {
                        subscription_id: existing.id,
                    });
                }

                let billing_cycle = self.billing_cycle_for(transaction).await?;
                // The period starts when the ledger completed the transaction, not when
                // the grant happens to run.
                let start_date = transaction.processed_at.unwrap_or_else(Utc::now);
                let subscription = self
                    .activate_subscription(
                        transaction.owner_user_id,
                        transaction.related_id,
                        billing_cycle,
                        Some(transaction.id),
                        start_date,
                    )
                    .await?;

                Ok(Grant::SubscriptionActivated {
                    subscription_id: subscription.id,
                })
            }
            Some(TransactionType::Refund) | None => Ok(Grant::NotApplicable),
        }
    }

    /// Upserts the `(user, plan)` row as active with dates derived from `start_date`.
    pub async fn activate_subscription(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        billing_cycle: BillingCycle,
        transaction_id: Option<Uuid>,
        start_date: DateTime<Utc>,
    ) -> UseCaseResult<SubscriptionEntity> {
        let period = billing_cycle.period_from(start_date);

        let subscription = self
            .subscription_repo
            .upsert(UpsertSubscriptionEntity {
                user_id,
                plan_id,
                status: SubscriptionStatus::Active.to_string(),
                start_date: period.start_date,
                end_date: period.end_date,
                renewal_date: period.renewal_date,
                transaction_id,
            })
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %plan_id,
                    db_error = ?err,
                    "entitlements: failed to upsert subscription"
                );
                PaymentError::Internal(err)
            })?;

        info!(
            %user_id,
            %plan_id,
            subscription_id = %subscription.id,
            billing_cycle = %billing_cycle,
            end_date = ?subscription.end_date,
            "entitlements: subscription active"
        );

        Ok(subscription)
    }

    async fn enroll(&self, transaction: &TransactionEntity) -> UseCaseResult<Grant> {
        let student_id = transaction.owner_user_id;
        let course_id = transaction.related_id;

        let created = self
            .enrollment_repo
            .insert_if_absent(InsertEnrollmentEntity {
                student_id,
                course_id,
                progress: 0,
                transaction_id: Some(transaction.id),
            })
            .await
            .map_err(|err| {
                error!(
                    %student_id,
                    %course_id,
                    transaction_id = %transaction.id,
                    db_error = ?err,
                    "entitlements: failed to insert enrollment"
                );
                PaymentError::Internal(err)
            })?;

        if created {
            info!(%student_id, %course_id, "entitlements: enrollment created");
            Ok(Grant::EnrollmentCreated)
        } else {
            info!(%student_id, %course_id, "entitlements: student already enrolled");
            Ok(Grant::AlreadyEnrolled)
        }
    }

    async fn subscription_granted_by(
        &self,
        transaction: &TransactionEntity,
    ) -> UseCaseResult<Option<SubscriptionEntity>> {
        let existing = self
            .subscription_repo
            .find_by_user_and_plan(transaction.owner_user_id, transaction.related_id)
            .await
            .map_err(|err| {
                error!(
                    transaction_id = %transaction.id,
                    db_error = ?err,
                    "entitlements: failed to load subscription"
                );
                PaymentError::Internal(err)
            })?;

        Ok(existing.filter(|subscription| subscription.transaction_id == Some(transaction.id)))
    }

    // Prefer the snapshot taken at intent creation; fall back to the catalog for
    // transactions written before the snapshot carried the cycle.
    async fn billing_cycle_for(&self, transaction: &TransactionEntity) -> UseCaseResult<BillingCycle> {
        if let Some(billing_cycle) = transaction.metadata().billing_cycle {
            return Ok(billing_cycle);
        }

        let plan = self
            .catalog_repo
            .find_plan(transaction.related_id)
            .await
            .map_err(PaymentError::Internal)?
            .ok_or(PaymentError::NotFound("plan"))?;

        Ok(plan.billing_cycle)
    }
}
