use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use rust_decimal::Decimal;
use settlement::domain::{
    entities::transactions::InsertTransactionEntity,
    repositories::{
        catalog::CatalogRepository, subscriptions::SubscriptionRepository,
        transactions::TransactionRepository,
    },
    value_objects::{
        enums::{transaction_statuses::TransactionStatus, transaction_types::TransactionType},
        money::to_minor_units,
        payment_intents::{CreateIntentRequest, CreateIntentResponse, PurchaseKind},
        transactions::TransactionMetadata,
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    entitlements::EntitlementGrantor,
    errors::{PaymentError, UseCaseResult},
    gateway::PaymentGateway,
};

/// Everything needed to open a provider intent for one purchase.
struct Checkout {
    transaction_type: TransactionType,
    related_id: Uuid,
    amount: Decimal,
    currency: String,
    metadata: TransactionMetadata,
}

pub struct PaymentIntentUseCase {
    catalog_repo: Arc<dyn CatalogRepository + Send + Sync>,
    transaction_repo: Arc<dyn TransactionRepository + Send + Sync>,
    subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
    grantor: Arc<EntitlementGrantor>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentIntentUseCase {
    pub fn new(
        catalog_repo: Arc<dyn CatalogRepository + Send + Sync>,
        transaction_repo: Arc<dyn TransactionRepository + Send + Sync>,
        subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
        grantor: Arc<EntitlementGrantor>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            catalog_repo,
            transaction_repo,
            subscription_repo,
            grantor,
            gateway,
        }
    }

    pub async fn create_intent(
        &self,
        user_id: Uuid,
        request: CreateIntentRequest,
    ) -> UseCaseResult<CreateIntentResponse> {
        info!(%user_id, kind = ?request.kind, "payments: creating intent");

        let checkout = match request.kind {
            PurchaseKind::Course => {
                let course_id = request
                    .course_id
                    .ok_or_else(|| PaymentError::Validation("course_id is required".into()))?;
                self.course_checkout(user_id, course_id).await?
            }
            PurchaseKind::Subscription => {
                let plan_id = request
                    .plan_id
                    .ok_or_else(|| PaymentError::Validation("plan_id is required".into()))?;
                match self.plan_checkout(user_id, plan_id).await? {
                    PlanCheckout::Paid(checkout) => checkout,
                    PlanCheckout::Free(response) => return Ok(response),
                }
            }
        };

        self.open_intent(user_id, checkout).await
    }

    async fn course_checkout(&self, user_id: Uuid, course_id: Uuid) -> UseCaseResult<Checkout> {
        let course = self
            .catalog_repo
            .find_course(course_id)
            .await
            .map_err(|err| {
                error!(%course_id, db_error = ?err, "payments: failed to load course");
                PaymentError::Internal(err)
            })?
            .ok_or(PaymentError::NotFound("course"))?;

        if course.is_free || course.price <= Decimal::ZERO {
            return Err(PaymentError::Validation(
                "course is free and cannot be purchased".into(),
            ));
        }

        let already_purchased = self
            .transaction_repo
            .has_completed_purchase(user_id, course_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %course_id,
                    db_error = ?err,
                    "payments: failed to check existing purchase"
                );
                PaymentError::Internal(err)
            })?;

        if already_purchased {
            info!(%user_id, %course_id, "payments: course already purchased");
            return Err(PaymentError::Conflict("course already purchased".into()));
        }

        Ok(Checkout {
            transaction_type: TransactionType::Course,
            related_id: course.id,
            amount: course.price,
            currency: course.currency,
            metadata: TransactionMetadata::for_course(course.title, course.teacher_id),
        })
    }

    async fn plan_checkout(&self, user_id: Uuid, plan_id: Uuid) -> UseCaseResult<PlanCheckout> {
        let plan = self
            .catalog_repo
            .find_plan(plan_id)
            .await
            .map_err(|err| {
                error!(%plan_id, db_error = ?err, "payments: failed to load plan");
                PaymentError::Internal(err)
            })?
            .ok_or(PaymentError::NotFound("plan"))?;

        if !plan.is_active {
            return Err(PaymentError::Validation("plan is not active".into()));
        }

        let now = Utc::now();
        let existing = self
            .subscription_repo
            .find_by_user_and_plan(user_id, plan_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %plan_id,
                    db_error = ?err,
                    "payments: failed to load existing subscription"
                );
                PaymentError::Internal(err)
            })?;

        if existing.is_some_and(|subscription| subscription.is_active_at(now)) {
            info!(%user_id, %plan_id, "payments: plan already active for user");
            return Err(PaymentError::Conflict("subscription already active".into()));
        }

        if plan.price.is_zero() {
            let subscription = self
                .grantor
                .activate_subscription(user_id, plan_id, plan.billing_cycle, None, now)
                .await?;

            info!(
                %user_id,
                %plan_id,
                subscription_id = %subscription.id,
                "payments: free plan activated without provider"
            );

            return Ok(PlanCheckout::Free(CreateIntentResponse::FreePlan {
                free_plan: true,
                subscription_id: subscription.id,
            }));
        }

        Ok(PlanCheckout::Paid(Checkout {
            transaction_type: TransactionType::Subscription,
            related_id: plan.id,
            amount: plan.price,
            currency: plan.currency,
            metadata: TransactionMetadata::for_plan(plan.name, plan.billing_cycle),
        }))
    }

    async fn open_intent(
        &self,
        user_id: Uuid,
        checkout: Checkout,
    ) -> UseCaseResult<CreateIntentResponse> {
        let currency = checkout.currency.to_lowercase();
        let amount_minor = to_minor_units(checkout.amount, &currency)
            .map_err(|err| PaymentError::Validation(err.to_string()))?;

        // The id doubles as the provider idempotency key. It only dedupes resends
        // of this one provider call; each new client request gets a fresh id.
        let transaction_id = Uuid::new_v4();

        let metadata = HashMap::from([
            ("type".to_string(), checkout.transaction_type.to_string()),
            ("user_id".to_string(), user_id.to_string()),
            ("related_id".to_string(), checkout.related_id.to_string()),
            ("transaction_id".to_string(), transaction_id.to_string()),
        ]);

        let intent = self
            .gateway
            .create_payment_intent(amount_minor, &currency, metadata, &transaction_id.to_string())
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %transaction_id,
                    amount_minor,
                    %currency,
                    error = ?err,
                    "payments: provider rejected payment intent"
                );
                PaymentError::Provider(err)
            })?;

        let insert = InsertTransactionEntity {
            id: transaction_id,
            provider_intent_id: Some(intent.intent_id.clone()),
            amount: checkout.amount,
            currency,
            status: TransactionStatus::Pending.to_string(),
            type_: checkout.transaction_type.to_string(),
            related_id: checkout.related_id,
            owner_user_id: user_id,
            metadata: checkout.metadata.to_json(),
        };

        let transaction = self.transaction_repo.insert(insert).await.map_err(|err| {
            // The provider holds an intent we have no row for. Its webhook will be
            // acknowledged as unknown; reconcile from this log line.
            warn!(
                orphaned_intent_id = %intent.intent_id,
                %transaction_id,
                %user_id,
                "payments: orphaned provider intent"
            );
            error!(
                %transaction_id,
                db_error = ?err,
                "payments: failed to persist pending transaction"
            );
            PaymentError::Internal(err)
        })?;

        info!(
            transaction_id = %transaction.id,
            intent_id = %intent.intent_id,
            %user_id,
            amount = %transaction.amount,
            currency = %transaction.currency,
            "payments: pending transaction created"
        );

        Ok(CreateIntentResponse::Checkout {
            client_secret: intent.client_secret,
            transaction_id: transaction.id,
        })
    }
}

enum PlanCheckout {
    Paid(Checkout),
    Free(CreateIntentResponse),
}
