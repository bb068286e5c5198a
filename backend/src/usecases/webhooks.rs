use std::sync::Arc;

use settlement::{
    domain::value_objects::webhook_events::WebhookEvent, payments::stripe_client::WebhookError,
};
use tracing::{info, warn};

use super::{
    errors::{PaymentError, UseCaseResult},
    gateway::PaymentGateway,
    ledger::{LedgerOutcome, TransactionLedger},
};

pub struct WebhookUseCase {
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<TransactionLedger>,
}

impl WebhookUseCase {
    pub fn new(gateway: Arc<dyn PaymentGateway>, ledger: Arc<TransactionLedger>) -> Self {
        Self { gateway, ledger }
    }

    /// Verifies and applies one provider delivery. `Ok` means the provider may
    /// stop retrying, whatever the ledger decided.
    pub async fn ingest(&self, payload: &[u8], signature: &str) -> UseCaseResult<LedgerOutcome> {
        let event = self
            .gateway
            .verify_webhook(payload, signature)
            .map_err(|err| match err {
                WebhookError::Signature(reason) => {
                    warn!(%reason, "webhooks: signature rejected");
                    PaymentError::Signature(reason)
                }
                WebhookError::Payload(reason) => {
                    warn!(%reason, "webhooks: malformed event payload");
                    PaymentError::Validation(reason)
                }
            })?;

        info!(kind = event.kind(), "webhooks: event verified");

        let outcome = match event {
            WebhookEvent::IntentSucceeded { intent_id } => {
                self.ledger.apply_intent_succeeded(&intent_id).await?
            }
            WebhookEvent::IntentFailed {
                intent_id,
                failure_message,
            } => {
                self.ledger
                    .apply_intent_failed(&intent_id, failure_message.as_deref())
                    .await?
            }
            WebhookEvent::InvoicePaid { user_id, plan_id } => {
                self.ledger.apply_invoice_paid(user_id, plan_id).await?
            }
            WebhookEvent::ChargeRefunded { intent_id } => {
                self.ledger.apply_refund(&intent_id).await?
            }
            WebhookEvent::Unhandled { event_type } => {
                info!(%event_type, "webhooks: unhandled event type; acknowledging");
                LedgerOutcome::Ignored("unhandled event type")
            }
        };

        info!(outcome = ?outcome, "webhooks: event processed");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::{
        InMemoryStore, WEBHOOK_SECRET, ledger_with, sign_payload, stripe_gateway,
    };
    use rust_decimal_macros::dec;
    use settlement::domain::{
        entities::transactions::{InsertTransactionEntity, TransactionEntity},
        value_objects::{
            enums::{
                billing_cycles::BillingCycle, transaction_statuses::TransactionStatus,
                transaction_types::TransactionType,
            },
            transactions::TransactionMetadata,
        },
    };
    use uuid::Uuid;

    fn usecase(store: &Arc<InMemoryStore>) -> WebhookUseCase {
        WebhookUseCase::new(stripe_gateway(), Arc::new(ledger_with(store)))
    }

    fn pending(store: &InMemoryStore, kind: TransactionType, metadata: TransactionMetadata) -> TransactionEntity {
        store.insert_transaction(InsertTransactionEntity {
            id: Uuid::new_v4(),
            provider_intent_id: Some(format!("pi_{}", Uuid::new_v4().simple())),
            amount: dec!(50.00),
            currency: "usd".into(),
            status: TransactionStatus::Pending.to_string(),
            type_: kind.to_string(),
            related_id: Uuid::new_v4(),
            owner_user_id: Uuid::new_v4(),
            metadata: metadata.to_json(),
        })
    }

    fn intent_event(event_type: &str, intent_id: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": format!("evt_{}", Uuid::new_v4().simple()),
            "type": event_type,
            "data": { "object": {
                "id": intent_id,
                "object": "payment_intent",
                "last_payment_error": { "code": "card_declined", "message": "Your card was declined." }
            }}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn succeeded_course_event_delivered_three_times() {
        let store = Arc::new(InMemoryStore::default());
        store.set_commission_rate(Some(dec!(30)));
        let teacher_id = Uuid::new_v4();
        let transaction = pending(
            &store,
            TransactionType::Course,
            TransactionMetadata::for_course("Rust".into(), Some(teacher_id)),
        );
        let payload = intent_event(
            "payment_intent.succeeded",
            transaction.provider_intent_id.as_deref().unwrap(),
        );
        let usecase = usecase(&store);

        for _ in 0..3 {
            usecase
                .ingest(&payload, &sign_payload(&payload, WEBHOOK_SECRET))
                .await
                .unwrap();
        }

        assert_eq!(store.status_of(transaction.id), Some("completed".to_string()));
        assert_eq!(store.enrollment_count(), 1);
        assert_eq!(store.earnings_count(), 1);
        let earning = store.earning_for(transaction.id).unwrap();
        assert_eq!(earning.teacher_id, teacher_id);
        assert_eq!(earning.platform_fee, dec!(15.00));
        assert_eq!(earning.net_amount, dec!(35.00));
        assert_eq!(earning.status, "available");
    }

    #[tokio::test]
    async fn succeeded_subscription_event_activates_plan() {
        let store = Arc::new(InMemoryStore::default());
        let transaction = pending(
            &store,
            TransactionType::Subscription,
            TransactionMetadata::for_plan("Pro".into(), BillingCycle::Monthly),
        );
        let payload = intent_event(
            "payment_intent.succeeded",
            transaction.provider_intent_id.as_deref().unwrap(),
        );

        usecase(&store)
            .ingest(&payload, &sign_payload(&payload, WEBHOOK_SECRET))
            .await
            .unwrap();

        let subscription = store
            .subscription(transaction.owner_user_id, transaction.related_id)
            .unwrap();
        assert_eq!(subscription.status, "active");
        assert_eq!(store.earnings_count(), 0);
    }

    #[tokio::test]
    async fn bad_signature_changes_nothing() {
        let store = Arc::new(InMemoryStore::default());
        let transaction = pending(
            &store,
            TransactionType::Course,
            TransactionMetadata::for_course("Rust".into(), Some(Uuid::new_v4())),
        );
        let payload = intent_event(
            "payment_intent.succeeded",
            transaction.provider_intent_id.as_deref().unwrap(),
        );

        let err = usecase(&store)
            .ingest(&payload, &sign_payload(&payload, "whsec_someone_else"))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Signature(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(store.status_of(transaction.id), Some("pending".to_string()));
        assert_eq!(store.enrollment_count(), 0);
        assert_eq!(store.earnings_count(), 0);
    }

    #[tokio::test]
    async fn tampered_payload_is_rejected() {
        let store = Arc::new(InMemoryStore::default());
        let payload = intent_event("payment_intent.succeeded", "pi_original");
        let signature = sign_payload(&payload, WEBHOOK_SECRET);
        let tampered = intent_event("payment_intent.succeeded", "pi_swapped");

        let err = usecase(&store).ingest(&tampered, &signature).await.unwrap_err();

        assert!(matches!(err, PaymentError::Signature(_)));
    }

    #[tokio::test]
    async fn failed_then_succeeded_keeps_failed() {
        let store = Arc::new(InMemoryStore::default());
        let transaction = pending(
            &store,
            TransactionType::Course,
            TransactionMetadata::for_course("Rust".into(), Some(Uuid::new_v4())),
        );
        let intent_id = transaction.provider_intent_id.clone().unwrap();
        let usecase = usecase(&store);

        let failed = intent_event("payment_intent.payment_failed", &intent_id);
        usecase
            .ingest(&failed, &sign_payload(&failed, WEBHOOK_SECRET))
            .await
            .unwrap();
        let succeeded = intent_event("payment_intent.succeeded", &intent_id);
        usecase
            .ingest(&succeeded, &sign_payload(&succeeded, WEBHOOK_SECRET))
            .await
            .unwrap();

        assert_eq!(store.status_of(transaction.id), Some("failed".to_string()));
        assert_eq!(store.enrollment_count(), 0);
        assert_eq!(store.earnings_count(), 0);
    }

    #[tokio::test]
    async fn unhandled_event_is_acknowledged() {
        let store = Arc::new(InMemoryStore::default());
        let payload = serde_json::to_vec(&serde_json::json!({
            "id": "evt_1",
            "type": "customer.created",
            "data": { "object": { "id": "cus_1" } }
        }))
        .unwrap();

        let outcome = usecase(&store)
            .ingest(&payload, &sign_payload(&payload, WEBHOOK_SECRET))
            .await
            .unwrap();

        assert_eq!(outcome, LedgerOutcome::Ignored("unhandled event type"));
    }

    #[tokio::test]
    async fn malformed_verified_payload_is_validation_error() {
        let store = Arc::new(InMemoryStore::default());
        let payload = serde_json::to_vec(&serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": { "object": { "amount": 100 } }
        }))
        .unwrap();

        let err = usecase(&store)
            .ingest(&payload, &sign_payload(&payload, WEBHOOK_SECRET))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Validation(_)));
    }

    #[tokio::test]
    async fn invoice_paid_event_renews_subscription() {
        let store = Arc::new(InMemoryStore::default());
        let user_id = Uuid::new_v4();
        let plan_id = Uuid::new_v4();
        store.add_plan(plan_id, dec!(99), BillingCycle::Yearly, true);
        store.add_subscription(
            user_id,
            plan_id,
            "active",
            chrono::Utc::now() - chrono::Duration::days(365),
            BillingCycle::Yearly,
        );
        let payload = serde_json::to_vec(&serde_json::json!({
            "id": "evt_invoice",
            "type": "invoice.paid",
            "data": { "object": {
                "id": "in_1",
                "subscription_details": { "metadata": {
                    "user_id": user_id.to_string(),
                    "related_id": plan_id.to_string()
                }}
            }}
        }))
        .unwrap();

        let outcome = usecase(&store)
            .ingest(&payload, &sign_payload(&payload, WEBHOOK_SECRET))
            .await
            .unwrap();

        assert_eq!(outcome, LedgerOutcome::Applied);
        let subscription = store.subscription(user_id, plan_id).unwrap();
        assert!(subscription.is_active_at(chrono::Utc::now()));
    }

    #[tokio::test]
    async fn charge_refunded_event_holds_earnings() {
        let store = Arc::new(InMemoryStore::default());
        store.set_commission_rate(Some(dec!(30)));
        let transaction = pending(
            &store,
            TransactionType::Course,
            TransactionMetadata::for_course("Rust".into(), Some(Uuid::new_v4())),
        );
        let intent_id = transaction.provider_intent_id.clone().unwrap();
        let usecase = usecase(&store);

        let succeeded = intent_event("payment_intent.succeeded", &intent_id);
        usecase
            .ingest(&succeeded, &sign_payload(&succeeded, WEBHOOK_SECRET))
            .await
            .unwrap();
        let refunded = serde_json::to_vec(&serde_json::json!({
            "id": "evt_refund",
            "type": "charge.refunded",
            "data": { "object": { "id": "ch_1", "payment_intent": intent_id } }
        }))
        .unwrap();
        usecase
            .ingest(&refunded, &sign_payload(&refunded, WEBHOOK_SECRET))
            .await
            .unwrap();

        assert_eq!(store.status_of(transaction.id), Some("refunded".to_string()));
        assert_eq!(store.earning_for(transaction.id).unwrap().status, "hold");
    }
}
