//! In-memory stand-ins for the Postgres repositories and the payment provider.
//! Every mutation happens under one lock, so conditional writes behave like
//! the single-statement updates they replace.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use settlement::{
    domain::{
        entities::{
            courses::CourseEntity,
            earnings::{EarningEntity, InsertEarningEntity},
            enrollments::InsertEnrollmentEntity,
            payouts::{InsertPayoutEntity, PayoutAccountEntity, PayoutEntity},
            plans::PlanEntity,
            subscriptions::{SubscriptionEntity, UpsertSubscriptionEntity},
            transactions::{InsertTransactionEntity, TransactionEntity},
        },
        repositories::{
            catalog::CatalogRepository, earnings::EarningsRepository,
            enrollments::EnrollmentRepository, payouts::PayoutRepository,
            platform_settings::PlatformSettingsRepository, subscriptions::SubscriptionRepository,
            transactions::TransactionRepository,
        },
        value_objects::{
            enums::{
                billing_cycles::{BillingCycle, SubscriptionPeriod},
                earning_statuses::EarningStatus,
                payout_statuses::PayoutStatus,
                subscription_statuses::SubscriptionStatus,
                transaction_statuses::TransactionStatus,
                transaction_types::TransactionType,
            },
            payment_intents::ProviderIntent,
            transactions::TransactionMetadata,
            webhook_events::WebhookEvent,
        },
    },
    notifications::Notifier,
    payments::stripe_client::{StripeClient, StripeEvent, WebhookError, verify_signature},
};
use sha2::Sha256;
use uuid::Uuid;

use super::{
    earnings::EarningsCalculator, entitlements::EntitlementGrantor, gateway::PaymentGateway,
    ledger::TransactionLedger,
};

pub const WEBHOOK_SECRET: &str = "whsec_test_settlement";

#[derive(Default)]
struct State {
    courses: HashMap<Uuid, CourseEntity>,
    plans: HashMap<Uuid, PlanEntity>,
    transactions: HashMap<Uuid, TransactionEntity>,
    subscriptions: Vec<SubscriptionEntity>,
    enrollments: Vec<(Uuid, Uuid)>,
    earnings: Vec<EarningEntity>,
    payouts: HashMap<Uuid, PayoutEntity>,
    accounts: HashMap<Uuid, PayoutAccountEntity>,
    commission_rate: Option<Decimal>,
    fail_enrollments: bool,
    fail_transaction_inserts: bool,
    fail_payout_completion: bool,
    fail_payout_hold: bool,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_course(
        &self,
        price: Decimal,
        currency: &str,
        teacher_id: Option<Uuid>,
        is_free: bool,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().courses.insert(
            id,
            CourseEntity {
                id,
                title: "Practical Rust".to_string(),
                teacher_id,
                price,
                currency: currency.to_string(),
                is_free,
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn add_plan(&self, id: Uuid, price: Decimal, billing_cycle: BillingCycle, is_active: bool) {
        self.lock().plans.insert(
            id,
            PlanEntity {
                id,
                name: "Pro".to_string(),
                price,
                currency: "usd".to_string(),
                billing_cycle,
                is_active,
            },
        );
    }

    pub fn add_subscription(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        status: &str,
        start_date: DateTime<Utc>,
        billing_cycle: BillingCycle,
    ) {
        let period = billing_cycle.period_from(start_date);
        let now = Utc::now();
        self.lock().subscriptions.push(SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            plan_id,
            status: status.to_string(),
            start_date: period.start_date,
            end_date: period.end_date,
            renewal_date: period.renewal_date,
            transaction_id: None,
            created_at: now,
            updated_at: now,
        });
    }

    pub fn insert_transaction(&self, insert: InsertTransactionEntity) -> TransactionEntity {
        let entity = to_transaction(insert);
        self.lock().transactions.insert(entity.id, entity.clone());
        entity
    }

    pub fn force_status(&self, transaction_id: Uuid, status: TransactionStatus) {
        if let Some(row) = self.lock().transactions.get_mut(&transaction_id) {
            row.status = status.to_string();
        }
    }

    pub fn add_earning(
        &self,
        teacher_id: Uuid,
        net_amount: Decimal,
        currency: &str,
        status: &str,
        age_days: i64,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let created_at = Utc::now() - chrono::Duration::days(age_days);
        self.lock().earnings.push(EarningEntity {
            id,
            teacher_id,
            course_id: Uuid::new_v4(),
            transaction_id: Uuid::new_v4(),
            gross_amount: net_amount,
            commission_rate: Decimal::ZERO,
            platform_fee: Decimal::ZERO,
            net_amount,
            currency: currency.to_string(),
            status: status.to_string(),
            payout_id: None,
            created_at,
            updated_at: created_at,
        });
        id
    }

    pub fn add_payout_account(&self, teacher_id: Uuid, compliance_hold: bool) {
        self.lock().accounts.insert(
            teacher_id,
            PayoutAccountEntity {
                teacher_id,
                provider_account_id: format!("acct_{}", teacher_id.simple()),
                compliance_hold,
                updated_at: Utc::now(),
            },
        );
    }

    pub fn set_commission_rate(&self, rate: Option<Decimal>) {
        self.lock().commission_rate = rate;
    }

    pub fn fail_enrollments(&self, fail: bool) {
        self.lock().fail_enrollments = fail;
    }

    pub fn fail_transaction_inserts(&self, fail: bool) {
        self.lock().fail_transaction_inserts = fail;
    }

    pub fn fail_payout_completion(&self, fail: bool) {
        self.lock().fail_payout_completion = fail;
    }

    pub fn fail_payout_hold(&self, fail: bool) {
        self.lock().fail_payout_hold = fail;
    }

    pub fn transaction(&self, transaction_id: Uuid) -> Option<TransactionEntity> {
        self.lock().transactions.get(&transaction_id).cloned()
    }

    pub fn status_of(&self, transaction_id: Uuid) -> Option<String> {
        self.transaction(transaction_id).map(|row| row.status)
    }

    pub fn transaction_count(&self) -> usize {
        self.lock().transactions.len()
    }

    pub fn subscription(&self, user_id: Uuid, plan_id: Uuid) -> Option<SubscriptionEntity> {
        self.lock()
            .subscriptions
            .iter()
            .find(|row| row.user_id == user_id && row.plan_id == plan_id)
            .cloned()
    }

    pub fn subscription_count(&self) -> usize {
        self.lock().subscriptions.len()
    }

    pub fn enrollment_count(&self) -> usize {
        self.lock().enrollments.len()
    }

    pub fn earning(&self, earning_id: Uuid) -> Option<EarningEntity> {
        self.lock()
            .earnings
            .iter()
            .find(|row| row.id == earning_id)
            .cloned()
    }

    pub fn earning_for(&self, transaction_id: Uuid) -> Option<EarningEntity> {
        self.lock()
            .earnings
            .iter()
            .find(|row| row.transaction_id == transaction_id)
            .cloned()
    }

    pub fn earnings_of(&self, teacher_id: Uuid) -> Vec<EarningEntity> {
        self.lock()
            .earnings
            .iter()
            .filter(|row| row.teacher_id == teacher_id)
            .cloned()
            .collect()
    }

    pub fn earnings_count(&self) -> usize {
        self.lock().earnings.len()
    }

    pub fn payout(&self, payout_id: Uuid) -> Option<PayoutEntity> {
        self.lock().payouts.get(&payout_id).cloned()
    }

    pub fn payouts_of(&self, teacher_id: Uuid) -> Vec<PayoutEntity> {
        self.lock()
            .payouts
            .values()
            .filter(|row| row.teacher_id == teacher_id)
            .cloned()
            .collect()
    }

    pub fn payout_count(&self) -> usize {
        self.lock().payouts.len()
    }

    fn update_payout(&self, payout_id: Uuid, apply: impl FnOnce(&mut PayoutEntity)) -> Result<()> {
        let mut state = self.lock();
        let payout = state
            .payouts
            .get_mut(&payout_id)
            .ok_or_else(|| anyhow!("payout {payout_id} not found"))?;
        apply(payout);
        payout.updated_at = Utc::now();
        Ok(())
    }
}

fn to_transaction(insert: InsertTransactionEntity) -> TransactionEntity {
    let now = Utc::now();
    TransactionEntity {
        id: insert.id,
        provider_intent_id: insert.provider_intent_id,
        amount: insert.amount,
        currency: insert.currency,
        status: insert.status,
        type_: insert.type_,
        related_id: insert.related_id,
        owner_user_id: insert.owner_user_id,
        metadata: insert.metadata,
        processed_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn find_course(&self, course_id: Uuid) -> Result<Option<CourseEntity>> {
        Ok(self.lock().courses.get(&course_id).cloned())
    }

    async fn find_plan(&self, plan_id: Uuid) -> Result<Option<PlanEntity>> {
        Ok(self.lock().plans.get(&plan_id).cloned())
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn insert(&self, transaction: InsertTransactionEntity) -> Result<TransactionEntity> {
        if self.lock().fail_transaction_inserts {
            bail!("connection reset by peer");
        }
        Ok(self.insert_transaction(transaction))
    }

    async fn find_by_id(&self, transaction_id: Uuid) -> Result<Option<TransactionEntity>> {
        Ok(self.transaction(transaction_id))
    }

    async fn find_by_provider_intent_id(
        &self,
        provider_intent_id: &str,
    ) -> Result<Option<TransactionEntity>> {
        Ok(self
            .lock()
            .transactions
            .values()
            .find(|row| row.provider_intent_id.as_deref() == Some(provider_intent_id))
            .cloned())
    }

    async fn has_completed_purchase(&self, user_id: Uuid, course_id: Uuid) -> Result<bool> {
        Ok(self.lock().transactions.values().any(|row| {
            row.owner_user_id == user_id
                && row.related_id == course_id
                && row.type_ == TransactionType::Course.as_str()
                && row.status == TransactionStatus::Completed.as_str()
        }))
    }

    async fn compare_and_set_status(
        &self,
        provider_intent_id: &str,
        expected: TransactionStatus,
        next: TransactionStatus,
        processed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<TransactionEntity>> {
        let mut state = self.lock();
        let Some(row) = state.transactions.values_mut().find(|row| {
            row.provider_intent_id.as_deref() == Some(provider_intent_id)
                && row.status == expected.as_str()
        }) else {
            return Ok(None);
        };

        row.status = next.to_string();
        if processed_at.is_some() {
            row.processed_at = processed_at;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryStore {
    async fn find_by_user_and_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Option<SubscriptionEntity>> {
        Ok(self.subscription(user_id, plan_id))
    }

    async fn upsert(&self, subscription: UpsertSubscriptionEntity) -> Result<SubscriptionEntity> {
        let mut state = self.lock();
        let now = Utc::now();
        if let Some(row) = state
            .subscriptions
            .iter_mut()
            .find(|row| row.user_id == subscription.user_id && row.plan_id == subscription.plan_id)
        {
            row.status = subscription.status;
            row.start_date = subscription.start_date;
            row.end_date = subscription.end_date;
            row.renewal_date = subscription.renewal_date;
            row.transaction_id = subscription.transaction_id;
            row.updated_at = now;
            return Ok(row.clone());
        }

        let row = SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id: subscription.user_id,
            plan_id: subscription.plan_id,
            status: subscription.status,
            start_date: subscription.start_date,
            end_date: subscription.end_date,
            renewal_date: subscription.renewal_date,
            transaction_id: subscription.transaction_id,
            created_at: now,
            updated_at: now,
        };
        state.subscriptions.push(row.clone());
        Ok(row)
    }

    async fn renew(
        &self,
        subscription_id: Uuid,
        period: SubscriptionPeriod,
    ) -> Result<SubscriptionEntity> {
        let mut state = self.lock();
        let row = state
            .subscriptions
            .iter_mut()
            .find(|row| row.id == subscription_id)
            .ok_or_else(|| anyhow!("subscription {subscription_id} not found"))?;

        row.status = SubscriptionStatus::Active.to_string();
        row.start_date = period.start_date;
        row.end_date = period.end_date;
        row.renewal_date = period.renewal_date;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryStore {
    async fn insert_if_absent(&self, enrollment: InsertEnrollmentEntity) -> Result<bool> {
        let mut state = self.lock();
        if state.fail_enrollments {
            bail!("enrollments table unavailable");
        }
        let key = (enrollment.student_id, enrollment.course_id);
        if state.enrollments.contains(&key) {
            return Ok(false);
        }
        state.enrollments.push(key);
        Ok(true)
    }
}

#[async_trait]
impl EarningsRepository for InMemoryStore {
    async fn insert_if_absent(&self, earning: InsertEarningEntity) -> Result<bool> {
        let mut state = self.lock();
        if state
            .earnings
            .iter()
            .any(|row| row.transaction_id == earning.transaction_id)
        {
            return Ok(false);
        }

        let now = Utc::now();
        state.earnings.push(EarningEntity {
            id: Uuid::new_v4(),
            teacher_id: earning.teacher_id,
            course_id: earning.course_id,
            transaction_id: earning.transaction_id,
            gross_amount: earning.gross_amount,
            commission_rate: earning.commission_rate,
            platform_fee: earning.platform_fee,
            net_amount: earning.net_amount,
            currency: earning.currency,
            status: earning.status,
            payout_id: None,
            created_at: now,
            updated_at: now,
        });
        Ok(true)
    }

    async fn list_available_by_teacher(&self, teacher_id: Uuid) -> Result<Vec<EarningEntity>> {
        let mut rows: Vec<EarningEntity> = self
            .earnings_of(teacher_id)
            .into_iter()
            .filter(|row| row.status == EarningStatus::Available.as_str())
            .collect();
        rows.sort_by_key(|row| row.created_at);
        Ok(rows)
    }

    async fn claim_for_payout(
        &self,
        earning_ids: Vec<Uuid>,
        payout_id: Uuid,
        status: EarningStatus,
    ) -> Result<usize> {
        let mut state = self.lock();
        let mut claimed = 0;
        for row in state.earnings.iter_mut().filter(|row| {
            earning_ids.contains(&row.id)
                && row.status == EarningStatus::Available.as_str()
                && row.payout_id.is_none()
        }) {
            row.status = status.to_string();
            row.payout_id = Some(payout_id);
            claimed += 1;
        }
        Ok(claimed)
    }

    async fn release_payout(&self, payout_id: Uuid) -> Result<usize> {
        let mut state = self.lock();
        let mut released = 0;
        for row in state
            .earnings
            .iter_mut()
            .filter(|row| row.payout_id == Some(payout_id))
        {
            row.status = EarningStatus::Available.to_string();
            row.payout_id = None;
            released += 1;
        }
        Ok(released)
    }

    async fn hold_by_transaction_id(&self, transaction_id: Uuid) -> Result<bool> {
        let mut state = self.lock();
        let Some(row) = state.earnings.iter_mut().find(|row| {
            row.transaction_id == transaction_id && row.status == EarningStatus::Available.as_str()
        }) else {
            return Ok(false);
        };
        row.status = EarningStatus::Hold.to_string();
        Ok(true)
    }
}

#[async_trait]
impl PlatformSettingsRepository for InMemoryStore {
    async fn current_commission_rate(&self) -> Result<Option<Decimal>> {
        Ok(self.lock().commission_rate)
    }
}

#[async_trait]
impl PayoutRepository for InMemoryStore {
    async fn find_account(&self, teacher_id: Uuid) -> Result<Option<PayoutAccountEntity>> {
        Ok(self.lock().accounts.get(&teacher_id).cloned())
    }

    async fn create(&self, payout: InsertPayoutEntity) -> Result<PayoutEntity> {
        let now = Utc::now();
        let row = PayoutEntity {
            id: payout.id,
            teacher_id: payout.teacher_id,
            amount: payout.amount,
            currency: payout.currency,
            status: payout.status,
            transfer_reference: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.lock().payouts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn mark_completed(&self, payout_id: Uuid, transfer_reference: String) -> Result<()> {
        if self.lock().fail_payout_completion {
            bail!("payouts table unavailable");
        }
        self.update_payout(payout_id, |payout| {
            payout.status = PayoutStatus::Completed.to_string();
            payout.transfer_reference = Some(transfer_reference);
        })
    }

    async fn mark_on_hold(&self, payout_id: Uuid) -> Result<()> {
        if self.lock().fail_payout_hold {
            bail!("payouts table unavailable");
        }
        self.update_payout(payout_id, |payout| {
            payout.status = PayoutStatus::OnHold.to_string();
        })
    }

    async fn mark_failed(&self, payout_id: Uuid, reason: String) -> Result<()> {
        self.update_payout(payout_id, |payout| {
            payout.status = PayoutStatus::Failed.to_string();
            payout.failure_reason = Some(reason);
        })
    }
}

#[derive(Debug, Clone)]
pub struct IntentCall {
    pub amount_minor: i64,
    pub currency: String,
    pub metadata: HashMap<String, String>,
    pub idempotency_key: String,
}

/// Provider fake that records intent requests and checks webhook signatures
/// against [`WEBHOOK_SECRET`].
#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<IntentCall>>,
    fail: bool,
}

impl FakeGateway {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<IntentCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn single_call(&self) -> IntentCall {
        let calls = self.calls();
        assert_eq!(calls.len(), 1, "expected exactly one provider call");
        calls[0].clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: HashMap<String, String>,
        idempotency_key: &str,
    ) -> Result<ProviderIntent> {
        self.calls.lock().unwrap().push(IntentCall {
            amount_minor,
            currency: currency.to_string(),
            metadata,
            idempotency_key: idempotency_key.to_string(),
        });

        if self.fail {
            bail!("operation timed out");
        }

        let intent_id = format!("pi_{}", Uuid::new_v4().simple());
        Ok(ProviderIntent {
            client_secret: format!("{intent_id}_secret_test"),
            intent_id,
        })
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, WebhookError> {
        verify_signature(
            WEBHOOK_SECRET,
            payload,
            signature,
            Duration::from_secs(300),
            Utc::now(),
        )?;
        let event: StripeEvent = serde_json::from_slice(payload)
            .map_err(|err| WebhookError::Payload(err.to_string()))?;
        event.to_webhook_event()
    }
}

/// The real Stripe client. Webhook verification never touches the network.
pub fn stripe_gateway() -> Arc<dyn PaymentGateway> {
    Arc::new(
        StripeClient::new(
            "sk_test_unused".to_string(),
            WEBHOOK_SECRET.to_string(),
            Duration::from_secs(300),
            Duration::from_secs(5),
        )
        .expect("stripe client"),
    )
}

pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let timestamp = Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

pub fn sample_transaction(
    kind: TransactionType,
    status: TransactionStatus,
    metadata: TransactionMetadata,
) -> TransactionEntity {
    let mut transaction = to_transaction(InsertTransactionEntity {
        id: Uuid::new_v4(),
        provider_intent_id: Some(format!("pi_{}", Uuid::new_v4().simple())),
        amount: Decimal::new(5000, 2),
        currency: "usd".to_string(),
        status: status.to_string(),
        type_: kind.to_string(),
        related_id: Uuid::new_v4(),
        owner_user_id: Uuid::new_v4(),
        metadata: metadata.to_json(),
    });
    if status != TransactionStatus::Pending {
        transaction.processed_at = Some(Utc::now());
    }
    transaction
}

pub fn ledger_with(store: &Arc<InMemoryStore>) -> TransactionLedger {
    let grantor = Arc::new(EntitlementGrantor::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let earnings = Arc::new(EarningsCalculator::new(
        store.clone(),
        store.clone(),
        Decimal::from(30),
    ));

    TransactionLedger::new(
        store.clone(),
        store.clone(),
        store.clone(),
        grantor,
        earnings,
        Notifier::new(Vec::new()),
    )
}
