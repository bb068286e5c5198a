use std::collections::HashMap;

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use settlement::{
    domain::value_objects::{
        payment_intents::ProviderIntent, payouts::TransferRequest, webhook_events::WebhookEvent,
    },
    payments::stripe_client::{StripeClient, WebhookError},
};
use tracing::debug;

/// Payment-provider capability used by the pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: HashMap<String, String>,
        idempotency_key: &str,
    ) -> AnyResult<ProviderIntent>;

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, WebhookError>;
}

/// Moves payout money. `reverse` undoes a transfer that could not be recorded.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    async fn transfer(&self, request: TransferRequest) -> AnyResult<String>;

    async fn reverse(&self, transfer_reference: &str) -> AnyResult<()>;
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: HashMap<String, String>,
        idempotency_key: &str,
    ) -> AnyResult<ProviderIntent> {
        let intent = self
            .create_payment_intent(amount_minor, currency, metadata, idempotency_key)
            .await?;

        let client_secret = intent
            .client_secret
            .context("Stripe payment intent is missing client_secret")?;

        Ok(ProviderIntent {
            intent_id: intent.id,
            client_secret,
        })
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, WebhookError> {
        let event = self.verify_webhook_signature(payload, signature)?;
        debug!(
            event_id = ?event.id,
            event_type = %event.type_,
            livemode = ?event.livemode,
            "payments: stripe event verified"
        );
        event.to_webhook_event()
    }
}

#[async_trait]
impl TransferExecutor for StripeClient {
    async fn transfer(&self, request: TransferRequest) -> AnyResult<String> {
        self.create_transfer(
            &request.destination_account,
            request.amount_minor,
            &request.currency,
            request.payout_id,
        )
        .await
    }

    async fn reverse(&self, transfer_reference: &str) -> AnyResult<()> {
        self.reverse_transfer(transfer_reference).await
    }
}
