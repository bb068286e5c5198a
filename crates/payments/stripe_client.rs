use std::{collections::HashMap, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::domain::value_objects::webhook_events::WebhookEvent;

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    webhook_tolerance: Duration,
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("signature rejected: {0}")]
    Signature(String),
    #[error("malformed payload: {0}")]
    Payload(String),
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub livemode: Option<bool>,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub last_payment_error: Option<StripePaymentError>,
}

#[derive(Debug, Deserialize)]
pub struct StripePaymentError {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeCharge {
    payment_intent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeInvoice {
    metadata: Option<HashMap<String, String>>,
    subscription_details: Option<StripeSubscriptionDetails>,
}

#[derive(Debug, Deserialize)]
struct StripeSubscriptionDetails {
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
    decline_code: Option<String>,
}

impl StripeEvent {
    /// Reduces a verified Stripe event to the settlement event it represents.
    pub fn to_webhook_event(&self) -> Result<WebhookEvent, WebhookError> {
        match self.type_.as_str() {
            "payment_intent.succeeded" => {
                let intent = self.payment_intent()?;
                Ok(WebhookEvent::IntentSucceeded {
                    intent_id: intent.id,
                })
            }
            "payment_intent.payment_failed" => {
                let intent = self.payment_intent()?;
                Ok(WebhookEvent::IntentFailed {
                    intent_id: intent.id,
                    failure_message: intent
                        .last_payment_error
                        .and_then(|err| err.message.or(err.code)),
                })
            }
            "invoice.paid" | "invoice.payment_succeeded" => {
                let invoice: StripeInvoice = self.object("invoice")?;
                let metadata = invoice
                    .subscription_details
                    .and_then(|details| details.metadata)
                    .filter(|metadata| !metadata.is_empty())
                    .or(invoice.metadata)
                    .unwrap_or_default();

                let user_id = metadata_uuid(&metadata, "user_id")?;
                let plan_id = metadata_uuid(&metadata, "related_id")
                    .or_else(|_| metadata_uuid(&metadata, "plan_id"))?;

                Ok(WebhookEvent::InvoicePaid { user_id, plan_id })
            }
            "charge.refunded" => {
                let charge: StripeCharge = self.object("charge")?;
                let intent_id = charge.payment_intent.ok_or_else(|| {
                    WebhookError::Payload("charge without payment_intent".to_string())
                })?;
                Ok(WebhookEvent::ChargeRefunded { intent_id })
            }
            other => Ok(WebhookEvent::Unhandled {
                event_type: other.to_string(),
            }),
        }
    }

    fn payment_intent(&self) -> Result<StripePaymentIntent, WebhookError> {
        self.object("payment_intent")
    }

    fn object<T: serde::de::DeserializeOwned>(&self, label: &str) -> Result<T, WebhookError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|err| WebhookError::Payload(format!("invalid {label} object: {err}")))
    }
}

fn metadata_uuid(metadata: &HashMap<String, String>, key: &str) -> Result<Uuid, WebhookError> {
    metadata
        .get(key)
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or_else(|| WebhookError::Payload(format!("metadata.{key} missing or invalid")))
}

/// Checks a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=<hex>...]`)
/// against `HMAC-SHA256(secret, "<t>.<payload>")`.
/// https://stripe.com/docs/webhooks/signatures
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    signature_header: &str,
    tolerance: Duration,
    now: DateTime<Utc>,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in signature_header.split(',') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("t=") {
            timestamp = rest.parse().ok();
        } else if let Some(rest) = part.strip_prefix("v1=") {
            if let Ok(bytes) = hex::decode(rest) {
                signatures.push(bytes);
            }
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| WebhookError::Signature("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(WebhookError::Signature("missing v1 signature".to_string()));
    }

    let age = now.timestamp() - timestamp;
    if age.unsigned_abs() > tolerance.as_secs() {
        return Err(WebhookError::Signature(format!(
            "timestamp outside tolerance ({age}s)"
        )));
    }

    for signature in &signatures {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|err| WebhookError::Signature(err.to_string()))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(signature).is_ok() {
            return Ok(());
        }
    }

    Err(WebhookError::Signature("no matching v1 signature".to_string()))
}

impl StripeClient {
    pub fn new(
        secret_key: String,
        webhook_secret: String,
        webhook_tolerance: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            http,
            secret_key,
            webhook_secret,
            webhook_tolerance,
        })
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .or_else(|| resp.headers().get("stripe-request-id"))
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (stripe_error_type, stripe_error_code, stripe_error_param, stripe_error_message, stripe_decline_code) =
            match serde_json::from_str::<StripeErrorEnvelope>(&body) {
                Ok(envelope) => {
                    let details = envelope.error;
                    (
                        details.type_,
                        details.code,
                        details.param,
                        details.message,
                        details.decline_code,
                    )
                }
                Err(_) => (None, None, None, None, None),
            };

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?stripe_error_type,
            stripe_error_code = ?stripe_error_code,
            stripe_error_param = ?stripe_error_param,
            stripe_error_message = ?stripe_error_message,
            stripe_decline_code = ?stripe_decline_code,
            context = %context,
            "stripe api request failed"
        );

        anyhow::bail!(
            "Stripe API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    /// Opens a PaymentIntent. The idempotency key makes a retried call return
    /// the same intent instead of creating a second one.
    pub async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: HashMap<String, String>,
        idempotency_key: &str,
    ) -> Result<StripePaymentIntent> {
        // https://stripe.com/docs/api/payment_intents/create
        let mut body: Vec<(String, String)> = vec![
            ("amount".to_string(), amount_minor.to_string()),
            ("currency".to_string(), currency.to_ascii_lowercase()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];

        for (key, value) in metadata {
            body.push((format!("metadata[{}]", key), value));
        }

        let resp = self
            .http
            .post(format!("{STRIPE_API_BASE}/payment_intents"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("Idempotency-Key", idempotency_key)
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create payment intent").await?;

        let intent: StripePaymentIntent = resp.json().await?;
        Ok(intent)
    }

    /// Sends funds to a connected account and returns the transfer id.
    pub async fn create_transfer(
        &self,
        destination_account: &str,
        amount_minor: i64,
        currency: &str,
        payout_id: Uuid,
    ) -> Result<String> {
        // https://stripe.com/docs/api/transfers/create
        let body = [
            ("amount", amount_minor.to_string()),
            ("currency", currency.to_ascii_lowercase()),
            ("destination", destination_account.to_string()),
            ("transfer_group", format!("payout_{payout_id}")),
            ("metadata[payout_id]", payout_id.to_string()),
        ];

        let resp = self
            .http
            .post(format!("{STRIPE_API_BASE}/transfers"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("Idempotency-Key", format!("payout-{payout_id}"))
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create transfer").await?;

        #[derive(Deserialize)]
        struct TransferResp {
            id: String,
        }

        let parsed: TransferResp = resp.json().await?;
        Ok(parsed.id)
    }

    /// Reverses a transfer in full.
    pub async fn reverse_transfer(&self, transfer_id: &str) -> Result<()> {
        // https://stripe.com/docs/api/transfer_reversals/create
        let resp = self
            .http
            .post(format!("{STRIPE_API_BASE}/transfers/{transfer_id}/reversals"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .send()
            .await?;
        Self::ensure_success(resp, "reverse transfer").await?;

        Ok(())
    }

    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, WebhookError> {
        verify_signature(
            &self.webhook_secret,
            payload,
            signature_header,
            self.webhook_tolerance,
            Utc::now(),
        )?;

        serde_json::from_slice(payload).map_err(|err| WebhookError::Payload(err.to_string()))
    }
}
