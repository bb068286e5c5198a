use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;
use settlement::domain::value_objects::payment_intents::CreateIntentRequest;
use tracing::info;

use crate::{
    auth::AuthUser,
    usecases::{
        errors::PaymentError, payment_intents::PaymentIntentUseCase, webhooks::WebhookUseCase,
    },
};

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub fn routes(
    intent_usecase: Arc<PaymentIntentUseCase>,
    webhook_usecase: Arc<WebhookUseCase>,
) -> Router {
    Router::new()
        .route("/intents", post(create_intent))
        .with_state(intent_usecase)
        .merge(
            Router::new()
                .route("/webhook", post(webhook))
                .with_state(webhook_usecase),
        )
}

pub async fn create_intent(
    State(usecase): State<Arc<PaymentIntentUseCase>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(request): Json<CreateIntentRequest>,
) -> Response {
    info!(%user_id, "payments: create intent request received");

    match usecase.create_intent(user_id, request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Takes the raw body; the signature covers the exact bytes the provider sent.
pub async fn webhook(
    State(usecase): State<Arc<WebhookUseCase>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        return PaymentError::Signature("missing Stripe-Signature header".into()).into_response();
    };

    match usecase.ingest(&body, signature).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "received": true }))).into_response(),
        Err(err) => err.into_response(),
    }
}
