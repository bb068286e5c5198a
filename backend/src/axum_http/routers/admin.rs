use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::error_responses::forbidden,
    usecases::ledger::TransactionLedger,
};

pub fn routes(ledger: Arc<TransactionLedger>) -> Router {
    Router::new()
        .route("/transactions/:transaction_id/replay", post(replay_transaction))
        .with_state(ledger)
}

/// Re-applies grant and earnings for a completed transaction.
pub async fn replay_transaction(
    State(ledger): State<Arc<TransactionLedger>>,
    auth: AuthUser,
    Path(transaction_id): Path<Uuid>,
) -> Response {
    if !auth.is_service_role() {
        warn!(
            user_id = %auth.user_id,
            %transaction_id,
            "admin: replay rejected for non service role"
        );
        return forbidden("service role required");
    }

    info!(%transaction_id, "admin: replay requested");

    match ledger.replay_completion(transaction_id).await {
        Ok(transaction) => (
            StatusCode::OK,
            Json(json!({
                "transaction_id": transaction.id,
                "status": transaction.status,
                "replayed": true,
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
