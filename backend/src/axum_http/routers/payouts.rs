use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use settlement::domain::value_objects::payouts::PayoutRequest;
use tracing::info;

use crate::{auth::AuthUser, usecases::payouts::PayoutUseCase};

pub fn routes(usecase: Arc<PayoutUseCase>) -> Router {
    Router::new()
        .route("/", post(request_payout))
        .route("/balance", get(balance))
        .with_state(usecase)
}

pub async fn request_payout(
    State(usecase): State<Arc<PayoutUseCase>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(request): Json<PayoutRequest>,
) -> Response {
    info!(teacher_id = %user_id, amount = %request.amount, "payouts: request received");

    match usecase.request_payout(user_id, request).await {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn balance(
    State(usecase): State<Arc<PayoutUseCase>>,
    AuthUser { user_id, .. }: AuthUser,
) -> Response {
    match usecase.available_balance(user_id).await {
        Ok(balance) => (StatusCode::OK, Json(balance)).into_response(),
        Err(err) => err.into_response(),
    }
}
