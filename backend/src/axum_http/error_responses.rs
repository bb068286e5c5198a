use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::usecases::errors::PaymentError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            PaymentError::Internal(err) => {
                error!(error = ?err, "backend: internal error");
                // Don't leak internal error detail to client
                "Internal server error".to_string()
            }
            PaymentError::Provider(err) => {
                error!(error = ?err, "backend: payment provider error");
                "Payment provider unavailable, please retry".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
        });

        (status, body).into_response()
    }
}

pub fn forbidden(message: &str) -> Response {
    let status = StatusCode::FORBIDDEN;
    (
        status,
        Json(ErrorResponse {
            code: status.as_u16(),
            message: message.to_string(),
        }),
    )
        .into_response()
}
