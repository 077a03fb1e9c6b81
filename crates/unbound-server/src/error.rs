//! HTTP error responses.
//!
//! Every `GatewayError` maps to one status code and a JSON body
//! `{"error": <kind>, "detail": <message>}`.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use unbound_contracts::error::GatewayError;

#[derive(Debug)]
pub struct ApiError(pub GatewayError);

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            GatewayError::Auth => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden { .. } => StatusCode::FORBIDDEN,
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::InvalidPattern { .. }
            | GatewayError::InvalidInput { .. }
            | GatewayError::SelfDelete => StatusCode::BAD_REQUEST,
            GatewayError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            GatewayError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(GatewayError::InvalidInput { reason: rejection.body_text() })
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(GatewayError::InvalidInput { reason: rejection.body_text() })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }

        let body = Json(json!({
            "error": self.0.kind(),
            "detail": self.0.to_string(),
        }));

        (status, body).into_response()
    }
}
