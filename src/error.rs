use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Engine-level errors. Per-strategy failures are recovered inside the
/// pipeline and never appear here; only orchestrator-scope failures and
/// explicit timeouts surface to callers.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("recommendation request timed out")]
    Timeout,

    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("internal engine error: {0}")]
    Internal(String),
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            EngineError::InvalidAction(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            EngineError::Timeout => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            EngineError::Cache(_) | EngineError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
