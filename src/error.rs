use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Every failure a handler can surface. Score errors use the
/// `{success, error, message}` shape the game client reads; auth errors
/// keep the `{detail, code}` shape of the token endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Score is required")]
    MissingScore,

    #[error("Score must be a valid number")]
    InvalidScore,

    #[error("Time played must be a non-negative number of seconds")]
    InvalidTimePlayed,

    #[error("JSON parse error - {0}")]
    MalformedBody(String),

    #[error("{}: This field is required.", .0.join(", "))]
    FieldRequired(Vec<&'static str>),

    #[error("No active account found with the given credentials")]
    InvalidCredentials,

    #[error("Authentication credentials were not provided.")]
    Unauthenticated,

    #[error("Token is invalid or expired")]
    TokenInvalid,

    #[error("{1}")]
    Passthrough(StatusCode, Value),

    #[error("persistence failure: {0:#}")]
    Persistence(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingScore
            | ApiError::InvalidScore
            | ApiError::InvalidTimePlayed
            | ApiError::MalformedBody(_)
            | ApiError::FieldRequired(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthenticated | ApiError::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Passthrough(status, _) => *status,
            ApiError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the score endpoints.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingScore => "missing_score",
            ApiError::InvalidScore => "invalid_score",
            ApiError::InvalidTimePlayed => "invalid_time_played",
            ApiError::MalformedBody(_) | ApiError::FieldRequired(_) => "invalid",
            ApiError::InvalidCredentials => "no_active_account",
            ApiError::Unauthenticated => "not_authenticated",
            ApiError::TokenInvalid => "token_not_valid",
            ApiError::Passthrough(..) => "provider_error",
            ApiError::Persistence(_) => "server_error",
        }
    }

    pub fn passthrough(status: StatusCode, detail: impl Into<String>) -> Self {
        ApiError::Passthrough(status, json!({ "detail": detail.into() }))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::MissingScore | ApiError::InvalidScore | ApiError::InvalidTimePlayed => json!({
                "success": false,
                "error": self.code(),
                "message": self.to_string(),
            }),
            ApiError::MalformedBody(_) => json!({ "detail": self.to_string() }),
            ApiError::FieldRequired(fields) => {
                let mut errors = serde_json::Map::new();
                for field in fields {
                    errors.insert(field.to_string(), json!(["This field is required."]));
                }
                Value::Object(errors)
            }
            ApiError::InvalidCredentials | ApiError::Unauthenticated | ApiError::TokenInvalid => json!({
                "detail": self.to_string(),
                "code": self.code(),
            }),
            ApiError::Passthrough(_, body) => body.clone(),
            ApiError::Persistence(e) => {
                tracing::error!(error = %format!("{e:#}"), "request failed");
                json!({
                    "success": false,
                    "error": self.code(),
                    "message": "Server error processing request",
                })
            }
        };
        (status, Json(body)).into_response()
    }
}
