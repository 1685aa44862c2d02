use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Closed set of failure kinds returned by every handler. Clients can
/// branch on the HTTP status; the body is always `{"success": false, "error": ...}`.
#[derive(Debug, Display)]
pub enum ApiError {
    /// Missing or malformed input
    #[display(fmt = "{}", _0)]
    Validation(String),

    /// Referenced entity does not exist (or belongs to another institution)
    #[display(fmt = "{}", _0)]
    NotFound(String),

    /// Entity exists but is in a state that forbids the operation
    #[display(fmt = "{}", _0)]
    State(String),

    /// Missing or invalid credentials
    #[display(fmt = "{}", _0)]
    Auth(String),

    /// Authenticated but not allowed
    #[display(fmt = "{}", _0)]
    Forbidden(String),

    /// Database or downstream service failure. Details stay in the server log.
    #[display(fmt = "Internal server error")]
    Upstream,
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        ApiError::State(msg.into())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::State(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Upstream => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.to_string()
        }))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database call failed");
        ApiError::Upstream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            ApiError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::state("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Auth("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Upstream.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn upstream_hides_details() {
        assert_eq!(ApiError::Upstream.to_string(), "Internal server error");
    }
}
