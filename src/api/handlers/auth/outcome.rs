//! Error taxonomy shared by all auth handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failure modes an auth flow can surface to the client.
///
/// Wrong code, unknown challenge, expired challenge, and inactive user all
/// collapse into `Unauthorized` so callers cannot distinguish them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request")]
    BadRequest,
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("too many requests")]
    TooManyRequests,
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("internal error")]
    Internal,
}

impl AuthFailure {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log a storage error and collapse it into an opaque 500.
    #[must_use]
    pub fn from_storage(err: &anyhow::Error) -> Self {
        error!("storage error: {err:#}");
        Self::Internal
    }
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::AuthFailure;
    use axum::http::StatusCode;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(AuthFailure::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthFailure::BadRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthFailure::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AuthFailure::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(
            AuthFailure::TooManyRequests.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AuthFailure::ServiceUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AuthFailure::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn from_storage_is_opaque() {
        let err = anyhow::anyhow!("connection refused");
        assert_eq!(AuthFailure::from_storage(&err), AuthFailure::Internal);
    }
}
