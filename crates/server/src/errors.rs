use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::auth::AuthError;
use service::lens::LensError;
use service::ServiceError;
use thiserror::Error;
use tracing::{error, warn};

/// Handler error; renders as `{"error": message}` with a mapped status.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl<E: Into<ServiceError>> From<E> for ApiError {
    fn from(e: E) -> Self { ApiError(e.into()) }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Auth(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ServiceError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::Lens(LensError::MissingToken) => StatusCode::UNAUTHORIZED,
            ServiceError::Lens(LensError::AccountNotFound(_)) => StatusCode::NOT_FOUND,
            ServiceError::Lens(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match &self.0 {
            // 会话细节不回传给客户端
            ServiceError::Auth(AuthError::InvalidSession(_)) | ServiceError::Auth(AuthError::TokenError(_)) => {
                "invalid session".to_string()
            }
            other => other.to_string(),
        };
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "request failed");
        } else if status == StatusCode::UNAUTHORIZED {
            warn!(error = %self.0, "unauthenticated request");
        }

        let mut resp = (status, Json(serde_json::json!({ "error": msg }))).into_response();
        if let ServiceError::RateLimited { retry_after_secs } = self.0 {
            resp.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        resp
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("storage init failed: {0}")]
    Storage(#[from] ServiceError),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_service_errors_to_statuses() {
        let cases = [
            (ServiceError::validation("x"), StatusCode::BAD_REQUEST),
            (AuthError::MissingSession.into(), StatusCode::UNAUTHORIZED),
            (ServiceError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ServiceError::not_found("post"), StatusCode::NOT_FOUND),
            (ServiceError::PayloadTooLarge("2 bytes exceeds 1".into()), StatusCode::PAYLOAD_TOO_LARGE),
            (ServiceError::UnsupportedMedia("text/plain".into()), StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (ServiceError::RateLimited { retry_after_secs: 3 }, StatusCode::TOO_MANY_REQUESTS),
            (LensError::Disabled.into(), StatusCode::BAD_GATEWAY),
            (LensError::MissingToken.into(), StatusCode::UNAUTHORIZED),
            (ServiceError::storage("disk full"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[test]
    fn rate_limit_sets_retry_after() {
        let resp = ApiError(ServiceError::RateLimited { retry_after_secs: 7 }).into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers().get(header::RETRY_AFTER).unwrap(), "7");
    }
}
