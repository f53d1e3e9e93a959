use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use safe_core::SafeError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// 400 with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequest(msg.into()).into())
    }
}

/// Carries an explicit 400 through the `anyhow::Error` chain for request
/// problems that have no `SafeError` counterpart.
#[derive(Debug)]
struct BadRequest(String);

impl std::fmt::Display for BadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequest {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<BadRequest>().is_some() {
            StatusCode::BAD_REQUEST
        } else if let Some(e) = self.0.downcast_ref::<SafeError>() {
            match e {
                SafeError::NotInitialized
                | SafeError::UnknownTier(_)
                | SafeError::UnknownRole(_)
                | SafeError::InvalidEstimate { .. } => StatusCode::BAD_REQUEST,
                SafeError::ItemNotFound(_) => StatusCode::NOT_FOUND,
                SafeError::Precondition { .. } | SafeError::ConfigurationMismatch { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                SafeError::Provider(_) => StatusCode::BAD_GATEWAY,
                SafeError::Io(_) | SafeError::Yaml(_) | SafeError::Json(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
