use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shardhaven_engine::EngineError;
use shardhaven_protocol::{codes, ErrorBody};

/// JSON error reply: `{"error": ..., "code": ...}` with a non-200 status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, code: Option<i64>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                code,
            },
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Not authorized!",
            Some(codes::AUTHORIZATION),
        )
    }

    pub fn bad_param(error: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error,
            Some(codes::BAD_PARAM),
        )
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::MissingHaven | EngineError::HavenNotFound(_) | EngineError::NoLayout(_) => {
                Self::new(StatusCode::NOT_FOUND, e.to_string(), Some(codes::BAD_PARAM))
            }
            EngineError::Rejected(msg) => Self::bad_param(msg),
            EngineError::Database(_) | EngineError::Other(_) => {
                tracing::error!(err = %e, "store failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal error", None)
            }
        }
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "unreadable form body");
        Self::bad_param("Invalid parameter.")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
