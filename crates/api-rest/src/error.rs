use api_shared::ErrorRes;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use bannershare_core::{ErrorKind, ReviewError};

/// A failed request: status code plus the `{error, kind}` body sent to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    fn with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: status_for(kind),
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Validation, message)
    }

    pub fn limit_exceeded(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::LimitExceeded, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Forbidden, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::LimitExceeded | ErrorKind::Archive => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Transfer => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        let kind = err.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!("request failed: {:?}", err);
        } else {
            tracing::warn!(status = status.as_u16(), "request rejected: {}", err);
        }
        Self {
            status,
            kind,
            message: err.user_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorRes::new(self.message).with_kind(self.kind.as_str());
        (self.status, Json(body)).into_response()
    }
}
