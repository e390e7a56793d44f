use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    BoxError, Json,
};
use otpgen::{ErrorKind, OtpError};
use serde::Serialize;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    kind: &'a str,
}

impl ApiError {
    pub fn bad_request(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind,
            message: message.into(),
        }
    }

    pub fn missing_secret() -> Self {
        Self::bad_request("missing_secret", "Secret key required")
    }

    /// Maps failures raised by the tower middleware stack
    pub async fn from_transport(err: BoxError) -> Self {
        if err.is::<tower::timeout::error::Elapsed>() {
            Self {
                status: StatusCode::REQUEST_TIMEOUT,
                kind: "timeout",
                message: "Request took too long".into(),
            }
        } else {
            Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                kind: ErrorKind::Internal.as_str(),
                message: err.to_string(),
            }
        }
    }
}

impl From<OtpError> for ApiError {
    fn from(err: OtpError) -> Self {
        let kind = err.kind();
        let status = match kind {
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };

        Self {
            status,
            kind: kind.as_str(),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Well-formed JSON with fields of the wrong type is still a bad request
        let status = match rejection {
            JsonRejection::JsonDataError(_) => StatusCode::BAD_REQUEST,
            ref other => other.status(),
        };

        Self {
            status,
            kind: "malformed_request",
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            kind: self.kind,
        };

        (self.status, Json(body)).into_response()
    }
}
