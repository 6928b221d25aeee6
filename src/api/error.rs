use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Request,
    },
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, ServiceError};

const INTERNAL_MESSAGE: &str = "An unexpected internal error occurred.";

/// The single error body shape returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<FieldErrors>,
}

impl ErrorResponse {
    fn new(status: StatusCode, message: String, field_errors: Option<FieldErrors>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            path: String::new(),
            field_errors,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    field_errors: Option<FieldErrors>,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Validation {
                message,
                field_errors,
            } => Self {
                status: StatusCode::BAD_REQUEST,
                message,
                field_errors: Some(field_errors),
            },
            ServiceError::NotFound(message) => Self::new(StatusCode::NOT_FOUND, message),
            ServiceError::InvalidArgument(message) => Self::bad_request(message),
            ServiceError::Conflict(message) => Self::new(StatusCode::CONFLICT, message),
            ServiceError::Internal(error) => {
                log::error!("Internal error: {:#}", error);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Malformed request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(format!("Invalid query parameter: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_client_error() {
            log::debug!("Rejected request ({}): {}", self.status, self.message);
        }

        let body = ErrorResponse::new(self.status, self.message, self.field_errors);

        // The path is filled in by `error_path_layer`, which sees the request.
        let mut response = (self.status, Json(body.clone())).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

/// Middleware that stamps the request path into error bodies.
///
/// Error responses produced by the router itself, such as a 405 for a known
/// path, carry no body and are rewritten into the same shape.
pub async fn error_path_layer(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let mut response = next.run(request).await;
    let status = response.status();

    let mut body = match response.extensions_mut().remove::<ErrorResponse>() {
        Some(body) => body,
        None if status == StatusCode::METHOD_NOT_ALLOWED => ErrorResponse::new(
            status,
            format!("Request method {} is not supported for {}", method, path),
            None,
        ),
        None if status.is_client_error() || status.is_server_error() => ErrorResponse::new(
            status,
            status.canonical_reason().unwrap_or("Error").to_string(),
            None,
        ),
        None => return response,
    };
    body.path = path;

    let mut rewritten = (status, Json(body)).into_response();
    if let Some(allow) = response.headers().get(header::ALLOW) {
        rewritten.headers_mut().insert(header::ALLOW, allow.clone());
    }
    rewritten
}
