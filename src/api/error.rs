use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::types::MessageResponse;

pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method not allowed";
pub const PROCESSING_ERROR_MESSAGE: &str = "Error processing your request";

/// Error returned to proxy callers. Only `message` reaches the body.
#[derive(Debug)]
pub struct ErrorServer {
    pub message: String,
    pub status: StatusCode,
}

impl ErrorServer {
    pub fn method_not_allowed() -> Self {
        Self {
            message: METHOD_NOT_ALLOWED_MESSAGE.to_string(),
            status: StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    pub fn processing() -> Self {
        Self {
            message: PROCESSING_ERROR_MESSAGE.to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl IntoResponse for ErrorServer {
    fn into_response(self) -> Response {
        let body = MessageResponse {
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
