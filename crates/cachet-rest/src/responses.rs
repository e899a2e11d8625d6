//! API response types.

use cachet_core::{CacheError, ErrorResponse};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Standard API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    /// Creates a successful response.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Creates an error response.
    pub fn error(error: ErrorResponse) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Application error type for Axum.
#[derive(Debug)]
pub enum AppError {
    /// Cache layer failure.
    Cache(CacheError),
    /// Requested resource does not exist.
    NotFound(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Cache(err) => StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            Self::Cache(err) => ErrorResponse::from_error(err),
            Self::NotFound(message) => ErrorResponse {
                code: "NOT_FOUND".to_string(),
                message: message.clone(),
                trace_id: None,
            },
        }
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        Self::Cache(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        }

        let body = Json(ApiResponse::<()>::error(self.body()));
        (status, body).into_response()
    }
}

/// Result type for Axum handlers.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// Helper to create a success response.
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}
