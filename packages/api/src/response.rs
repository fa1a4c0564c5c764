// ABOUTME: Shared API response types and error handling
// ABOUTME: Provides consistent response format across all API endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use serde::Serialize;
use tracing::error;

use labstock_chat::ChatError;
use labstock_inventory::InventoryError;
use labstock_lending::LendingError;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, ResponseJson(ApiResponse::<()>::error(message))).into_response()
}

/// Wrapper so lifecycle errors can be returned with `?` from handlers.
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error_response(self.0, self.1)
    }
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        Self(StatusCode::NOT_FOUND, format!("{} not found", what))
    }

    pub fn forbidden(message: &str) -> Self {
        Self(StatusCode::FORBIDDEN, message.to_string())
    }

    pub fn bad_request(message: &str) -> Self {
        Self(StatusCode::BAD_REQUEST, message.to_string())
    }
}

impl From<LendingError> for ApiError {
    fn from(err: LendingError) -> Self {
        let status = match &err {
            LendingError::InvalidQuantity(_)
            | LendingError::InvalidDueDays(_)
            | LendingError::InsufficientAvailability { .. }
            | LendingError::AlreadyBorrowed { .. } => StatusCode::BAD_REQUEST,
            LendingError::InvalidState { .. } => StatusCode::CONFLICT,
            LendingError::NotFound(_) => StatusCode::NOT_FOUND,
            LendingError::Storage(inner) => {
                error!("Storage error: {}", inner);
                return Self(StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string());
            }
        };
        Self(status, err.to_string())
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        let status = match &err {
            InventoryError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
            InventoryError::NotFound => StatusCode::NOT_FOUND,
            InventoryError::ActiveTransactions => StatusCode::CONFLICT,
            InventoryError::Storage(inner) => {
                error!("Storage error: {}", inner);
                return Self(StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string());
            }
        };
        Self(status, err.to_string())
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        error!("Chat error: {}", err);
        Self(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to answer question".to_string(),
        )
    }
}

impl From<labstock_storage::StorageError> for ApiError {
    fn from(err: labstock_storage::StorageError) -> Self {
        error!("Storage error: {}", err);
        Self(StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// 200 with the success envelope.
pub fn ok<T: Serialize>(data: T) -> Response {
    ResponseJson(ApiResponse::success(data)).into_response()
}

/// 201 with the success envelope, for resource creation.
pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, ResponseJson(ApiResponse::success(data))).into_response()
}
