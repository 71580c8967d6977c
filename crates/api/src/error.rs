//! Mapping of domain and repository errors onto JSON responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde_json::json;
use tally_core::BudgetError;
use tally_db::repositories::{AccountError, BillError, CategoryError, TransactionError};
use tally_shared::AppError;
use tracing::error;

/// Handler error rendered as `{"error": CODE, "message": ...}`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": self.0.public_message(),
            })),
        )
            .into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<BudgetError> for ApiError {
    fn from(err: BudgetError) -> Self {
        Self(err.into())
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self(AppError::Database(err.to_string()))
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NotFound(_) => Self(AppError::NotFound(err.to_string())),
            AccountError::Database(e) => e.into(),
        }
    }
}

impl From<CategoryError> for ApiError {
    fn from(err: CategoryError) -> Self {
        match err {
            CategoryError::NotFound(_) => Self(AppError::NotFound(err.to_string())),
            CategoryError::EmptyName => Self(AppError::Validation(err.to_string())),
            CategoryError::Database(e) => e.into(),
        }
    }
}

impl From<TransactionError> for ApiError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::NotFound(_)
            | TransactionError::AccountNotFound(_)
            | TransactionError::CategoryNotFound(_)
            | TransactionError::BillInstanceNotFound(_) => Self(AppError::NotFound(err.to_string())),
            TransactionError::InvalidSort(_) | TransactionError::InvalidAmount(_) => {
                Self(AppError::Validation(err.to_string()))
            }
            TransactionError::Database(e) => e.into(),
        }
    }
}

impl From<BillError> for ApiError {
    fn from(err: BillError) -> Self {
        match err {
            BillError::NotFound(_)
            | BillError::InstanceNotFound(_)
            | BillError::CategoryNotFound(_)
            | BillError::AccountNotFound(_)
            | BillError::TransactionNotFound(_) => Self(AppError::NotFound(err.to_string())),
            BillError::AccessDenied(_) => Self(AppError::Forbidden(err.to_string())),
            BillError::InstanceExists { .. } | BillError::AlreadyPaid { .. } => {
                Self(AppError::Conflict(err.to_string()))
            }
            BillError::EmptyName
            | BillError::InvalidAmount
            | BillError::InvalidPrecision(_)
            | BillError::InvalidDueDay
            | BillError::ExceedsRemaining { .. } => Self(AppError::Validation(err.to_string())),
            BillError::Database(e) => e.into(),
        }
    }
}
