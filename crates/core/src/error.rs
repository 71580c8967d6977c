//! Budget error types.

use tally_shared::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Errors raised by the budgeting core.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// Allocation not found.
    #[error("Budget allocation not found: {0}")]
    NotFound(Uuid),

    /// Referenced category does not exist or belongs to someone else.
    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),

    /// Caller is neither the owner nor an admin.
    #[error("Access denied")]
    AccessDenied,

    /// An allocation for this category and month already exists.
    #[error("Budget allocation already exists for category {category_id} in {year}-{month:02}")]
    AlreadyExists {
        /// Category of the conflicting allocation.
        category_id: Uuid,
        /// Year of the conflicting allocation.
        year: i32,
        /// Month of the conflicting allocation.
        month: u32,
    },

    /// Malformed period, limit or amount.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Underlying persistence failure.
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// The caller abandoned the request mid-aggregation.
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<StoreError> for BudgetError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate {
                category_id,
                year,
                month,
            } => Self::AlreadyExists {
                category_id,
                year,
                month,
            },
            StoreError::Failure(msg) => Self::StorageFailure(msg),
        }
    }
}

impl From<BudgetError> for AppError {
    fn from(err: BudgetError) -> Self {
        match err {
            BudgetError::NotFound(_) | BudgetError::CategoryNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            BudgetError::AccessDenied => Self::Forbidden(err.to_string()),
            BudgetError::AlreadyExists { .. } => Self::Conflict(err.to_string()),
            BudgetError::InvalidInput(msg) => Self::Validation(msg),
            BudgetError::StorageFailure(msg) => Self::Database(msg),
            BudgetError::Cancelled => Self::Cancelled,
        }
    }
}
