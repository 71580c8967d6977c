//! Budget allocation data types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AllocationId, CategoryId, UserId};

use crate::period::BudgetMonth;

/// Money assigned to a category for one calendar month.
///
/// At most one allocation exists per (owner, category, month).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    /// Allocation ID.
    pub id: AllocationId,
    /// Owning user.
    #[serde(rename = "user_id")]
    pub owner: UserId,
    /// Category the money is assigned to.
    pub category_id: CategoryId,
    /// Month of the assignment.
    #[serde(flatten)]
    pub period: BudgetMonth,
    /// Assigned amount (signed).
    pub assigned: Decimal,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A validated allocation ready to be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAllocation {
    /// Owning user.
    pub owner: UserId,
    /// Category.
    pub category_id: CategoryId,
    /// Month.
    pub period: BudgetMonth,
    /// Assigned amount.
    pub assigned: Decimal,
}

/// Input for creating an allocation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAllocationInput {
    /// Category to assign to.
    pub category_id: CategoryId,
    /// Year.
    pub year: i32,
    /// Month (1-12).
    pub month: i32,
    /// Amount to assign.
    pub assigned: Decimal,
}

/// Partial update of an allocation. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAllocationInput {
    /// Move to another category.
    pub category_id: Option<CategoryId>,
    /// Move to another year.
    pub year: Option<i32>,
    /// Move to another month.
    pub month: Option<i32>,
    /// New amount.
    pub assigned: Option<Decimal>,
}

impl UpdateAllocationInput {
    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none()
            && self.year.is_none()
            && self.month.is_none()
            && self.assigned.is_none()
    }
}
