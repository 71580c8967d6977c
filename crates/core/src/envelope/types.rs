//! Envelope aggregation results.

use rust_decimal::Decimal;
use serde::Serialize;
use tally_shared::types::CategoryId;

use crate::period::BudgetMonth;

/// Computed figures for one category in one month. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryMonthlySnapshot {
    /// Category ID.
    pub category_id: CategoryId,
    /// Category display name.
    pub category_name: String,
    /// Category group, if any.
    pub group_name: Option<String>,
    /// Assigned this month (zero without an allocation row).
    pub assigned: Decimal,
    /// Magnitude of outflows this month.
    pub spent: Decimal,
    /// Previous month's `available`.
    pub carried_over: Decimal,
    /// `assigned + carried_over - spent`. Negative when overspent.
    pub available: Decimal,
}

/// Budget detail for one owner and month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetDetail {
    /// Month the figures are for.
    #[serde(flatten)]
    pub period: BudgetMonth,
    /// One entry per category of the owner, ordered by name.
    pub categories: Vec<CategoryMonthlySnapshot>,
    /// Money on accounts minus everything assigned this month.
    pub to_be_budgeted: Decimal,
}
