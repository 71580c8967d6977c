//! Ledger and allocation store contracts.
//!
//! The core never talks to a database directly. `tally-db` implements these
//! traits against PostgreSQL; tests use an in-memory implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tally_shared::types::{AllocationId, BillInstanceId, CategoryId, RecurringBillId, UserId};
use thiserror::Error;
use uuid::Uuid;

use crate::budget::types::{Allocation, NewAllocation};
use crate::period::BudgetMonth;

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint on (owner, category, year, month) fired.
    #[error("duplicate allocation for category {category_id} in {year}-{month:02}")]
    Duplicate {
        /// Category of the rejected row.
        category_id: Uuid,
        /// Year of the rejected row.
        year: i32,
        /// Month of the rejected row.
        month: u32,
    },

    /// Any other persistence failure.
    #[error("{0}")]
    Failure(String),
}

/// A category as seen by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryInfo {
    /// Category ID.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// Optional group heading.
    pub group_name: Option<String>,
}

/// Sign of the transaction amounts to include in a sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    /// Positive amounts only.
    Inflow,
    /// Negative amounts only.
    Outflow,
}

impl FlowDirection {
    /// Returns true if `amount` belongs to this direction.
    #[must_use]
    pub fn includes(self, amount: Decimal) -> bool {
        match self {
            Self::Inflow => amount > Decimal::ZERO,
            Self::Outflow => amount < Decimal::ZERO,
        }
    }
}

/// Which categories a sum covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryScope {
    /// Every transaction, categorized or not.
    #[default]
    Any,
    /// Transactions of one category.
    Only(CategoryId),
    /// Transactions without a category.
    Uncategorized,
}

impl CategoryScope {
    /// Returns true if a transaction in `category` is covered.
    #[must_use]
    pub fn includes(self, category: Option<CategoryId>) -> bool {
        match self {
            Self::Any => true,
            Self::Only(wanted) => category == Some(wanted),
            Self::Uncategorized => category.is_none(),
        }
    }
}

impl From<Option<CategoryId>> for CategoryScope {
    fn from(category: Option<CategoryId>) -> Self {
        category.map_or(Self::Any, Self::Only)
    }
}

/// Filter for summing transaction amounts.
///
/// Every field is optional; [`AmountFilter::all`] matches every transaction
/// of the owner and yields the literal total held on accounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmountFilter {
    /// Restrict by category.
    pub category: CategoryScope,
    /// Half-open date range `[start, end)`.
    pub range: Option<(NaiveDate, NaiveDate)>,
    /// Restrict to inflows or outflows.
    pub direction: Option<FlowDirection>,
}

impl AmountFilter {
    /// No filtering.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to one category.
    #[must_use]
    pub fn category(mut self, category: CategoryId) -> Self {
        self.category = CategoryScope::Only(category);
        self
    }

    /// Restrict to transactions without a category.
    #[must_use]
    pub fn uncategorized(mut self) -> Self {
        self.category = CategoryScope::Uncategorized;
        self
    }

    /// Restrict to the dates of one month.
    #[must_use]
    pub fn within(mut self, month: BudgetMonth) -> Self {
        self.range = Some((month.start_date(), month.end_exclusive()));
        self
    }

    /// Restrict to one sign.
    #[must_use]
    pub fn direction(mut self, direction: FlowDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Returns true if a transaction with these attributes passes the filter.
    #[must_use]
    pub fn matches(&self, category: Option<CategoryId>, date: NaiveDate, amount: Decimal) -> bool {
        if !self.category.includes(category) {
            return false;
        }
        if let Some((start, end)) = self.range
            && (date < start || date >= end)
        {
            return false;
        }
        self.direction.is_none_or(|d| d.includes(amount))
    }
}

/// Spending of one category in one month, as a positive magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyOutflow {
    /// Category ID.
    pub category_id: CategoryId,
    /// Month of the spending.
    pub month: BudgetMonth,
    /// `-Σ(amount | amount < 0)`.
    pub spent: Decimal,
}

/// Assigned amount of one category in one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationFact {
    /// Category ID.
    pub category_id: CategoryId,
    /// Month of the assignment.
    pub month: BudgetMonth,
    /// Assigned amount.
    pub assigned: Decimal,
}

/// A monthly instance of an active recurring bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutstandingBill {
    /// Parent recurring bill.
    pub bill_id: RecurringBillId,
    /// This instance.
    pub instance_id: BillInstanceId,
    /// Month the instance is due.
    pub month: BudgetMonth,
    /// Amount expected to be paid.
    pub expected: Decimal,
    /// Amount paid so far.
    pub paid: Decimal,
}

impl OutstandingBill {
    /// Unpaid remainder, never below zero.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        (self.expected - self.paid).max(Decimal::ZERO)
    }
}

/// Read queries over one consistent snapshot of the ledger.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// All categories owned by `owner`.
    async fn categories(&self, owner: UserId) -> Result<Vec<CategoryInfo>, StoreError>;

    /// Σ transaction amounts of `owner` passing `filter`.
    async fn sum_amounts(&self, owner: UserId, filter: &AmountFilter)
    -> Result<Decimal, StoreError>;

    /// Per (category, month) spending for every month up to and including
    /// `through`. Months without spending may be omitted.
    async fn monthly_outflows(
        &self,
        owner: UserId,
        through: BudgetMonth,
    ) -> Result<Vec<MonthlyOutflow>, StoreError>;

    /// Allocations for every month up to and including `through`.
    async fn allocations_through(
        &self,
        owner: UserId,
        through: BudgetMonth,
    ) -> Result<Vec<AllocationFact>, StoreError>;

    /// Σ assigned across all categories for exactly `month`.
    async fn assigned_total(&self, owner: UserId, month: BudgetMonth)
    -> Result<Decimal, StoreError>;

    /// Instances of active recurring bills due in `from` or later.
    async fn outstanding_bills(
        &self,
        owner: UserId,
        from: BudgetMonth,
    ) -> Result<Vec<OutstandingBill>, StoreError>;
}

/// Opens read snapshots.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Reader bound to one snapshot.
    type Reader: LedgerReader + Send;

    /// Opens a read-only snapshot. Every query issued through the returned
    /// reader observes the same committed state.
    async fn begin_read(&self) -> Result<Self::Reader, StoreError>;
}

/// Persistence of budget allocations.
#[async_trait]
pub trait AllocationStore: Send + Sync {
    /// Inserts a new allocation.
    ///
    /// Must fail with [`StoreError::Duplicate`] if the (owner, category,
    /// month) key is taken.
    async fn insert(&self, new: NewAllocation) -> Result<Allocation, StoreError>;

    /// Persists every field of `allocation` except `id`, `owner` and
    /// `created_at`. Returns `None` if the row vanished.
    async fn update(&self, allocation: &Allocation) -> Result<Option<Allocation>, StoreError>;

    /// Deletes by ID. Returns false if nothing was deleted.
    async fn delete(&self, id: AllocationId) -> Result<bool, StoreError>;

    /// Finds by ID.
    async fn find_by_id(&self, id: AllocationId) -> Result<Option<Allocation>, StoreError>;

    /// Finds by unique key.
    async fn find_by_key(
        &self,
        owner: UserId,
        category: CategoryId,
        month: BudgetMonth,
    ) -> Result<Option<Allocation>, StoreError>;

    /// All allocations of `owner`, newest month first.
    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Allocation>, StoreError>;

    /// Allocations of `owner` in one month.
    async fn list_by_period(
        &self,
        owner: UserId,
        month: BudgetMonth,
    ) -> Result<Vec<Allocation>, StoreError>;

    /// Owner of a category, or `None` if it does not exist.
    async fn category_owner(&self, category: CategoryId) -> Result<Option<UserId>, StoreError>;
}
