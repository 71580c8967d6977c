//! Balance and per-month income/expense statistics.

use rust_decimal::Decimal;
use serde::Serialize;
use tally_shared::types::CategoryId;
use tokio_util::sync::CancellationToken;

use crate::auth::Caller;
use crate::envelope::aggregator::ensure_live;
use crate::error::BudgetError;
use crate::period::BudgetMonth;
use crate::reconcile::{BalanceReconciler, BalanceSnapshot};
use crate::store::{
    AllocationStore, AmountFilter, CategoryScope, FlowDirection, LedgerReader, LedgerStore,
};

/// Longest range accepted by [`StatisticsService::periods`].
pub const MAX_PERIOD_MONTHS: usize = 120;

/// Months covered when no range start is given.
const DEFAULT_PERIOD_MONTHS: usize = 12;

/// Income and expense of one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodStatistics {
    /// Month.
    #[serde(flatten)]
    pub period: BudgetMonth,
    /// Σ positive amounts.
    pub income: Decimal,
    /// Σ |negative amounts|.
    pub expense: Decimal,
    /// `income - expense`.
    pub balance: Decimal,
}

/// Display name of the bucket holding transactions without a category.
pub const UNCATEGORIZED_NAME: &str = "Uncategorized";

/// Income and expense of one category in one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStatistics {
    /// Month.
    #[serde(flatten)]
    pub period: BudgetMonth,
    /// `None` for the uncategorized bucket.
    pub category_id: Option<CategoryId>,
    /// Category name, or [`UNCATEGORIZED_NAME`].
    pub category_name: String,
    /// Σ positive amounts.
    pub income: Decimal,
    /// Σ |negative amounts|.
    pub expense: Decimal,
}

/// Read-only statistics for the authenticated caller.
pub struct StatisticsService<S> {
    store: S,
}

impl<S> StatisticsService<S>
where
    S: AllocationStore + LedgerStore,
{
    /// Creates a service over `store`.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Balance statistics for the caller as of `period` (default: current
    /// month).
    ///
    /// # Errors
    ///
    /// `StorageFailure` or `Cancelled`.
    pub async fn balance(
        &self,
        caller: &Caller,
        period: Option<BudgetMonth>,
        cancel: &CancellationToken,
    ) -> Result<BalanceSnapshot, BudgetError> {
        let period = period.unwrap_or_else(BudgetMonth::current);
        let reader = self.store.begin_read().await?;
        BalanceReconciler::reconcile(&reader, caller.user_id, period, cancel).await
    }

    /// Income and expense per month from `from` through `to`, newest first.
    ///
    /// `to` defaults to the current month and `from` to eleven months
    /// before `to`. With `category`, only that category's transactions
    /// count.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `from` is after `to` or the range is too long
    /// - `CategoryNotFound` if `category` is not the caller's
    /// - `StorageFailure` or `Cancelled`
    pub async fn periods(
        &self,
        caller: &Caller,
        from: Option<BudgetMonth>,
        to: Option<BudgetMonth>,
        category: Option<CategoryId>,
        cancel: &CancellationToken,
    ) -> Result<Vec<PeriodStatistics>, BudgetError> {
        let months = month_range(from, to)?;

        if let Some(category) = category {
            match self.store.category_owner(category).await? {
                Some(owner) if owner == caller.user_id => {}
                _ => return Err(BudgetError::CategoryNotFound(category.0)),
            }
        }

        let reader = self.store.begin_read().await?;
        let mut stats = Vec::with_capacity(months.len());
        for month in months.into_iter().rev() {
            ensure_live(cancel)?;
            let mut filter = AmountFilter::all().within(month);
            filter.category = category.into();
            let (income, expense) = flows(&reader, caller, filter).await?;
            stats.push(PeriodStatistics {
                period: month,
                income,
                expense,
                balance: income - expense,
            });
        }
        Ok(stats)
    }

    /// Income and expense per category and month, newest month first and
    /// by category name within a month.
    ///
    /// Transactions without a category are reported under
    /// [`UNCATEGORIZED_NAME`]. Category-months without any transaction are
    /// left out. The range defaults as in [`Self::periods`].
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a bad range, `StorageFailure` or `Cancelled`.
    pub async fn categories(
        &self,
        caller: &Caller,
        from: Option<BudgetMonth>,
        to: Option<BudgetMonth>,
        cancel: &CancellationToken,
    ) -> Result<Vec<CategoryStatistics>, BudgetError> {
        let months = month_range(from, to)?;

        let reader = self.store.begin_read().await?;
        ensure_live(cancel)?;
        let mut buckets: Vec<(String, Option<CategoryId>)> = reader
            .categories(caller.user_id)
            .await?
            .into_iter()
            .map(|c| (c.name, Some(c.id)))
            .collect();
        buckets.push((UNCATEGORIZED_NAME.to_string(), None));
        buckets.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| a.1.map(|id| id.0).cmp(&b.1.map(|id| id.0)))
        });

        let mut stats = Vec::new();
        for month in months.into_iter().rev() {
            for (name, category) in &buckets {
                ensure_live(cancel)?;
                let mut filter = AmountFilter::all().within(month);
                filter.category =
                    category.map_or(CategoryScope::Uncategorized, CategoryScope::Only);
                let (income, expense) = flows(&reader, caller, filter).await?;
                if income.is_zero() && expense.is_zero() {
                    continue;
                }
                stats.push(CategoryStatistics {
                    period: month,
                    category_id: *category,
                    category_name: name.clone(),
                    income,
                    expense,
                });
            }
        }
        Ok(stats)
    }
}

/// Months from `from` through `to`, with the defaults of
/// [`StatisticsService::periods`] applied.
fn month_range(
    from: Option<BudgetMonth>,
    to: Option<BudgetMonth>,
) -> Result<Vec<BudgetMonth>, BudgetError> {
    let to = to.unwrap_or_else(BudgetMonth::current);
    let from = from.unwrap_or_else(|| {
        (1..DEFAULT_PERIOD_MONTHS).fold(to, |month, _| month.previous())
    });
    if from > to {
        return Err(BudgetError::InvalidInput(format!(
            "range start {from} is after range end {to}"
        )));
    }
    let months: Vec<BudgetMonth> = from.through(to).collect();
    if months.len() > MAX_PERIOD_MONTHS {
        return Err(BudgetError::InvalidInput(format!(
            "range may cover at most {MAX_PERIOD_MONTHS} months"
        )));
    }
    Ok(months)
}

/// `(income, expense)` of the transactions passing `filter`, both positive.
async fn flows<R>(
    reader: &R,
    caller: &Caller,
    filter: AmountFilter,
) -> Result<(Decimal, Decimal), BudgetError>
where
    R: LedgerReader + ?Sized,
{
    let income = reader
        .sum_amounts(caller.user_id, &filter.direction(FlowDirection::Inflow))
        .await?;
    let expense = -reader
        .sum_amounts(caller.user_id, &filter.direction(FlowDirection::Outflow))
        .await?;
    Ok((income, expense))
}
