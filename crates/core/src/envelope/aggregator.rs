//! Envelope aggregator.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tally_shared::types::{CategoryId, UserId};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::ledger::CategoryLedger;
use super::types::{BudgetDetail, CategoryMonthlySnapshot};
use crate::error::BudgetError;
use crate::period::BudgetMonth;
use crate::store::{AmountFilter, LedgerReader};

/// Computes per-category budget figures for one owner and month.
///
/// The caller is expected to have authorized `owner` already. All reads go
/// through one [`LedgerReader`], so the result reflects a single snapshot.
pub struct EnvelopeAggregator;

impl EnvelopeAggregator {
    /// Builds the budget detail for `month`.
    ///
    /// Every category of the owner is present, including categories with no
    /// activity at all. Overspent categories report negative `available`.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::StorageFailure` if any read fails and
    /// `BudgetError::Cancelled` if `cancel` fires before the last category
    /// is computed. No partial result is ever returned.
    pub async fn detail<R>(
        reader: &R,
        owner: UserId,
        month: BudgetMonth,
        cancel: &CancellationToken,
    ) -> Result<BudgetDetail, BudgetError>
    where
        R: LedgerReader + ?Sized,
    {
        ensure_live(cancel)?;
        let mut categories = reader.categories(owner).await?;
        ensure_live(cancel)?;
        let on_accounts = reader.sum_amounts(owner, &AmountFilter::all()).await?;
        ensure_live(cancel)?;
        let allocations = reader.allocations_through(owner, month).await?;
        ensure_live(cancel)?;
        let outflows = reader.monthly_outflows(owner, month).await?;

        let mut ledgers: HashMap<CategoryId, CategoryLedger> = HashMap::new();
        for fact in &allocations {
            ledgers
                .entry(fact.category_id)
                .or_default()
                .assign(fact.month, fact.assigned);
        }
        for fact in &outflows {
            ledgers
                .entry(fact.category_id)
                .or_default()
                .spend(fact.month, fact.spent);
        }

        categories.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.0.cmp(&b.id.0)));

        let empty = CategoryLedger::new();
        let mut snapshots = Vec::with_capacity(categories.len());
        let mut total_assigned = Decimal::ZERO;
        for category in categories {
            ensure_live(cancel)?;

            let figures = ledgers.get(&category.id).unwrap_or(&empty).figures(month);
            total_assigned += figures.assigned;
            snapshots.push(CategoryMonthlySnapshot {
                category_id: category.id,
                category_name: category.name,
                group_name: category.group_name,
                assigned: figures.assigned,
                spent: figures.spent,
                carried_over: figures.carried_over,
                available: figures.available,
            });
        }

        debug!(
            owner_id = %owner,
            period = %month,
            categories = snapshots.len(),
            "computed budget detail"
        );

        Ok(BudgetDetail {
            period: month,
            categories: snapshots,
            to_be_budgeted: on_accounts - total_assigned,
        })
    }
}

/// Fails with `Cancelled` once the caller has given up.
pub(crate) fn ensure_live(cancel: &CancellationToken) -> Result<(), BudgetError> {
    if cancel.is_cancelled() {
        Err(BudgetError::Cancelled)
    } else {
        Ok(())
    }
}
