//! Balance reconciliation.
//!
//! Money on accounts is split into what is reserved (assigned this month or
//! owed on recurring bills) and what is still free to distribute.

use rust_decimal::Decimal;
use serde::Serialize;
use tally_shared::types::UserId;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::envelope::aggregator::ensure_live;
use crate::error::BudgetError;
use crate::period::BudgetMonth;
use crate::store::{AmountFilter, LedgerReader};

/// System-wide balance figures for one owner. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    /// Σ of every transaction ever posted by the owner.
    pub on_accounts: Decimal,
    /// Σ unpaid remainder of active bill instances due this month or later.
    pub reserved_bills: Decimal,
    /// Σ assigned for the evaluation month.
    pub reserved_budgets: Decimal,
    /// `reserved_bills + reserved_budgets`.
    pub total_reserved: Decimal,
    /// `on_accounts - total_reserved`. Negative when over-committed.
    pub free_to_distribute: Decimal,
}

impl BalanceSnapshot {
    /// Derives the totals from the three inputs.
    #[must_use]
    pub fn new(on_accounts: Decimal, reserved_budgets: Decimal, reserved_bills: Decimal) -> Self {
        let total_reserved = reserved_budgets + reserved_bills;
        Self {
            on_accounts,
            reserved_bills,
            reserved_budgets,
            total_reserved,
            free_to_distribute: on_accounts - total_reserved,
        }
    }
}

/// Computes [`BalanceSnapshot`]s.
pub struct BalanceReconciler;

impl BalanceReconciler {
    /// Reconciles the owner's balance as of `month`.
    ///
    /// Budgets reserve what was *assigned* in `month`, not what is still
    /// available: surplus carried over from earlier months already sits in
    /// `on_accounts`.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::StorageFailure` if any read fails and
    /// `BudgetError::Cancelled` if `cancel` fires first.
    pub async fn reconcile<R>(
        reader: &R,
        owner: UserId,
        month: BudgetMonth,
        cancel: &CancellationToken,
    ) -> Result<BalanceSnapshot, BudgetError>
    where
        R: LedgerReader + ?Sized,
    {
        ensure_live(cancel)?;
        let on_accounts = reader.sum_amounts(owner, &AmountFilter::all()).await?;
        ensure_live(cancel)?;
        let reserved_budgets = reader.assigned_total(owner, month).await?;
        ensure_live(cancel)?;
        let reserved_bills = reader
            .outstanding_bills(owner, month)
            .await?
            .iter()
            .map(crate::store::OutstandingBill::remaining)
            .sum();

        let snapshot = BalanceSnapshot::new(on_accounts, reserved_budgets, reserved_bills);
        debug!(
            owner_id = %owner,
            period = %month,
            free_to_distribute = %snapshot.free_to_distribute,
            "reconciled balance"
        );
        Ok(snapshot)
    }
}
