//! Month-by-month activity of a single category.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::period::BudgetMonth;

/// Assigned and spent amounts for one month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthActivity {
    /// Assigned amount.
    pub assigned: Decimal,
    /// Spent magnitude.
    pub spent: Decimal,
}

/// Figures for one category in one month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthFigures {
    /// Assigned this month.
    pub assigned: Decimal,
    /// Spent this month.
    pub spent: Decimal,
    /// Available at the end of the previous month.
    pub carried_over: Decimal,
    /// Available at the end of this month.
    pub available: Decimal,
}

/// Activity of one category keyed by month.
///
/// Months with neither an allocation nor spending are simply absent and
/// count as zero.
#[derive(Debug, Clone, Default)]
pub struct CategoryLedger {
    months: BTreeMap<BudgetMonth, MonthActivity>,
}

impl CategoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds to the assigned amount of `month`.
    pub fn assign(&mut self, month: BudgetMonth, assigned: Decimal) {
        self.months.entry(month).or_default().assigned += assigned;
    }

    /// Adds to the spent amount of `month`.
    pub fn spend(&mut self, month: BudgetMonth, spent: Decimal) {
        self.months.entry(month).or_default().spent += spent;
    }

    /// Earliest month with any activity.
    #[must_use]
    pub fn first_active(&self) -> Option<BudgetMonth> {
        self.months.keys().next().copied()
    }

    /// Raw activity of `month`.
    #[must_use]
    pub fn activity(&self, month: BudgetMonth) -> MonthActivity {
        self.months.get(&month).copied().unwrap_or_default()
    }

    /// Available at the end of `month`.
    ///
    /// `available(m) = assigned(m) + available(m - 1) - spent(m)`, with
    /// `available = 0` before the first active month. Unrolling the chain
    /// gives `Σ (assigned - spent)` over every active month up to `m`, which
    /// is what is computed here so that long histories do not recurse once
    /// per calendar month.
    #[must_use]
    pub fn available_at(&self, month: BudgetMonth) -> Decimal {
        self.months
            .range(..=month)
            .map(|(_, a)| a.assigned - a.spent)
            .sum()
    }

    /// Full figures for `month`.
    #[must_use]
    pub fn figures(&self, month: BudgetMonth) -> MonthFigures {
        let MonthActivity { assigned, spent } = self.activity(month);
        let carried_over = match self.first_active() {
            Some(first) if first < month => self.available_at(month.previous()),
            _ => Decimal::ZERO,
        };

        MonthFigures {
            assigned,
            spent,
            carried_over,
            available: assigned + carried_over - spent,
        }
    }
}
