//! Aggregation scenarios against the in-memory ledger.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_shared::types::UserId;
use tokio_util::sync::CancellationToken;

use super::aggregator::EnvelopeAggregator;
use super::types::{BudgetDetail, CategoryMonthlySnapshot};
use crate::error::BudgetError;
use crate::period::BudgetMonth;
use crate::store::{
    AllocationFact, AmountFilter, CategoryInfo, LedgerReader, LedgerStore, MonthlyOutflow,
    OutstandingBill, StoreError,
};
use crate::testing::{MemoryLedger, MemorySnapshot};

fn m(year: i32, month: u32) -> BudgetMonth {
    BudgetMonth::new(year, month).unwrap()
}

fn date(y: i32, mo: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, mo, d).unwrap()
}

async fn detail(ledger: &MemoryLedger, owner: UserId, month: BudgetMonth) -> BudgetDetail {
    let reader = ledger.begin_read().await.unwrap();
    EnvelopeAggregator::detail(&reader, owner, month, &CancellationToken::new())
        .await
        .unwrap()
}

fn only(detail: &BudgetDetail) -> &CategoryMonthlySnapshot {
    assert_eq!(detail.categories.len(), 1);
    &detail.categories[0]
}

#[tokio::test]
async fn test_fresh_category_all_zero() {
    let ledger = MemoryLedger::default();
    let owner = UserId::new();
    ledger.add_category(owner, "Groceries");

    for month in [m(2020, 1), m(2026, 6), m(2031, 12)] {
        let d = detail(&ledger, owner, month).await;
        let groceries = only(&d);
        assert_eq!(groceries.category_name, "Groceries");
        assert_eq!(groceries.assigned, Decimal::ZERO);
        assert_eq!(groceries.spent, Decimal::ZERO);
        assert_eq!(groceries.carried_over, Decimal::ZERO);
        assert_eq!(groceries.available, Decimal::ZERO);
    }
}

#[tokio::test]
async fn test_simple_budgeting_and_overspend_scenario() {
    let ledger = MemoryLedger::default();
    let owner = UserId::new();
    let groceries = ledger.add_category(owner, "Groceries");

    ledger.assign(owner, groceries, m(2026, 1), dec!(500.00));
    ledger.add_transaction(owner, Some(groceries), date(2026, 1, 4), dec!(-200.00));
    ledger.add_transaction(owner, Some(groceries), date(2026, 1, 20), dec!(-120.00));
    ledger.assign(owner, groceries, m(2026, 2), dec!(500.00));
    ledger.add_transaction(owner, Some(groceries), date(2026, 3, 15), dec!(-50.00));

    let jan = detail(&ledger, owner, m(2026, 1)).await;
    assert_eq!(only(&jan).spent, dec!(320.00));
    assert_eq!(only(&jan).carried_over, Decimal::ZERO);
    assert_eq!(only(&jan).available, dec!(180.00));

    let feb = detail(&ledger, owner, m(2026, 2)).await;
    assert_eq!(only(&feb).assigned, dec!(500.00));
    assert_eq!(only(&feb).spent, Decimal::ZERO);
    assert_eq!(only(&feb).carried_over, dec!(180.00));
    assert_eq!(only(&feb).available, dec!(680.00));

    let mar = detail(&ledger, owner, m(2026, 3)).await;
    assert_eq!(only(&mar).assigned, Decimal::ZERO);
    assert_eq!(only(&mar).spent, dec!(50.00));
    assert_eq!(only(&mar).carried_over, dec!(680.00));
    assert_eq!(only(&mar).available, dec!(630.00));
}

#[tokio::test]
async fn test_overspend_reported_negative() {
    let ledger = MemoryLedger::default();
    let owner = UserId::new();
    let car = ledger.add_category(owner, "Car");
    ledger.add_transaction(owner, Some(car), date(2026, 4, 2), dec!(-1000.00));

    let apr = detail(&ledger, owner, m(2026, 4)).await;
    assert_eq!(only(&apr).carried_over, Decimal::ZERO);
    assert_eq!(only(&apr).available, dec!(-1000.00));

    // The deficit keeps rolling forward until covered.
    ledger.assign(owner, car, m(2026, 5), dec!(300.00));
    let may = detail(&ledger, owner, m(2026, 5)).await;
    assert_eq!(only(&may).carried_over, dec!(-1000.00));
    assert_eq!(only(&may).available, dec!(-700.00));
}

#[tokio::test]
async fn test_income_in_category_is_not_spending() {
    let ledger = MemoryLedger::default();
    let owner = UserId::new();
    let gifts = ledger.add_category(owner, "Gifts");
    ledger.add_transaction(owner, Some(gifts), date(2026, 4, 2), dec!(75.00));
    ledger.add_transaction(owner, Some(gifts), date(2026, 4, 3), dec!(-25.00));

    let apr = detail(&ledger, owner, m(2026, 4)).await;
    assert_eq!(only(&apr).spent, dec!(25.00));
    assert_eq!(only(&apr).available, dec!(-25.00));
}

#[tokio::test]
async fn test_year_rollover_carry() {
    let ledger = MemoryLedger::default();
    let owner = UserId::new();
    let gifts = ledger.add_category(owner, "Gifts");
    ledger.assign(owner, gifts, m(2025, 12), dec!(90.00));

    let jan = detail(&ledger, owner, m(2026, 1)).await;
    assert_eq!(only(&jan).carried_over, dec!(90.00));
    assert_eq!(only(&jan).available, dec!(90.00));
}

#[tokio::test]
async fn test_later_activity_does_not_leak_backwards() {
    let ledger = MemoryLedger::default();
    let owner = UserId::new();
    let rent = ledger.add_category(owner, "Rent");
    ledger.assign(owner, rent, m(2026, 8), dec!(1200.00));
    ledger.add_transaction(owner, Some(rent), date(2026, 8, 1), dec!(-1200.00));

    let jul = detail(&ledger, owner, m(2026, 7)).await;
    assert_eq!(only(&jul).assigned, Decimal::ZERO);
    assert_eq!(only(&jul).available, Decimal::ZERO);
}

#[tokio::test]
async fn test_categories_sorted_and_isolated() {
    let ledger = MemoryLedger::default();
    let owner = UserId::new();
    let stranger = UserId::new();
    let zoo = ledger.add_category(owner, "Zoo");
    let books = ledger.add_category(owner, "Books");
    ledger.add_category(owner, "Misc");
    let theirs = ledger.add_category(stranger, "Aardvark");

    ledger.assign(owner, zoo, m(2026, 2), dec!(10));
    ledger.assign(owner, books, m(2026, 2), dec!(20));
    ledger.assign(stranger, theirs, m(2026, 2), dec!(999));

    let d = detail(&ledger, owner, m(2026, 2)).await;
    let names: Vec<_> = d.categories.iter().map(|c| c.category_name.as_str()).collect();
    assert_eq!(names, ["Books", "Misc", "Zoo"]);
    assert_eq!(d.categories[0].assigned, dec!(20));
    assert_eq!(d.categories[1].assigned, Decimal::ZERO);
}

#[tokio::test]
async fn test_to_be_budgeted() {
    let ledger = MemoryLedger::default();
    let owner = UserId::new();
    let food = ledger.add_category(owner, "Food");
    let fun = ledger.add_category(owner, "Fun");

    ledger.add_transaction(owner, None, date(2026, 1, 1), dec!(2500.00));
    ledger.add_transaction(owner, Some(food), date(2026, 1, 8), dec!(-100.00));
    ledger.assign(owner, food, m(2026, 1), dec!(400.00));
    ledger.assign(owner, fun, m(2026, 1), dec!(150.00));
    ledger.assign(owner, food, m(2025, 12), dec!(999.00));

    let d = detail(&ledger, owner, m(2026, 1)).await;
    assert_eq!(d.to_be_budgeted, dec!(2400.00) - dec!(550.00));
    assert_eq!(d.period, m(2026, 1));
}

/// Delegates to a snapshot but interferes once spending is loaded.
struct Interfering {
    inner: MemorySnapshot,
    cancel: Option<CancellationToken>,
    fail: bool,
}

#[async_trait]
impl LedgerReader for Interfering {
    async fn categories(&self, owner: UserId) -> Result<Vec<CategoryInfo>, StoreError> {
        self.inner.categories(owner).await
    }

    async fn sum_amounts(
        &self,
        owner: UserId,
        filter: &AmountFilter,
    ) -> Result<Decimal, StoreError> {
        self.inner.sum_amounts(owner, filter).await
    }

    async fn monthly_outflows(
        &self,
        owner: UserId,
        through: BudgetMonth,
    ) -> Result<Vec<MonthlyOutflow>, StoreError> {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
        if self.fail {
            return Err(StoreError::Failure("connection reset".into()));
        }
        self.inner.monthly_outflows(owner, through).await
    }

    async fn allocations_through(
        &self,
        owner: UserId,
        through: BudgetMonth,
    ) -> Result<Vec<AllocationFact>, StoreError> {
        self.inner.allocations_through(owner, through).await
    }

    async fn assigned_total(
        &self,
        owner: UserId,
        month: BudgetMonth,
    ) -> Result<Decimal, StoreError> {
        self.inner.assigned_total(owner, month).await
    }

    async fn outstanding_bills(
        &self,
        owner: UserId,
        from: BudgetMonth,
    ) -> Result<Vec<OutstandingBill>, StoreError> {
        self.inner.outstanding_bills(owner, from).await
    }
}

async fn seeded() -> (MemorySnapshot, UserId) {
    let ledger = MemoryLedger::default();
    let owner = UserId::new();
    for name in ["Food", "Fun", "Rent"] {
        let category = ledger.add_category(owner, name);
        ledger.assign(owner, category, m(2026, 1), dec!(10));
    }
    (ledger.begin_read().await.unwrap(), owner)
}

#[tokio::test]
async fn test_storage_failure_propagates() {
    let (inner, owner) = seeded().await;
    let reader = Interfering {
        inner,
        cancel: None,
        fail: true,
    };

    let result = EnvelopeAggregator::detail(&reader, owner, m(2026, 1), &CancellationToken::new()).await;
    assert!(matches!(result, Err(BudgetError::StorageFailure(msg)) if msg == "connection reset"));
}

#[tokio::test]
async fn test_cancelled_mid_aggregation_returns_no_partial_result() {
    let (inner, owner) = seeded().await;
    let cancel = CancellationToken::new();
    let reader = Interfering {
        inner,
        cancel: Some(cancel.clone()),
        fail: false,
    };

    let result = EnvelopeAggregator::detail(&reader, owner, m(2026, 1), &cancel).await;
    assert!(matches!(result, Err(BudgetError::Cancelled)));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let (reader, owner) = seeded().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = EnvelopeAggregator::detail(&reader, owner, m(2026, 1), &cancel).await;
    assert!(matches!(result, Err(BudgetError::Cancelled)));
}

#[tokio::test]
async fn test_snapshot_ignores_later_writes() {
    let ledger = MemoryLedger::default();
    let owner = UserId::new();
    let food = ledger.add_category(owner, "Food");
    ledger.assign(owner, food, m(2026, 1), dec!(100));

    let reader = ledger.begin_read().await.unwrap();
    ledger.add_transaction(owner, Some(food), date(2026, 1, 2), dec!(-40));

    let d = EnvelopeAggregator::detail(&reader, owner, m(2026, 1), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(only(&d).available, dec!(100));
}
