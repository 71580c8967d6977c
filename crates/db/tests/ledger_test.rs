//! Integration tests for the snapshot reader, balance reconciliation and
//! period statistics.
//!
//! Requires a running PostgreSQL; run with `cargo test -- --ignored`.

#![allow(clippy::unwrap_used)]

mod common;

use rust_decimal_macros::dec;
use tally_core::budget::{AllocationManager, CreateAllocationInput};
use tally_core::reconcile::BalanceReconciler;
use tally_core::statistics::StatisticsService;
use tally_core::store::{AmountFilter, LedgerReader};
use tally_core::{BudgetError, BudgetMonth, Caller};
use tally_db::entities::sea_orm_active_enums::BillFrequency;
use tally_db::repositories::{
    BillError, BillRepository, CreateBillInput, MarkPaidInput, RecordPaymentInput,
    TransactionRepository, UpdateBillInput,
};
use tally_db::{BudgetRepository, LedgerSnapshot};
use tally_shared::types::{CategoryId, UserId};
use tokio_util::sync::CancellationToken;

use common::{connect, date, new_account, new_category, new_user, post};

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_reconcile_reserves_budgets_and_open_bills() {
    let db = connect().await;
    let owner = new_user(&db).await;
    let user = UserId::from_uuid(owner);
    let caller = Caller::user(user);
    let account = new_account(&db, owner, "Checking").await;
    let utilities = new_category(&db, owner, "Utilities").await;

    post(&db, owner, account.id, None, dec!(2000), date(2026, 3, 1), "Salary").await;

    AllocationManager::new(BudgetRepository::new(db.clone()))
        .create(
            &caller,
            CreateAllocationInput {
                category_id: CategoryId::from_uuid(utilities.id),
                year: 2026,
                month: 3,
                assigned: dec!(500),
            },
        )
        .await
        .unwrap();

    let bills = BillRepository::new(db.clone());
    let power = bills
        .create_bill(
            owner,
            CreateBillInput {
                name: "Power".to_string(),
                category_id: Some(utilities.id),
                amount: dec!(120),
                day_due: Some(15),
                frequency: BillFrequency::Monthly,
            },
        )
        .await
        .unwrap();
    let march = BudgetMonth::new(2026, 3).unwrap();
    let instance = bills.open_instance(&caller, power.id, march, None).await.unwrap();
    bills
        .record_payment(
            &caller,
            instance.id,
            RecordPaymentInput { amount: dec!(25), transaction_id: None },
        )
        .await
        .unwrap();
    // An earlier month is not reserved.
    bills
        .open_instance(&caller, power.id, BudgetMonth::new(2026, 2).unwrap(), None)
        .await
        .unwrap();

    let snapshot = LedgerSnapshot::begin(&db).await.unwrap();
    let balance = BalanceReconciler::reconcile(&snapshot, user, march, &CancellationToken::new())
        .await
        .unwrap();
    snapshot.finish().await.unwrap();

    assert_eq!(balance.on_accounts, dec!(2000));
    assert_eq!(balance.reserved_budgets, dec!(500));
    assert_eq!(balance.reserved_bills, dec!(95));
    assert_eq!(balance.total_reserved, dec!(595));
    assert_eq!(balance.free_to_distribute, dec!(1405));

    bills
        .update_bill(
            &caller,
            power.id,
            UpdateBillInput { is_active: Some(false), ..UpdateBillInput::default() },
        )
        .await
        .unwrap();
    let service = StatisticsService::new(BudgetRepository::new(db.clone()));
    let balance = service
        .balance(&caller, Some(march), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(balance.reserved_bills, dec!(0));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_duplicate_bill_instance_rejected() {
    let db = connect().await;
    let owner = new_user(&db).await;
    let caller = Caller::user(UserId::from_uuid(owner));
    let bills = BillRepository::new(db.clone());
    let bill = bills
        .create_bill(
            owner,
            CreateBillInput {
                name: "Internet".to_string(),
                category_id: None,
                amount: dec!(40),
                day_due: None,
                frequency: BillFrequency::Monthly,
            },
        )
        .await
        .unwrap();
    let month = BudgetMonth::new(2026, 8).unwrap();

    bills.open_instance(&caller, bill.id, month, None).await.unwrap();
    let err = bills.open_instance(&caller, bill.id, month, None).await.unwrap_err();
    assert!(matches!(
        err,
        BillError::InstanceExists { period, .. } if period == month
    ));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_snapshot_sums_respect_month_and_owner() {
    let db = connect().await;
    let owner = new_user(&db).await;
    let other = new_user(&db).await;
    let account = new_account(&db, owner, "Wallet").await;
    let other_account = new_account(&db, other, "Wallet").await;
    let food = new_category(&db, owner, "Food").await;

    post(&db, owner, account.id, Some(food.id), dec!(-10), date(2026, 4, 30), "Lunch").await;
    post(&db, owner, account.id, Some(food.id), dec!(-15), date(2026, 5, 1), "Dinner").await;
    post(&db, other, other_account.id, None, dec!(999), date(2026, 5, 2), "Not mine").await;

    let snapshot = LedgerSnapshot::begin(&db).await.unwrap();
    let user = UserId::from_uuid(owner);
    let may = BudgetMonth::new(2026, 5).unwrap();

    let everything = snapshot.sum_amounts(user, &AmountFilter::all()).await.unwrap();
    let in_may = snapshot
        .sum_amounts(user, &AmountFilter::all().category(CategoryId::from_uuid(food.id)).within(may))
        .await
        .unwrap();
    snapshot.finish().await.unwrap();

    assert_eq!(everything, dec!(-25));
    assert_eq!(in_may, dec!(-15));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_period_statistics_newest_first() {
    let db = connect().await;
    let owner = new_user(&db).await;
    let caller = Caller::user(UserId::from_uuid(owner));
    let account = new_account(&db, owner, "Checking").await;

    post(&db, owner, account.id, None, dec!(1000), date(2026, 1, 5), "Pay").await;
    post(&db, owner, account.id, None, dec!(-250), date(2026, 1, 20), "Shop").await;
    post(&db, owner, account.id, None, dec!(-80), date(2026, 2, 3), "Fuel").await;

    let service = StatisticsService::new(BudgetRepository::new(db.clone()));
    let stats = service
        .periods(
            &caller,
            Some(BudgetMonth::new(2026, 1).unwrap()),
            Some(BudgetMonth::new(2026, 2).unwrap()),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].period, BudgetMonth::new(2026, 2).unwrap());
    assert_eq!(stats[0].expense, dec!(80));
    assert_eq!(stats[1].income, dec!(1000));
    assert_eq!(stats[1].balance, dec!(750));

    let foreign = new_category(&db, new_user(&db).await, "Theirs").await;
    let err = service
        .periods(
            &caller,
            None,
            None,
            Some(CategoryId::from_uuid(foreign.id)),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BudgetError::CategoryNotFound(_)));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_category_statistics_include_uncategorized() {
    let db = connect().await;
    let owner = new_user(&db).await;
    let caller = Caller::user(UserId::from_uuid(owner));
    let account = new_account(&db, owner, "Checking").await;
    let rent = new_category(&db, owner, "Rent").await;
    let food = new_category(&db, owner, "Food").await;

    post(&db, owner, account.id, None, dec!(3000), date(2026, 6, 1), "Pay").await;
    post(&db, owner, account.id, Some(rent.id), dec!(-900), date(2026, 6, 2), "Rent").await;
    post(&db, owner, account.id, Some(food.id), dec!(-64.20), date(2026, 7, 3), "Market").await;
    post(&db, owner, account.id, None, dec!(-5), date(2026, 7, 4), "Parking").await;

    let stats = StatisticsService::new(BudgetRepository::new(db.clone()))
        .categories(
            &caller,
            Some(BudgetMonth::new(2026, 6).unwrap()),
            Some(BudgetMonth::new(2026, 7).unwrap()),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let rows: Vec<_> = stats
        .iter()
        .map(|s| (s.period.month(), s.category_name.as_str(), s.income, s.expense))
        .collect();
    assert_eq!(
        rows,
        vec![
            (7, "Food", dec!(0), dec!(64.20)),
            (7, "Uncategorized", dec!(0), dec!(5)),
            (6, "Rent", dec!(0), dec!(900)),
            (6, "Uncategorized", dec!(3000), dec!(0)),
        ]
    );
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_mark_paid_posts_expense_and_tracks_window() {
    let db = connect().await;
    let owner = new_user(&db).await;
    let caller = Caller::user(UserId::from_uuid(owner));
    let account = new_account(&db, owner, "Checking").await;
    let utilities = new_category(&db, owner, "Utilities").await;
    let bills = BillRepository::new(db.clone());

    let water = bills
        .create_bill(
            owner,
            CreateBillInput {
                name: "Water".to_string(),
                category_id: Some(utilities.id),
                amount: dec!(90),
                day_due: None,
                frequency: BillFrequency::Quarterly,
            },
        )
        .await
        .unwrap();
    let april = BudgetMonth::new(2026, 4).unwrap();
    let instance = bills.open_instance(&caller, water.id, april, None).await.unwrap();

    let partial = bills
        .mark_paid(
            &caller,
            water.id,
            MarkPaidInput { account_id: account.id, amount: Some(dec!(30)), paid_on: date(2026, 4, 10) },
        )
        .await
        .unwrap();
    assert_eq!(partial.transaction.amount, dec!(-30));
    assert_eq!(partial.transaction.category_id, Some(utilities.id));
    assert_eq!(partial.transaction.recurring_bill_id, Some(water.id));
    assert_eq!(partial.transaction.bill_instance_id, Some(instance.id));
    assert_eq!(partial.instance.unwrap().amount_paid, dec!(30));
    assert_eq!(partial.remaining, dec!(60));

    let too_much = bills
        .mark_paid(
            &caller,
            water.id,
            MarkPaidInput { account_id: account.id, amount: Some(dec!(61)), paid_on: date(2026, 5, 2) },
        )
        .await
        .unwrap_err();
    assert!(matches!(too_much, BillError::ExceedsRemaining { remaining, .. } if remaining == dec!(60)));

    let status = bills.payment_statuses(owner, date(2026, 6, 30)).await.unwrap();
    assert_eq!(status[0].window_start, date(2026, 4, 1));
    assert_eq!(status[0].paid_amount, dec!(30));
    assert!(!status[0].is_paid);

    // No May instance is open, so the rest is linked to the bill only.
    let rest = bills
        .mark_paid(
            &caller,
            water.id,
            MarkPaidInput { account_id: account.id, amount: None, paid_on: date(2026, 5, 2) },
        )
        .await
        .unwrap();
    assert_eq!(rest.transaction.amount, dec!(-60));
    assert!(rest.instance.is_none());
    assert_eq!(rest.remaining, dec!(0));

    let status = bills.payment_statuses(owner, date(2026, 5, 20)).await.unwrap();
    assert!(status[0].is_paid);
    assert_eq!(status[0].last_payment_id, Some(rest.transaction.id));

    let again = bills
        .mark_paid(
            &caller,
            water.id,
            MarkPaidInput { account_id: account.id, amount: None, paid_on: date(2026, 6, 1) },
        )
        .await
        .unwrap_err();
    assert!(matches!(again, BillError::AlreadyPaid { window_start, .. } if window_start == date(2026, 4, 1)));

    // A new quarter starts unpaid.
    let july = bills.payment_statuses(owner, date(2026, 7, 1)).await.unwrap();
    assert_eq!(july[0].paid_amount, dec!(0));
    assert_eq!(july[0].last_payment_id, None);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn test_bill_access_owner_or_admin() {
    let db = connect().await;
    let owner = new_user(&db).await;
    let account = new_account(&db, owner, "Checking").await;
    let stranger = Caller::user(UserId::from_uuid(new_user(&db).await));
    let admin = Caller::admin(UserId::from_uuid(new_user(&db).await));
    let bills = BillRepository::new(db.clone());

    let bill = bills
        .create_bill(
            owner,
            CreateBillInput {
                name: "Phone".to_string(),
                category_id: None,
                amount: dec!(25),
                day_due: Some(3),
                frequency: BillFrequency::Monthly,
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        bills.get_bill(&stranger, bill.id).await,
        Err(BillError::AccessDenied(_))
    ));
    assert!(matches!(
        bills.delete_bill(&stranger, bill.id).await,
        Err(BillError::AccessDenied(_))
    ));
    let renamed = bills
        .update_bill(
            &admin,
            bill.id,
            UpdateBillInput { name: Some("Mobile".to_string()), ..UpdateBillInput::default() },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Mobile");
    assert_eq!(renamed.user_id, owner);

    // The admin pays from the owner's account; the expense is the owner's.
    let payment = bills
        .mark_paid(
            &admin,
            bill.id,
            MarkPaidInput { account_id: account.id, amount: None, paid_on: date(2026, 9, 3) },
        )
        .await
        .unwrap();
    assert_eq!(payment.transaction.user_id, owner);

    bills.delete_bill(&admin, bill.id).await.unwrap();
    assert!(matches!(bills.get_bill(&admin, bill.id).await, Err(BillError::NotFound(_))));

    let kept = TransactionRepository::new(db.clone())
        .get_transaction(owner, payment.transaction.id)
        .await
        .unwrap();
    assert_eq!(kept.recurring_bill_id, None);
    assert_eq!(kept.amount, dec!(-25));
}
