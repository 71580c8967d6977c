//! Allocation manager tests against the in-memory store.

use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_shared::types::{AllocationId, CategoryId, UserId};
use tokio_util::sync::CancellationToken;

use super::service::AllocationManager;
use super::types::{CreateAllocationInput, UpdateAllocationInput};
use crate::auth::Caller;
use crate::error::BudgetError;
use crate::period::BudgetMonth;
use crate::testing::MemoryLedger;

struct Fixture {
    ledger: MemoryLedger,
    manager: AllocationManager<MemoryLedger>,
    owner: Caller,
    groceries: CategoryId,
}

fn fixture() -> Fixture {
    let ledger = MemoryLedger::default();
    let owner = Caller::user(UserId::new());
    let groceries = ledger.add_category(owner.user_id, "Groceries");
    Fixture {
        manager: AllocationManager::new(ledger.clone()),
        ledger,
        owner,
        groceries,
    }
}

fn input(category_id: CategoryId, year: i32, month: i32, assigned: Decimal) -> CreateAllocationInput {
    CreateAllocationInput {
        category_id,
        year,
        month,
        assigned,
    }
}

#[tokio::test]
async fn test_create_and_get() {
    let f = fixture();
    let created = f
        .manager
        .create(&f.owner, input(f.groceries, 2026, 1, dec!(500.00)))
        .await
        .unwrap();

    assert_eq!(created.owner, f.owner.user_id);
    assert_eq!(created.period, BudgetMonth::new(2026, 1).unwrap());
    assert_eq!(created.assigned, dec!(500.00));

    let fetched = f.manager.get(&f.owner, created.id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_duplicate_rejected() {
    let f = fixture();
    f.manager
        .create(&f.owner, input(f.groceries, 2026, 1, dec!(500.00)))
        .await
        .unwrap();

    let second = f
        .manager
        .create(&f.owner, input(f.groceries, 2026, 1, dec!(20.00)))
        .await;

    assert!(matches!(
        second,
        Err(BudgetError::AlreadyExists {
            year: 2026,
            month: 1,
            ..
        })
    ));
    assert_eq!(f.manager.list(&f.owner).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_same_category_other_month_allowed() {
    let f = fixture();
    f.manager
        .create(&f.owner, input(f.groceries, 2026, 1, dec!(500.00)))
        .await
        .unwrap();
    f.manager
        .create(&f.owner, input(f.groceries, 2026, 2, dec!(500.00)))
        .await
        .unwrap();

    let listed = f.manager.list(&f.owner).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].period, BudgetMonth::new(2026, 2).unwrap());
}

#[rstest]
#[case(0)]
#[case(13)]
#[case(-3)]
#[tokio::test]
async fn test_create_rejects_bad_month(#[case] month: i32) {
    let f = fixture();
    let result = f
        .manager
        .create(&f.owner, input(f.groceries, 2026, month, dec!(1)))
        .await;
    assert!(matches!(result, Err(BudgetError::InvalidInput(_))));
}

#[tokio::test]
async fn test_sub_cent_amounts_rejected() {
    let f = fixture();
    let result = f
        .manager
        .create(&f.owner, input(f.groceries, 2026, 1, dec!(100.005)))
        .await;
    assert!(matches!(result, Err(BudgetError::InvalidInput(_))));
    assert!(f.manager.list(&f.owner).await.unwrap().is_empty());

    let created = f
        .manager
        .create(&f.owner, input(f.groceries, 2026, 1, dec!(100.500)))
        .await
        .unwrap();
    let update = f
        .manager
        .update(
            &f.owner,
            created.id,
            UpdateAllocationInput {
                assigned: Some(dec!(0.001)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(update, Err(BudgetError::InvalidInput(_))));
    assert_eq!(
        f.manager.get(&f.owner, created.id).await.unwrap().assigned,
        dec!(100.50)
    );
}

#[tokio::test]
async fn test_create_in_foreign_category_is_not_found() {
    let f = fixture();
    let stranger = Caller::user(UserId::new());

    let result = f
        .manager
        .create(&stranger, input(f.groceries, 2026, 1, dec!(1)))
        .await;
    assert!(matches!(result, Err(BudgetError::CategoryNotFound(_))));

    let missing = f
        .manager
        .create(&f.owner, input(CategoryId::new(), 2026, 1, dec!(1)))
        .await;
    assert!(matches!(missing, Err(BudgetError::CategoryNotFound(_))));
}

#[tokio::test]
async fn test_update_amount() {
    let f = fixture();
    let created = f
        .manager
        .create(&f.owner, input(f.groceries, 2026, 1, dec!(500.00)))
        .await
        .unwrap();

    let updated = f
        .manager
        .update(
            &f.owner,
            created.id,
            UpdateAllocationInput {
                assigned: Some(dec!(450.00)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.assigned, dec!(450.00));
    assert_eq!(updated.period, created.period);
    assert_eq!(updated.category_id, created.category_id);
}

#[tokio::test]
async fn test_update_moves_month_and_rechecks_uniqueness() {
    let f = fixture();
    let jan = f
        .manager
        .create(&f.owner, input(f.groceries, 2026, 1, dec!(100)))
        .await
        .unwrap();
    f.manager
        .create(&f.owner, input(f.groceries, 2026, 2, dec!(200)))
        .await
        .unwrap();

    let collide = f
        .manager
        .update(
            &f.owner,
            jan.id,
            UpdateAllocationInput {
                month: Some(2),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(collide, Err(BudgetError::AlreadyExists { .. })));

    let moved = f
        .manager
        .update(
            &f.owner,
            jan.id,
            UpdateAllocationInput {
                year: Some(2025),
                month: Some(12),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.period, BudgetMonth::new(2025, 12).unwrap());

    // Re-saving onto its own key is not a conflict.
    let same = f
        .manager
        .update(
            &f.owner,
            jan.id,
            UpdateAllocationInput {
                year: Some(2025),
                assigned: Some(dec!(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(same.assigned, dec!(1));
}

#[tokio::test]
async fn test_update_moves_category_of_owner_only() {
    let f = fixture();
    let dining = f.ledger.add_category(f.owner.user_id, "Dining");
    let foreign = f.ledger.add_category(UserId::new(), "Foreign");
    let created = f
        .manager
        .create(&f.owner, input(f.groceries, 2026, 1, dec!(100)))
        .await
        .unwrap();

    let rejected = f
        .manager
        .update(
            &f.owner,
            created.id,
            UpdateAllocationInput {
                category_id: Some(foreign),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(rejected, Err(BudgetError::CategoryNotFound(_))));

    let moved = f
        .manager
        .update(
            &f.owner,
            created.id,
            UpdateAllocationInput {
                category_id: Some(dining),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.category_id, dining);
}

#[tokio::test]
async fn test_stranger_denied_admin_allowed() {
    let f = fixture();
    let created = f
        .manager
        .create(&f.owner, input(f.groceries, 2026, 1, dec!(100)))
        .await
        .unwrap();
    let stranger = Caller::user(UserId::new());
    let admin = Caller::admin(UserId::new());

    assert!(matches!(
        f.manager.get(&stranger, created.id).await,
        Err(BudgetError::AccessDenied)
    ));
    assert!(matches!(
        f.manager
            .update(&stranger, created.id, UpdateAllocationInput {
                assigned: Some(dec!(0)),
                ..Default::default()
            })
            .await,
        Err(BudgetError::AccessDenied)
    ));
    assert!(matches!(
        f.manager.delete(&stranger, created.id).await,
        Err(BudgetError::AccessDenied)
    ));

    let by_admin = f
        .manager
        .update(&admin, created.id, UpdateAllocationInput {
            assigned: Some(dec!(42)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_admin.assigned, dec!(42));
    assert_eq!(by_admin.owner, f.owner.user_id);

    f.manager.delete(&admin, created.id).await.unwrap();
}

#[tokio::test]
async fn test_missing_allocation_not_found() {
    let f = fixture();
    let id = AllocationId::new();

    assert!(matches!(
        f.manager.get(&f.owner, id).await,
        Err(BudgetError::NotFound(_))
    ));
    assert!(matches!(
        f.manager.delete(&f.owner, id).await,
        Err(BudgetError::NotFound(_))
    ));
    assert!(matches!(
        f.manager
            .update(&f.owner, id, UpdateAllocationInput::default())
            .await,
        Err(BudgetError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_then_recreate() {
    let f = fixture();
    let created = f
        .manager
        .create(&f.owner, input(f.groceries, 2026, 1, dec!(100)))
        .await
        .unwrap();

    f.manager.delete(&f.owner, created.id).await.unwrap();
    assert!(matches!(
        f.manager.get(&f.owner, created.id).await,
        Err(BudgetError::NotFound(_))
    ));

    f.manager
        .create(&f.owner, input(f.groceries, 2026, 1, dec!(100)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_list_by_period_filters_owner_and_month() {
    let f = fixture();
    let other = Caller::user(UserId::new());
    let theirs = f.ledger.add_category(other.user_id, "Groceries");

    f.manager
        .create(&f.owner, input(f.groceries, 2026, 1, dec!(1)))
        .await
        .unwrap();
    f.manager
        .create(&f.owner, input(f.groceries, 2026, 2, dec!(2)))
        .await
        .unwrap();
    f.manager
        .create(&other, input(theirs, 2026, 1, dec!(3)))
        .await
        .unwrap();

    let jan = f.manager.list_by_period(&f.owner, 2026, 1).await.unwrap();
    assert_eq!(jan.len(), 1);
    assert_eq!(jan[0].assigned, dec!(1));

    assert!(matches!(
        f.manager.list_by_period(&f.owner, 2026, 14).await,
        Err(BudgetError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_detailed_by_period_flows_through_allocations() {
    let f = fixture();
    f.manager
        .create(&f.owner, input(f.groceries, 2026, 1, dec!(500.00)))
        .await
        .unwrap();
    f.manager
        .create(&f.owner, input(f.groceries, 2026, 2, dec!(500.00)))
        .await
        .unwrap();
    f.ledger.add_transaction(
        f.owner.user_id,
        Some(f.groceries),
        chrono::NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
        dec!(-320.00),
    );

    let detail = f
        .manager
        .get_detailed_by_period(&f.owner, 2026, 2, &CancellationToken::new())
        .await
        .unwrap();

    let groceries = &detail.categories[0];
    assert_eq!(groceries.carried_over, dec!(180.00));
    assert_eq!(groceries.available, dec!(680.00));
    assert_eq!(detail.to_be_budgeted, dec!(-320.00) - dec!(500.00));
}

#[tokio::test]
async fn test_storage_failure_surfaces() {
    let f = fixture();
    f.ledger.break_storage();

    let result = f.manager.list(&f.owner).await;
    assert!(matches!(result, Err(BudgetError::StorageFailure(_))));
}
