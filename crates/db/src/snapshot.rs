//! Read-only ledger snapshots.
//!
//! Every query of one aggregation must observe the same committed state, so
//! the aggregator reads through a single `REPEATABLE READ, READ ONLY`
//! transaction.
//!
//! # Usage
//!
//! ```ignore
//! use tally_db::LedgerSnapshot;
//!
//! let snapshot = LedgerSnapshot::begin(&db).await?;
//! let detail = EnvelopeAggregator::detail(&snapshot, owner, month, &cancel).await?;
//! snapshot.finish().await?;
//! ```

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    AccessMode, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, FromQueryResult, IsolationLevel, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use tally_core::BudgetMonth;
use tally_core::store::{
    AllocationFact, AmountFilter, CategoryInfo, CategoryScope, FlowDirection, LedgerReader,
    MonthlyOutflow, OutstandingBill, StoreError,
};
use tally_shared::types::{BillInstanceId, CategoryId, RecurringBillId, UserId};
use uuid::Uuid;

use crate::entities::{bill_instances, budget_allocations, categories, recurring_bills, transactions};

const YEAR_OF_OCCURRENCE: &str = "EXTRACT(YEAR FROM occurred_on)";
const MONTH_OF_OCCURRENCE: &str = "EXTRACT(MONTH FROM occurred_on)";

/// Wraps a database error for the core store contract.
pub(crate) fn store_failure(err: DbErr) -> StoreError {
    StoreError::Failure(err.to_string())
}

/// Rows with `(year, month)` at or before `month`.
pub(crate) fn through_month<Y, M>(year: Y, month_col: M, month: BudgetMonth) -> Condition
where
    Y: ColumnTrait,
    M: ColumnTrait,
{
    Condition::any().add(year.lt(month.year())).add(
        Condition::all()
            .add(year.eq(month.year()))
            .add(month_col.lte(month.month_number())),
    )
}

/// Rows with `(year, month)` at or after `month`.
pub(crate) fn from_month<Y, M>(year: Y, month_col: M, month: BudgetMonth) -> Condition
where
    Y: ColumnTrait,
    M: ColumnTrait,
{
    Condition::any().add(year.gt(month.year())).add(
        Condition::all()
            .add(year.eq(month.year()))
            .add(month_col.gte(month.month_number())),
    )
}

/// Converts stored `(year, month)` columns back into a [`BudgetMonth`].
pub(crate) fn stored_month(year: i32, month: i32) -> Result<BudgetMonth, StoreError> {
    BudgetMonth::from_parts(year, month).map_err(|e| StoreError::Failure(e.to_string()))
}

/// A consistent, read-only view of the ledger.
pub struct LedgerSnapshot {
    txn: DatabaseTransaction,
}

impl LedgerSnapshot {
    /// Opens a `REPEATABLE READ, READ ONLY` transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    pub async fn begin(db: &DatabaseConnection) -> Result<Self, DbErr> {
        let txn = db
            .begin_with_config(
                Some(IsolationLevel::RepeatableRead),
                Some(AccessMode::ReadOnly),
            )
            .await?;
        Ok(Self { txn })
    }

    /// Ends the snapshot. Dropping it without calling this rolls back, which
    /// is equivalent for a read-only transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn finish(self) -> Result<(), DbErr> {
        self.txn.commit().await
    }
}

#[derive(Debug, FromQueryResult)]
struct OutflowRow {
    category_id: Uuid,
    year: i32,
    month: i32,
    spent: Decimal,
}

#[async_trait]
impl LedgerReader for LedgerSnapshot {
    async fn categories(&self, owner: UserId) -> Result<Vec<CategoryInfo>, StoreError> {
        let rows = categories::Entity::find()
            .filter(categories::Column::UserId.eq(owner.0))
            .order_by_asc(categories::Column::Name)
            .all(&self.txn)
            .await
            .map_err(store_failure)?;

        Ok(rows
            .into_iter()
            .map(|c| CategoryInfo {
                id: CategoryId::from_uuid(c.id),
                name: c.name,
                group_name: c.group_name,
            })
            .collect())
    }

    async fn sum_amounts(
        &self,
        owner: UserId,
        filter: &AmountFilter,
    ) -> Result<Decimal, StoreError> {
        let mut query = transactions::Entity::find()
            .select_only()
            .column_as(Expr::col(transactions::Column::Amount).sum(), "total")
            .filter(transactions::Column::UserId.eq(owner.0));

        match filter.category {
            CategoryScope::Any => {}
            CategoryScope::Only(category) => {
                query = query.filter(transactions::Column::CategoryId.eq(category.0));
            }
            CategoryScope::Uncategorized => {
                query = query.filter(transactions::Column::CategoryId.is_null());
            }
        }
        if let Some((start, end)) = filter.range {
            query = query
                .filter(transactions::Column::OccurredOn.gte(start))
                .filter(transactions::Column::OccurredOn.lt(end));
        }
        match filter.direction {
            Some(FlowDirection::Inflow) => {
                query = query.filter(transactions::Column::Amount.gt(Decimal::ZERO));
            }
            Some(FlowDirection::Outflow) => {
                query = query.filter(transactions::Column::Amount.lt(Decimal::ZERO));
            }
            None => {}
        }

        let total: Option<Option<Decimal>> = query
            .into_tuple()
            .one(&self.txn)
            .await
            .map_err(store_failure)?;
        Ok(total.flatten().unwrap_or(Decimal::ZERO))
    }

    async fn monthly_outflows(
        &self,
        owner: UserId,
        through: BudgetMonth,
    ) -> Result<Vec<MonthlyOutflow>, StoreError> {
        let rows = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::CategoryId)
            .column_as(
                Expr::cust(format!("CAST({YEAR_OF_OCCURRENCE} AS INTEGER)")),
                "year",
            )
            .column_as(
                Expr::cust(format!("CAST({MONTH_OF_OCCURRENCE} AS INTEGER)")),
                "month",
            )
            .column_as(Expr::cust("-SUM(amount)"), "spent")
            .filter(transactions::Column::UserId.eq(owner.0))
            .filter(transactions::Column::CategoryId.is_not_null())
            .filter(transactions::Column::Amount.lt(Decimal::ZERO))
            .filter(transactions::Column::OccurredOn.lt(through.end_exclusive()))
            .group_by(transactions::Column::CategoryId)
            .group_by(Expr::cust(YEAR_OF_OCCURRENCE))
            .group_by(Expr::cust(MONTH_OF_OCCURRENCE))
            .into_model::<OutflowRow>()
            .all(&self.txn)
            .await
            .map_err(store_failure)?;

        rows.into_iter()
            .map(|row| {
                Ok(MonthlyOutflow {
                    category_id: CategoryId::from_uuid(row.category_id),
                    month: stored_month(row.year, row.month)?,
                    spent: row.spent,
                })
            })
            .collect()
    }

    async fn allocations_through(
        &self,
        owner: UserId,
        through: BudgetMonth,
    ) -> Result<Vec<AllocationFact>, StoreError> {
        let rows = budget_allocations::Entity::find()
            .filter(budget_allocations::Column::UserId.eq(owner.0))
            .filter(through_month(
                budget_allocations::Column::Year,
                budget_allocations::Column::Month,
                through,
            ))
            .all(&self.txn)
            .await
            .map_err(store_failure)?;

        rows.into_iter()
            .map(|row| {
                Ok(AllocationFact {
                    category_id: CategoryId::from_uuid(row.category_id),
                    month: stored_month(row.year, row.month)?,
                    assigned: row.assigned,
                })
            })
            .collect()
    }

    async fn assigned_total(
        &self,
        owner: UserId,
        month: BudgetMonth,
    ) -> Result<Decimal, StoreError> {
        let total: Option<Option<Decimal>> = budget_allocations::Entity::find()
            .select_only()
            .column_as(Expr::col(budget_allocations::Column::Assigned).sum(), "total")
            .filter(budget_allocations::Column::UserId.eq(owner.0))
            .filter(budget_allocations::Column::Year.eq(month.year()))
            .filter(budget_allocations::Column::Month.eq(month.month_number()))
            .into_tuple()
            .one(&self.txn)
            .await
            .map_err(store_failure)?;
        Ok(total.flatten().unwrap_or(Decimal::ZERO))
    }

    async fn outstanding_bills(
        &self,
        owner: UserId,
        from: BudgetMonth,
    ) -> Result<Vec<OutstandingBill>, StoreError> {
        let rows = bill_instances::Entity::find()
            .inner_join(recurring_bills::Entity)
            .filter(recurring_bills::Column::UserId.eq(owner.0))
            .filter(recurring_bills::Column::IsActive.eq(true))
            .filter(from_month(
                bill_instances::Column::Year,
                bill_instances::Column::Month,
                from,
            ))
            .all(&self.txn)
            .await
            .map_err(store_failure)?;

        rows.into_iter()
            .map(|row| {
                Ok(OutstandingBill {
                    bill_id: RecurringBillId::from_uuid(row.recurring_bill_id),
                    instance_id: BillInstanceId::from_uuid(row.id),
                    month: stored_month(row.year, row.month)?,
                    expected: row.amount_expected,
                    paid: row.amount_paid,
                })
            })
            .collect()
    }
}
