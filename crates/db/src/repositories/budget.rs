//! Budget allocation repository.
//!
//! Implements the core allocation store and opens ledger snapshots for the
//! aggregator.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use tally_core::BudgetMonth;
use tally_core::budget::{Allocation, NewAllocation};
use tally_core::store::{AllocationStore, LedgerStore, StoreError};
use tally_shared::types::{AllocationId, CategoryId, UserId};
use tracing::warn;
use uuid::Uuid;

use crate::entities::{budget_allocations, categories};
use crate::snapshot::{LedgerSnapshot, store_failure, stored_month};

/// Budget allocation repository.
#[derive(Debug, Clone)]
pub struct BudgetRepository {
    db: DatabaseConnection,
}

impl BudgetRepository {
    /// Creates a new budget repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Converts a row into the domain type.
fn to_allocation(row: budget_allocations::Model) -> Result<Allocation, StoreError> {
    Ok(Allocation {
        id: AllocationId::from_uuid(row.id),
        owner: UserId::from_uuid(row.user_id),
        category_id: CategoryId::from_uuid(row.category_id),
        period: stored_month(row.year, row.month)?,
        assigned: row.assigned,
        created_at: row.created_at.with_timezone(&Utc),
        updated_at: row.updated_at.with_timezone(&Utc),
    })
}

/// Maps a unique violation on the period key to `Duplicate`.
fn write_failure(err: DbErr, category: CategoryId, period: BudgetMonth) -> StoreError {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        warn!(category_id = %category, period = %period, "duplicate budget allocation rejected by database");
        StoreError::Duplicate {
            category_id: category.0,
            year: period.year(),
            month: period.month(),
        }
    } else {
        store_failure(err)
    }
}

#[async_trait]
impl LedgerStore for BudgetRepository {
    type Reader = LedgerSnapshot;

    async fn begin_read(&self) -> Result<LedgerSnapshot, StoreError> {
        LedgerSnapshot::begin(&self.db).await.map_err(store_failure)
    }
}

#[async_trait]
impl AllocationStore for BudgetRepository {
    async fn insert(&self, new: NewAllocation) -> Result<Allocation, StoreError> {
        let txn = self.db.begin().await.map_err(store_failure)?;

        let now = Utc::now().into();
        let row = budget_allocations::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(new.owner.0),
            category_id: Set(new.category_id.0),
            year: Set(new.period.year()),
            month: Set(new.period.month_number()),
            assigned: Set(new.assigned),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| write_failure(e, new.category_id, new.period))?;

        txn.commit().await.map_err(store_failure)?;
        to_allocation(row)
    }

    async fn update(&self, allocation: &Allocation) -> Result<Option<Allocation>, StoreError> {
        let txn = self.db.begin().await.map_err(store_failure)?;

        let Some(existing) = budget_allocations::Entity::find_by_id(allocation.id.0)
            .one(&txn)
            .await
            .map_err(store_failure)?
        else {
            return Ok(None);
        };

        let mut active: budget_allocations::ActiveModel = existing.into();
        active.category_id = Set(allocation.category_id.0);
        active.year = Set(allocation.period.year());
        active.month = Set(allocation.period.month_number());
        active.assigned = Set(allocation.assigned);
        active.updated_at = Set(Utc::now().into());

        let row = active
            .update(&txn)
            .await
            .map_err(|e| write_failure(e, allocation.category_id, allocation.period))?;

        txn.commit().await.map_err(store_failure)?;
        to_allocation(row).map(Some)
    }

    async fn delete(&self, id: AllocationId) -> Result<bool, StoreError> {
        let txn = self.db.begin().await.map_err(store_failure)?;
        let result = budget_allocations::Entity::delete_by_id(id.0)
            .exec(&txn)
            .await
            .map_err(store_failure)?;
        txn.commit().await.map_err(store_failure)?;
        Ok(result.rows_affected > 0)
    }

    async fn find_by_id(&self, id: AllocationId) -> Result<Option<Allocation>, StoreError> {
        budget_allocations::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(store_failure)?
            .map(to_allocation)
            .transpose()
    }

    async fn find_by_key(
        &self,
        owner: UserId,
        category: CategoryId,
        month: BudgetMonth,
    ) -> Result<Option<Allocation>, StoreError> {
        budget_allocations::Entity::find()
            .filter(budget_allocations::Column::UserId.eq(owner.0))
            .filter(budget_allocations::Column::CategoryId.eq(category.0))
            .filter(budget_allocations::Column::Year.eq(month.year()))
            .filter(budget_allocations::Column::Month.eq(month.month_number()))
            .one(&self.db)
            .await
            .map_err(store_failure)?
            .map(to_allocation)
            .transpose()
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Allocation>, StoreError> {
        budget_allocations::Entity::find()
            .filter(budget_allocations::Column::UserId.eq(owner.0))
            .order_by_desc(budget_allocations::Column::Year)
            .order_by_desc(budget_allocations::Column::Month)
            .order_by_asc(budget_allocations::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(store_failure)?
            .into_iter()
            .map(to_allocation)
            .collect()
    }

    async fn list_by_period(
        &self,
        owner: UserId,
        month: BudgetMonth,
    ) -> Result<Vec<Allocation>, StoreError> {
        budget_allocations::Entity::find()
            .filter(budget_allocations::Column::UserId.eq(owner.0))
            .filter(budget_allocations::Column::Year.eq(month.year()))
            .filter(budget_allocations::Column::Month.eq(month.month_number()))
            .order_by_asc(budget_allocations::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(store_failure)?
            .into_iter()
            .map(to_allocation)
            .collect()
    }

    async fn category_owner(&self, category: CategoryId) -> Result<Option<UserId>, StoreError> {
        Ok(categories::Entity::find_by_id(category.0)
            .one(&self.db)
            .await
            .map_err(store_failure)?
            .map(|c| UserId::from_uuid(c.user_id)))
    }
}
