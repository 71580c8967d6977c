//! Allocation manager: ownership-checked CRUD over budget allocations.

use rust_decimal::Decimal;
use tally_shared::types::{AllocationId, CategoryId, MONEY_SCALE, UserId, is_whole_cents};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::types::{Allocation, CreateAllocationInput, NewAllocation, UpdateAllocationInput};
use crate::auth::Caller;
use crate::envelope::{BudgetDetail, EnvelopeAggregator};
use crate::error::BudgetError;
use crate::period::BudgetMonth;
use crate::store::{AllocationStore, LedgerStore};

/// Ownership-checked access to budget allocations.
///
/// Access and existence are resolved here, before anything reaches the
/// aggregator.
pub struct AllocationManager<S> {
    store: S,
}

impl<S> AllocationManager<S>
where
    S: AllocationStore + LedgerStore,
{
    /// Creates a manager over `store`.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Assigns money to one of the caller's categories for a month.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a malformed period or an amount finer than cents
    /// - `CategoryNotFound` if the category is missing or not the caller's
    /// - `AlreadyExists` if the category already has an allocation that month
    pub async fn create(
        &self,
        caller: &Caller,
        input: CreateAllocationInput,
    ) -> Result<Allocation, BudgetError> {
        let period = BudgetMonth::from_parts(input.year, input.month)?;
        ensure_whole_cents(input.assigned)?;
        self.ensure_category_of(caller.user_id, input.category_id)
            .await?;
        self.ensure_key_free(caller.user_id, input.category_id, period, None)
            .await?;

        let allocation = self
            .store
            .insert(NewAllocation {
                owner: caller.user_id,
                category_id: input.category_id,
                period,
                assigned: input.assigned,
            })
            .await?;

        info!(
            allocation_id = %allocation.id,
            owner_id = %allocation.owner,
            period = %period,
            "budget allocation created"
        );
        Ok(allocation)
    }

    /// Applies a partial update. The allocation may move to another
    /// category or month of the same owner.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the allocation does not exist
    /// - `AccessDenied` unless the caller owns it or is an admin
    /// - `InvalidInput`, `CategoryNotFound`, `AlreadyExists` as for `create`
    pub async fn update(
        &self,
        caller: &Caller,
        id: AllocationId,
        input: UpdateAllocationInput,
    ) -> Result<Allocation, BudgetError> {
        if let Some(assigned) = input.assigned {
            ensure_whole_cents(assigned)?;
        }
        let mut allocation = self.get(caller, id).await?;
        if input.is_empty() {
            return Ok(allocation);
        }

        let year = input.year.unwrap_or(allocation.period.year());
        let period = match input.month {
            Some(month) => BudgetMonth::from_parts(year, month)?,
            None => BudgetMonth::new(year, allocation.period.month())?,
        };
        let category_id = input.category_id.unwrap_or(allocation.category_id);

        if category_id != allocation.category_id {
            self.ensure_category_of(allocation.owner, category_id)
                .await?;
        }
        if category_id != allocation.category_id || period != allocation.period {
            self.ensure_key_free(allocation.owner, category_id, period, Some(id))
                .await?;
        }

        allocation.category_id = category_id;
        allocation.period = period;
        if let Some(assigned) = input.assigned {
            allocation.assigned = assigned;
        }

        let updated = self
            .store
            .update(&allocation)
            .await?
            .ok_or(BudgetError::NotFound(id.0))?;

        info!(allocation_id = %id, period = %period, "budget allocation updated");
        Ok(updated)
    }

    /// Deletes an allocation.
    ///
    /// # Errors
    ///
    /// `NotFound` or `AccessDenied` as for `update`.
    pub async fn delete(&self, caller: &Caller, id: AllocationId) -> Result<(), BudgetError> {
        self.get(caller, id).await?;
        if !self.store.delete(id).await? {
            return Err(BudgetError::NotFound(id.0));
        }
        info!(allocation_id = %id, "budget allocation deleted");
        Ok(())
    }

    /// Fetches one allocation.
    ///
    /// # Errors
    ///
    /// `NotFound` or `AccessDenied`.
    pub async fn get(&self, caller: &Caller, id: AllocationId) -> Result<Allocation, BudgetError> {
        let allocation = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(BudgetError::NotFound(id.0))?;

        if let Err(err) = caller.ensure_can_access(allocation.owner) {
            warn!(allocation_id = %id, caller_id = %caller.user_id, "allocation access denied");
            return Err(err);
        }
        Ok(allocation)
    }

    /// Every allocation of the caller, newest month first.
    ///
    /// # Errors
    ///
    /// `StorageFailure`.
    pub async fn list(&self, caller: &Caller) -> Result<Vec<Allocation>, BudgetError> {
        Ok(self.store.list_by_owner(caller.user_id).await?)
    }

    /// The caller's allocations in one month.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a malformed period, `StorageFailure`.
    pub async fn list_by_period(
        &self,
        caller: &Caller,
        year: i32,
        month: i32,
    ) -> Result<Vec<Allocation>, BudgetError> {
        let period = BudgetMonth::from_parts(year, month)?;
        Ok(self.store.list_by_period(caller.user_id, period).await?)
    }

    /// Per-category assigned/spent/carried-over/available for the caller in
    /// one month, plus the amount still to be budgeted.
    ///
    /// # Errors
    ///
    /// `InvalidInput`, `StorageFailure`, or `Cancelled` when `cancel` fires
    /// mid-aggregation.
    pub async fn get_detailed_by_period(
        &self,
        caller: &Caller,
        year: i32,
        month: i32,
        cancel: &CancellationToken,
    ) -> Result<BudgetDetail, BudgetError> {
        let period = BudgetMonth::from_parts(year, month)?;
        let reader = self.store.begin_read().await?;
        EnvelopeAggregator::detail(&reader, caller.user_id, period, cancel).await
    }

    async fn ensure_category_of(
        &self,
        owner: UserId,
        category: CategoryId,
    ) -> Result<(), BudgetError> {
        match self.store.category_owner(category).await? {
            Some(found) if found == owner => Ok(()),
            _ => Err(BudgetError::CategoryNotFound(category.0)),
        }
    }

    async fn ensure_key_free(
        &self,
        owner: UserId,
        category: CategoryId,
        period: BudgetMonth,
        except: Option<AllocationId>,
    ) -> Result<(), BudgetError> {
        match self.store.find_by_key(owner, category, period).await? {
            Some(existing) if Some(existing.id) != except => Err(BudgetError::AlreadyExists {
                category_id: category.0,
                year: period.year(),
                month: period.month(),
            }),
            _ => Ok(()),
        }
    }
}

fn ensure_whole_cents(amount: Decimal) -> Result<(), BudgetError> {
    if is_whole_cents(amount) {
        Ok(())
    } else {
        Err(BudgetError::InvalidInput(format!(
            "amount {amount} has more than {MONEY_SCALE} decimal places"
        )))
    }
}
