//! In-memory store used by unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tally_shared::types::{AllocationId, BillInstanceId, CategoryId, RecurringBillId, UserId};

use crate::budget::types::{Allocation, NewAllocation};
use crate::period::BudgetMonth;
use crate::store::{
    AllocationFact, AllocationStore, AmountFilter, CategoryInfo, LedgerReader, LedgerStore,
    MonthlyOutflow, OutstandingBill, StoreError,
};

#[derive(Debug, Clone)]
struct Txn {
    owner: UserId,
    category: Option<CategoryId>,
    date: NaiveDate,
    amount: Decimal,
}

#[derive(Debug, Clone)]
struct Bill {
    owner: UserId,
    active: bool,
    instance: OutstandingBill,
}

#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    categories: Vec<(UserId, CategoryInfo)>,
    transactions: Vec<Txn>,
    allocations: Vec<Allocation>,
    bills: Vec<Bill>,
    failing: bool,
}

/// Shared in-memory ledger. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MemoryLedger {
    pub fn add_category(&self, owner: UserId, name: &str) -> CategoryId {
        let id = CategoryId::new();
        self.state.lock().unwrap().categories.push((
            owner,
            CategoryInfo {
                id,
                name: name.to_string(),
                group_name: None,
            },
        ));
        id
    }

    pub fn add_transaction(
        &self,
        owner: UserId,
        category: Option<CategoryId>,
        date: NaiveDate,
        amount: Decimal,
    ) {
        self.state.lock().unwrap().transactions.push(Txn {
            owner,
            category,
            date,
            amount,
        });
    }

    /// Inserts an allocation row directly, bypassing uniqueness checks.
    pub fn assign(&self, owner: UserId, category: CategoryId, period: BudgetMonth, assigned: Decimal) {
        let now = Utc::now();
        self.state.lock().unwrap().allocations.push(Allocation {
            id: AllocationId::new(),
            owner,
            category_id: category,
            period,
            assigned,
            created_at: now,
            updated_at: now,
        });
    }

    pub fn add_bill(
        &self,
        owner: UserId,
        month: BudgetMonth,
        expected: Decimal,
        paid: Decimal,
        active: bool,
    ) {
        self.state.lock().unwrap().bills.push(Bill {
            owner,
            active,
            instance: OutstandingBill {
                bill_id: RecurringBillId::new(),
                instance_id: BillInstanceId::new(),
                month,
                expected,
                paid,
            },
        });
    }

    /// Makes every subsequent store call fail.
    pub fn break_storage(&self) {
        self.state.lock().unwrap().failing = true;
    }

    fn with<T>(&self, f: impl FnOnce(&mut LedgerState) -> T) -> Result<T, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.failing {
            return Err(StoreError::Failure("storage unavailable".into()));
        }
        Ok(f(&mut state))
    }
}

/// Frozen copy of the ledger taken by `begin_read`.
#[derive(Debug, Clone)]
pub struct MemorySnapshot(pub LedgerState);

impl MemorySnapshot {
    fn check(&self) -> Result<&LedgerState, StoreError> {
        if self.0.failing {
            Err(StoreError::Failure("storage unavailable".into()))
        } else {
            Ok(&self.0)
        }
    }
}

#[async_trait]
impl LedgerReader for MemorySnapshot {
    async fn categories(&self, owner: UserId) -> Result<Vec<CategoryInfo>, StoreError> {
        Ok(self
            .check()?
            .categories
            .iter()
            .filter(|(o, _)| *o == owner)
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn sum_amounts(
        &self,
        owner: UserId,
        filter: &AmountFilter,
    ) -> Result<Decimal, StoreError> {
        Ok(self
            .check()?
            .transactions
            .iter()
            .filter(|t| t.owner == owner && filter.matches(t.category, t.date, t.amount))
            .map(|t| t.amount)
            .sum())
    }

    async fn monthly_outflows(
        &self,
        owner: UserId,
        through: BudgetMonth,
    ) -> Result<Vec<MonthlyOutflow>, StoreError> {
        Ok(self
            .check()?
            .transactions
            .iter()
            .filter(|t| t.owner == owner && t.amount < Decimal::ZERO && t.date < through.end_exclusive())
            .filter_map(|t| {
                t.category.map(|category_id| MonthlyOutflow {
                    category_id,
                    month: BudgetMonth::from_date(t.date),
                    spent: -t.amount,
                })
            })
            .collect())
    }

    async fn allocations_through(
        &self,
        owner: UserId,
        through: BudgetMonth,
    ) -> Result<Vec<AllocationFact>, StoreError> {
        Ok(self
            .check()?
            .allocations
            .iter()
            .filter(|a| a.owner == owner && a.period <= through)
            .map(|a| AllocationFact {
                category_id: a.category_id,
                month: a.period,
                assigned: a.assigned,
            })
            .collect())
    }

    async fn assigned_total(
        &self,
        owner: UserId,
        month: BudgetMonth,
    ) -> Result<Decimal, StoreError> {
        Ok(self
            .check()?
            .allocations
            .iter()
            .filter(|a| a.owner == owner && a.period == month)
            .map(|a| a.assigned)
            .sum())
    }

    async fn outstanding_bills(
        &self,
        owner: UserId,
        from: BudgetMonth,
    ) -> Result<Vec<OutstandingBill>, StoreError> {
        Ok(self
            .check()?
            .bills
            .iter()
            .filter(|b| b.owner == owner && b.active && b.instance.month >= from)
            .map(|b| b.instance)
            .collect())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    type Reader = MemorySnapshot;

    async fn begin_read(&self) -> Result<MemorySnapshot, StoreError> {
        self.with(|state| MemorySnapshot(state.clone()))
    }
}

#[async_trait]
impl AllocationStore for MemoryLedger {
    async fn insert(&self, new: NewAllocation) -> Result<Allocation, StoreError> {
        self.with(|state| {
            let taken = state.allocations.iter().any(|a| {
                a.owner == new.owner && a.category_id == new.category_id && a.period == new.period
            });
            if taken {
                return Err(StoreError::Duplicate {
                    category_id: new.category_id.0,
                    year: new.period.year(),
                    month: new.period.month(),
                });
            }
            let now = Utc::now();
            let allocation = Allocation {
                id: AllocationId::new(),
                owner: new.owner,
                category_id: new.category_id,
                period: new.period,
                assigned: new.assigned,
                created_at: now,
                updated_at: now,
            };
            state.allocations.push(allocation.clone());
            Ok(allocation)
        })?
    }

    async fn update(&self, allocation: &Allocation) -> Result<Option<Allocation>, StoreError> {
        self.with(|state| {
            state
                .allocations
                .iter_mut()
                .find(|a| a.id == allocation.id)
                .map(|stored| {
                    stored.category_id = allocation.category_id;
                    stored.period = allocation.period;
                    stored.assigned = allocation.assigned;
                    stored.updated_at = Utc::now();
                    stored.clone()
                })
        })
    }

    async fn delete(&self, id: AllocationId) -> Result<bool, StoreError> {
        self.with(|state| {
            let before = state.allocations.len();
            state.allocations.retain(|a| a.id != id);
            state.allocations.len() != before
        })
    }

    async fn find_by_id(&self, id: AllocationId) -> Result<Option<Allocation>, StoreError> {
        self.with(|state| state.allocations.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_key(
        &self,
        owner: UserId,
        category: CategoryId,
        month: BudgetMonth,
    ) -> Result<Option<Allocation>, StoreError> {
        self.with(|state| {
            state
                .allocations
                .iter()
                .find(|a| a.owner == owner && a.category_id == category && a.period == month)
                .cloned()
        })
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Allocation>, StoreError> {
        self.with(|state| {
            let mut rows: Vec<_> = state
                .allocations
                .iter()
                .filter(|a| a.owner == owner)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.period.cmp(&a.period));
            rows
        })
    }

    async fn list_by_period(
        &self,
        owner: UserId,
        month: BudgetMonth,
    ) -> Result<Vec<Allocation>, StoreError> {
        self.with(|state| {
            state
                .allocations
                .iter()
                .filter(|a| a.owner == owner && a.period == month)
                .cloned()
                .collect()
        })
    }

    async fn category_owner(&self, category: CategoryId) -> Result<Option<UserId>, StoreError> {
        self.with(|state| {
            state
                .categories
                .iter()
                .find(|(_, c)| c.id == category)
                .map(|(owner, _)| *owner)
        })
    }
}
