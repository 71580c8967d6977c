//! Recurring bills, their monthly instances and their payments.
//!
//! A recurring bill expects its amount once per frequency window (a day, an
//! ISO week, a calendar month or a calendar quarter). Payments are expense
//! transactions pointing at the bill; a window is paid once they cover the
//! bill's amount.
//!
//! Monthly instances track expected and paid amounts per month. Unpaid
//! remainders of active bills are what the balance reconciler reserves.
//!
//! Single-bill operations are open to the bill's owner and to admins.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde::Serialize;
use tally_core::{BudgetMonth, Caller};
use tally_shared::types::{UserId, is_whole_cents};
use tracing::info;
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::BillFrequency;
use crate::entities::{accounts, bill_instances, categories, recurring_bills, transactions};

/// Error types for bill operations.
#[derive(Debug, thiserror::Error)]
pub enum BillError {
    /// Recurring bill not found.
    #[error("Bill not found: {0}")]
    NotFound(Uuid),

    /// The bill belongs to someone else and the caller is not an admin.
    #[error("Access denied to bill {0}")]
    AccessDenied(Uuid),

    /// Bill instance not found.
    #[error("Bill instance not found: {0}")]
    InstanceNotFound(Uuid),

    /// Category not found.
    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    /// The bill already has an instance for that month.
    #[error("Bill {bill_id} already has an instance for {period}")]
    InstanceExists {
        /// The recurring bill.
        bill_id: Uuid,
        /// The month.
        period: BudgetMonth,
    },

    /// Name must not be blank.
    #[error("Bill name must not be empty")]
    EmptyName,

    /// Amounts must be positive.
    #[error("Amount must be positive")]
    InvalidAmount,

    /// Amount finer than whole cents.
    #[error("Amount {0} has more than two decimal places")]
    InvalidPrecision(Decimal),

    /// Due day outside 1..=31.
    #[error("Due day must be between 1 and 31")]
    InvalidDueDay,

    /// Nothing is left to pay in the window.
    #[error("Bill {bill_id} is already paid for the window starting {window_start}")]
    AlreadyPaid {
        /// The recurring bill.
        bill_id: Uuid,
        /// First day of the paid window.
        window_start: NaiveDate,
    },

    /// A payment larger than what is still expected in the window.
    #[error("Payment of {amount} exceeds the {remaining} still due on bill {bill_id}")]
    ExceedsRemaining {
        /// The recurring bill.
        bill_id: Uuid,
        /// Requested payment.
        amount: Decimal,
        /// Unpaid remainder of the window.
        remaining: Decimal,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a recurring bill.
#[derive(Debug, Clone)]
pub struct CreateBillInput {
    /// Display name.
    pub name: String,
    /// Envelope the bill is paid from.
    pub category_id: Option<Uuid>,
    /// Expected amount per window.
    pub amount: Decimal,
    /// Day of month the bill is due.
    pub day_due: Option<i32>,
    /// Length of the payment window.
    pub frequency: BillFrequency,
}

/// Partial update of a recurring bill. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct UpdateBillInput {
    /// New name.
    pub name: Option<String>,
    /// New category.
    pub category_id: Option<Option<Uuid>>,
    /// New expected amount.
    pub amount: Option<Decimal>,
    /// New due day.
    pub day_due: Option<Option<i32>>,
    /// New frequency.
    pub frequency: Option<BillFrequency>,
    /// Whether the bill still reserves money.
    pub is_active: Option<bool>,
}

/// Input for recording a payment against an instance.
#[derive(Debug, Clone)]
pub struct RecordPaymentInput {
    /// Amount paid; must be positive.
    pub amount: Decimal,
    /// Transaction that paid it, linked to the instance.
    pub transaction_id: Option<Uuid>,
}

/// Input for paying a bill from an account.
#[derive(Debug, Clone)]
pub struct MarkPaidInput {
    /// Account the money leaves.
    pub account_id: Uuid,
    /// Partial amount; `None` pays whatever is left in the window.
    pub amount: Option<Decimal>,
    /// Payment date, which also selects the window.
    pub paid_on: NaiveDate,
}

/// A bill with what has been paid in its current window.
#[derive(Debug, Clone, Serialize)]
pub struct BillPaymentStatus {
    /// The bill.
    #[serde(flatten)]
    pub bill: recurring_bills::Model,
    /// First day of the window.
    pub window_start: NaiveDate,
    /// First day after the window.
    pub window_end: NaiveDate,
    /// Σ payments posted in the window.
    pub paid_amount: Decimal,
    /// Payments cover the bill's amount.
    pub is_paid: bool,
    /// Latest payment in the window.
    pub last_payment_id: Option<Uuid>,
}

/// Result of paying a bill.
#[derive(Debug, Clone, Serialize)]
pub struct BillPayment {
    /// The expense transaction that was posted.
    pub transaction: transactions::Model,
    /// The month's instance, if one was open, with the payment added.
    pub instance: Option<bill_instances::Model>,
    /// What is still due in the window afterwards.
    pub remaining: Decimal,
}

/// Bill repository.
#[derive(Debug, Clone)]
pub struct BillRepository {
    db: DatabaseConnection,
}

impl BillRepository {
    /// Creates a new bill repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an active recurring bill for `owner`.
    ///
    /// # Errors
    ///
    /// `EmptyName`, `InvalidAmount`, `InvalidPrecision`, `InvalidDueDay`,
    /// `CategoryNotFound`, or a database error.
    pub async fn create_bill(
        &self,
        owner: Uuid,
        input: CreateBillInput,
    ) -> Result<recurring_bills::Model, BillError> {
        let name = valid_name(&input.name)?;
        ensure_positive_cents(input.amount)?;
        ensure_due_day(input.day_due)?;

        let txn = self.db.begin().await?;
        if let Some(category_id) = input.category_id {
            ensure_category(&txn, owner, category_id).await?;
        }

        let now = chrono::Utc::now().into();
        let bill = recurring_bills::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(owner),
            name: Set(name),
            category_id: Set(input.category_id),
            amount: Set(input.amount),
            day_due: Set(input.day_due),
            frequency: Set(input.frequency),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(bill_id = %bill.id, owner_id = %owner, "recurring bill created");
        Ok(bill)
    }

    /// Lists the owner's recurring bills by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_bills(&self, owner: Uuid) -> Result<Vec<recurring_bills::Model>, BillError> {
        Ok(recurring_bills::Entity::find()
            .filter(recurring_bills::Column::UserId.eq(owner))
            .order_by_asc(recurring_bills::Column::Name)
            .all(&self.db)
            .await?)
    }

    /// Finds a bill.
    ///
    /// # Errors
    ///
    /// `NotFound` or `AccessDenied`.
    pub async fn get_bill(
        &self,
        caller: &Caller,
        id: Uuid,
    ) -> Result<recurring_bills::Model, BillError> {
        accessible_bill(&self.db, caller, id, false).await
    }

    /// Applies a partial update. Deactivated bills reserve nothing.
    ///
    /// # Errors
    ///
    /// `NotFound`, `AccessDenied`, the validation errors of `create_bill`,
    /// or `CategoryNotFound` for a category the bill's owner does not have.
    pub async fn update_bill(
        &self,
        caller: &Caller,
        id: Uuid,
        input: UpdateBillInput,
    ) -> Result<recurring_bills::Model, BillError> {
        let name = input.name.as_deref().map(valid_name).transpose()?;
        if let Some(amount) = input.amount {
            ensure_positive_cents(amount)?;
        }
        if let Some(day_due) = input.day_due {
            ensure_due_day(day_due)?;
        }

        let txn = self.db.begin().await?;
        let bill = accessible_bill(&txn, caller, id, true).await?;
        if let Some(Some(category_id)) = input.category_id {
            ensure_category(&txn, bill.user_id, category_id).await?;
        }

        let mut active: recurring_bills::ActiveModel = bill.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(amount) = input.amount {
            active.amount = Set(amount);
        }
        if let Some(day_due) = input.day_due {
            active.day_due = Set(day_due);
        }
        if let Some(frequency) = input.frequency {
            active.frequency = Set(frequency);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Deletes a bill with its instances. Transactions that paid it stay
    /// and lose the link.
    ///
    /// # Errors
    ///
    /// `NotFound` or `AccessDenied`.
    pub async fn delete_bill(&self, caller: &Caller, id: Uuid) -> Result<(), BillError> {
        let txn = self.db.begin().await?;
        accessible_bill(&txn, caller, id, true).await?;
        recurring_bills::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(bill_id = %id, "recurring bill deleted");
        Ok(())
    }

    /// The owner's bills with the payments of the window containing `today`.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn payment_statuses(
        &self,
        owner: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<BillPaymentStatus>, BillError> {
        let bills = self.list_bills(owner).await?;
        let mut statuses = Vec::with_capacity(bills.len());
        for bill in bills {
            let (window_start, window_end) = bill.frequency.window(today);
            let paid_amount = paid_in_window(&self.db, bill.id, window_start, window_end).await?;
            let last_payment_id =
                latest_payment(&self.db, bill.id, window_start, window_end).await?;
            statuses.push(BillPaymentStatus {
                is_paid: paid_amount >= bill.amount,
                bill,
                window_start,
                window_end,
                paid_amount,
                last_payment_id,
            });
        }
        Ok(statuses)
    }

    /// Pays a bill from an account by posting an expense transaction.
    ///
    /// Without an amount, the remainder of the window containing
    /// `paid_on` is paid. The transaction carries the bill's category and
    /// is linked to the bill, and to the month's instance if one is open;
    /// that instance's paid amount grows accordingly.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` or `InvalidPrecision` for a bad partial amount
    /// - `NotFound`, `AccessDenied`
    /// - `AccountNotFound` unless the account belongs to the bill's owner
    /// - `ExceedsRemaining` for a partial amount above what is still due
    /// - `AlreadyPaid` when nothing is due in the window
    pub async fn mark_paid(
        &self,
        caller: &Caller,
        bill_id: Uuid,
        input: MarkPaidInput,
    ) -> Result<BillPayment, BillError> {
        if let Some(amount) = input.amount {
            ensure_positive_cents(amount)?;
        }

        let txn = self.db.begin().await?;
        let bill = accessible_bill(&txn, caller, bill_id, true).await?;
        accounts::Entity::find_by_id(input.account_id)
            .filter(accounts::Column::UserId.eq(bill.user_id))
            .one(&txn)
            .await?
            .ok_or(BillError::AccountNotFound(input.account_id))?;

        let (window_start, window_end) = bill.frequency.window(input.paid_on);
        let paid = paid_in_window(&txn, bill.id, window_start, window_end).await?;
        let remaining = (bill.amount - paid).max(Decimal::ZERO);
        let amount = match input.amount {
            Some(amount) if amount > remaining => {
                return Err(BillError::ExceedsRemaining {
                    bill_id,
                    amount,
                    remaining,
                });
            }
            Some(amount) => amount,
            None if remaining.is_zero() => {
                return Err(BillError::AlreadyPaid {
                    bill_id,
                    window_start,
                });
            }
            None => remaining,
        };

        let period = BudgetMonth::from_date(input.paid_on);
        let instance = bill_instances::Entity::find()
            .filter(bill_instances::Column::RecurringBillId.eq(bill.id))
            .filter(bill_instances::Column::Year.eq(period.year()))
            .filter(bill_instances::Column::Month.eq(period.month_number()))
            .lock_exclusive()
            .one(&txn)
            .await?;

        let description = if amount < remaining {
            format!("{} (partial payment)", bill.name)
        } else {
            bill.name.clone()
        };
        let now = chrono::Utc::now().into();
        let transaction = transactions::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(bill.user_id),
            account_id: Set(input.account_id),
            category_id: Set(bill.category_id),
            bill_instance_id: Set(instance.as_ref().map(|i| i.id)),
            recurring_bill_id: Set(Some(bill.id)),
            amount: Set(-amount),
            occurred_on: Set(input.paid_on),
            description: Set(description),
            is_cleared: Set(false),
            is_approved: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let instance = match instance {
            Some(instance) => {
                let paid = instance.amount_paid + amount;
                let mut active: bill_instances::ActiveModel = instance.into();
                active.amount_paid = Set(paid);
                active.updated_at = Set(now);
                Some(active.update(&txn).await?)
            }
            None => None,
        };

        txn.commit().await?;
        info!(
            bill_id = %bill_id,
            transaction_id = %transaction.id,
            amount = %amount,
            window_start = %window_start,
            "bill paid"
        );
        Ok(BillPayment {
            transaction,
            instance,
            remaining: remaining - amount,
        })
    }

    /// Opens the bill's instance for `period`, expecting the bill's amount
    /// unless `amount_expected` overrides it.
    ///
    /// # Errors
    ///
    /// `NotFound`, `AccessDenied`, `InvalidAmount`, `InvalidPrecision`, or
    /// `InstanceExists` when the month already has one.
    pub async fn open_instance(
        &self,
        caller: &Caller,
        bill_id: Uuid,
        period: BudgetMonth,
        amount_expected: Option<Decimal>,
    ) -> Result<bill_instances::Model, BillError> {
        if let Some(expected) = amount_expected {
            ensure_positive_cents(expected)?;
        }
        let bill = accessible_bill(&self.db, caller, bill_id, false).await?;
        let expected = amount_expected.unwrap_or(bill.amount);

        let now = chrono::Utc::now().into();
        let instance = bill_instances::ActiveModel {
            id: Set(Uuid::now_v7()),
            recurring_bill_id: Set(bill.id),
            year: Set(period.year()),
            month: Set(period.month_number()),
            amount_expected: Set(expected),
            amount_paid: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(|err| {
            if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                BillError::InstanceExists { bill_id, period }
            } else {
                BillError::Database(err)
            }
        })?;

        info!(bill_id = %bill_id, period = %period, "bill instance opened");
        Ok(instance)
    }

    /// The bill's instances, newest month first.
    ///
    /// # Errors
    ///
    /// `NotFound` or `AccessDenied`.
    pub async fn list_instances(
        &self,
        caller: &Caller,
        bill_id: Uuid,
    ) -> Result<Vec<bill_instances::Model>, BillError> {
        accessible_bill(&self.db, caller, bill_id, false).await?;
        Ok(bill_instances::Entity::find()
            .filter(bill_instances::Column::RecurringBillId.eq(bill_id))
            .order_by_desc(bill_instances::Column::Year)
            .order_by_desc(bill_instances::Column::Month)
            .all(&self.db)
            .await?)
    }

    /// Adds a payment to an instance, optionally linking the paying
    /// transaction. Paying more than expected is allowed; the remainder
    /// then counts as zero.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `InvalidPrecision`, `InstanceNotFound`,
    /// `AccessDenied`, `TransactionNotFound`.
    pub async fn record_payment(
        &self,
        caller: &Caller,
        instance_id: Uuid,
        input: RecordPaymentInput,
    ) -> Result<bill_instances::Model, BillError> {
        ensure_positive_cents(input.amount)?;

        let txn = self.db.begin().await?;
        let instance = bill_instances::Entity::find_by_id(instance_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(BillError::InstanceNotFound(instance_id))?;
        let bill = accessible_bill(&txn, caller, instance.recurring_bill_id, false).await?;

        if let Some(transaction_id) = input.transaction_id {
            let transaction = transactions::Entity::find_by_id(transaction_id)
                .filter(transactions::Column::UserId.eq(bill.user_id))
                .one(&txn)
                .await?
                .ok_or(BillError::TransactionNotFound(transaction_id))?;
            let mut linked: transactions::ActiveModel = transaction.into();
            linked.bill_instance_id = Set(Some(instance_id));
            linked.recurring_bill_id = Set(Some(bill.id));
            linked.updated_at = Set(chrono::Utc::now().into());
            linked.update(&txn).await?;
        }

        let paid = instance.amount_paid + input.amount;
        let mut active: bill_instances::ActiveModel = instance.into();
        active.amount_paid = Set(paid);
        active.updated_at = Set(chrono::Utc::now().into());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        info!(instance_id = %instance_id, amount_paid = %paid, "bill payment recorded");
        Ok(updated)
    }
}

/// Loads a bill the caller may act on, optionally locking the row.
async fn accessible_bill<C: ConnectionTrait>(
    conn: &C,
    caller: &Caller,
    id: Uuid,
    lock: bool,
) -> Result<recurring_bills::Model, BillError> {
    let mut query = recurring_bills::Entity::find_by_id(id);
    if lock {
        query = query.lock_exclusive();
    }
    let bill = query.one(conn).await?.ok_or(BillError::NotFound(id))?;
    caller
        .ensure_can_access(UserId::from_uuid(bill.user_id))
        .map_err(|_| BillError::AccessDenied(id))?;
    Ok(bill)
}

async fn ensure_category<C: ConnectionTrait>(
    conn: &C,
    owner: Uuid,
    id: Uuid,
) -> Result<(), BillError> {
    categories::Entity::find_by_id(id)
        .filter(categories::Column::UserId.eq(owner))
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or(BillError::CategoryNotFound(id))
}

/// Σ |expense| of the bill's payments dated in `[start, end)`.
async fn paid_in_window<C: ConnectionTrait>(
    conn: &C,
    bill_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Decimal, BillError> {
    let total: Option<Option<Decimal>> = transactions::Entity::find()
        .select_only()
        .column_as(Expr::col(transactions::Column::Amount).sum(), "total")
        .filter(transactions::Column::RecurringBillId.eq(bill_id))
        .filter(transactions::Column::Amount.lt(Decimal::ZERO))
        .filter(transactions::Column::OccurredOn.gte(start))
        .filter(transactions::Column::OccurredOn.lt(end))
        .into_tuple()
        .one(conn)
        .await?;
    Ok(-total.flatten().unwrap_or(Decimal::ZERO))
}

async fn latest_payment<C: ConnectionTrait>(
    conn: &C,
    bill_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Option<Uuid>, BillError> {
    Ok(transactions::Entity::find()
        .filter(transactions::Column::RecurringBillId.eq(bill_id))
        .filter(transactions::Column::Amount.lt(Decimal::ZERO))
        .filter(transactions::Column::OccurredOn.gte(start))
        .filter(transactions::Column::OccurredOn.lt(end))
        .order_by_desc(transactions::Column::OccurredOn)
        .order_by_desc(transactions::Column::CreatedAt)
        .one(conn)
        .await?
        .map(|t| t.id))
}

fn valid_name(name: &str) -> Result<String, BillError> {
    let name = name.trim();
    if name.is_empty() {
        Err(BillError::EmptyName)
    } else {
        Ok(name.to_string())
    }
}

fn ensure_positive_cents(amount: Decimal) -> Result<(), BillError> {
    if amount <= Decimal::ZERO {
        Err(BillError::InvalidAmount)
    } else if !is_whole_cents(amount) {
        Err(BillError::InvalidPrecision(amount))
    } else {
        Ok(())
    }
}

fn ensure_due_day(day_due: Option<i32>) -> Result<(), BillError> {
    if day_due.is_some_and(|day| !(1..=31).contains(&day)) {
        Err(BillError::InvalidDueDay)
    } else {
        Ok(())
    }
}
