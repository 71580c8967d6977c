//! Transaction repository.
//!
//! Amounts are signed: positive for inflows, negative for outflows. Every
//! write checks that the referenced account, category and bill instance
//! belong to the same owner as the transaction.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    JoinType, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use tally_shared::types::{PageRequest, PageResponse, is_whole_cents};
use uuid::Uuid;

use crate::entities::{accounts, bill_instances, categories, recurring_bills, transactions};

/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    NotFound(Uuid),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Category not found.
    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),

    /// Bill instance not found.
    #[error("Bill instance not found: {0}")]
    BillInstanceNotFound(Uuid),

    /// Amount finer than whole cents.
    #[error("Amount {0} has more than two decimal places")]
    InvalidAmount(Decimal),

    /// Unknown sort field or direction.
    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    /// Account the money moved through.
    pub account_id: Uuid,
    /// Envelope the money belongs to.
    pub category_id: Option<Uuid>,
    /// Bill instance this transaction pays.
    pub bill_instance_id: Option<Uuid>,
    /// Signed amount.
    pub amount: Decimal,
    /// Date the transaction happened.
    pub occurred_on: NaiveDate,
    /// Free text.
    pub description: String,
    /// Cleared by the bank.
    pub is_cleared: bool,
    /// Approved by the user.
    pub is_approved: bool,
}

/// Input for updating a transaction. `Some(None)` clears an optional link.
#[derive(Debug, Clone, Default)]
pub struct UpdateTransactionInput {
    /// New account.
    pub account_id: Option<Uuid>,
    /// New category.
    pub category_id: Option<Option<Uuid>>,
    /// New amount.
    pub amount: Option<Decimal>,
    /// New date.
    pub occurred_on: Option<NaiveDate>,
    /// New description.
    pub description: Option<String>,
    /// New cleared flag.
    pub is_cleared: Option<bool>,
    /// New approved flag.
    pub is_approved: Option<bool>,
}

/// Column a transaction listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    /// Transaction date.
    #[default]
    Date,
    /// Description text.
    Description,
    /// Category name.
    Category,
    /// Signed amount.
    Amount,
}

impl FromStr for SortField {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date" => Ok(Self::Date),
            "description" => Ok(Self::Description),
            "category" => Ok(Self::Category),
            "amount" => Ok(Self::Amount),
            other => Err(TransactionError::InvalidSort(other.to_string())),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(TransactionError::InvalidSort(other.to_string())),
        }
    }
}

impl From<SortDirection> for Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Self::Asc,
            SortDirection::Desc => Self::Desc,
        }
    }
}

/// Typed listing query: search text, one sort key and a page.
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    /// Case-insensitive substring of the description.
    pub search: Option<String>,
    /// Sort column.
    pub sort: SortField,
    /// Sort direction.
    pub direction: SortDirection,
    /// Page to return.
    pub page: PageRequest,
}

/// Escapes `LIKE` wildcards so the search term matches literally.
#[must_use]
pub fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Transaction repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a transaction for `owner`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for sub-cent amounts, and
    /// `AccountNotFound`, `CategoryNotFound` or `BillInstanceNotFound` when
    /// a reference is missing or foreign.
    pub async fn create_transaction(
        &self,
        owner: Uuid,
        input: CreateTransactionInput,
    ) -> Result<transactions::Model, TransactionError> {
        ensure_whole_cents(input.amount)?;
        let txn = self.db.begin().await?;

        ensure_account(&txn, owner, input.account_id).await?;
        if let Some(category_id) = input.category_id {
            ensure_category(&txn, owner, category_id).await?;
        }
        if let Some(instance_id) = input.bill_instance_id {
            ensure_bill_instance(&txn, owner, instance_id).await?;
        }

        let now = chrono::Utc::now().into();
        let transaction = transactions::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(owner),
            account_id: Set(input.account_id),
            category_id: Set(input.category_id),
            bill_instance_id: Set(input.bill_instance_id),
            recurring_bill_id: Set(None),
            amount: Set(input.amount),
            occurred_on: Set(input.occurred_on),
            description: Set(input.description),
            is_cleared: Set(input.is_cleared),
            is_approved: Set(input.is_approved),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(transaction)
    }

    /// Lists the owner's transactions: filtered, sorted and paged.
    ///
    /// Ties are broken by creation time, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_transactions(
        &self,
        owner: Uuid,
        query: &TransactionQuery,
    ) -> Result<PageResponse<transactions::Model>, TransactionError> {
        let mut select = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(owner));

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            select = select.filter(Expr::cust_with_values(
                "transactions.description ILIKE ?",
                [like_pattern(search)],
            ));
        }

        let order: Order = query.direction.into();
        select = match query.sort {
            SortField::Date => select.order_by(transactions::Column::OccurredOn, order),
            SortField::Description => select.order_by(transactions::Column::Description, order),
            SortField::Amount => select.order_by(transactions::Column::Amount, order),
            SortField::Category => select
                .join(JoinType::LeftJoin, transactions::Relation::Categories.def())
                .order_by(categories::Column::Name, order),
        };
        select = select.order_by_desc(transactions::Column::CreatedAt);

        let page = query.page.normalized();
        let total = select.clone().count(&self.db).await?;
        let data = select
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(data, page, total))
    }

    /// Gets one of the owner's transactions.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if it does not exist or is not the owner's.
    pub async fn get_transaction(
        &self,
        owner: Uuid,
        id: Uuid,
    ) -> Result<transactions::Model, TransactionError> {
        find_owned(&self.db, owner, id).await
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `InvalidAmount`, or a missing-reference error as
    /// for create.
    pub async fn update_transaction(
        &self,
        owner: Uuid,
        id: Uuid,
        input: UpdateTransactionInput,
    ) -> Result<transactions::Model, TransactionError> {
        if let Some(amount) = input.amount {
            ensure_whole_cents(amount)?;
        }
        let txn = self.db.begin().await?;
        let existing = find_owned(&txn, owner, id).await?;

        let mut active: transactions::ActiveModel = existing.into();
        if let Some(account_id) = input.account_id {
            ensure_account(&txn, owner, account_id).await?;
            active.account_id = Set(account_id);
        }
        if let Some(category_id) = input.category_id {
            if let Some(category_id) = category_id {
                ensure_category(&txn, owner, category_id).await?;
            }
            active.category_id = Set(category_id);
        }
        if let Some(amount) = input.amount {
            active.amount = Set(amount);
        }
        if let Some(occurred_on) = input.occurred_on {
            active.occurred_on = Set(occurred_on);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(is_cleared) = input.is_cleared {
            active.is_cleared = Set(is_cleared);
        }
        if let Some(is_approved) = input.is_approved {
            active.is_approved = Set(is_approved);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Deletes one of the owner's transactions.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if it does not exist or is not the owner's.
    pub async fn delete_transaction(&self, owner: Uuid, id: Uuid) -> Result<(), TransactionError> {
        let txn = self.db.begin().await?;
        let result = transactions::Entity::delete_many()
            .filter(transactions::Column::Id.eq(id))
            .filter(transactions::Column::UserId.eq(owner))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(TransactionError::NotFound(id));
        }
        txn.commit().await?;
        Ok(())
    }
}

fn ensure_whole_cents(amount: Decimal) -> Result<(), TransactionError> {
    if is_whole_cents(amount) {
        Ok(())
    } else {
        Err(TransactionError::InvalidAmount(amount))
    }
}

async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    owner: Uuid,
    id: Uuid,
) -> Result<transactions::Model, TransactionError> {
    transactions::Entity::find_by_id(id)
        .filter(transactions::Column::UserId.eq(owner))
        .one(conn)
        .await?
        .ok_or(TransactionError::NotFound(id))
}

async fn ensure_account<C: ConnectionTrait>(
    conn: &C,
    owner: Uuid,
    id: Uuid,
) -> Result<(), TransactionError> {
    accounts::Entity::find_by_id(id)
        .filter(accounts::Column::UserId.eq(owner))
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or(TransactionError::AccountNotFound(id))
}

async fn ensure_category<C: ConnectionTrait>(
    conn: &C,
    owner: Uuid,
    id: Uuid,
) -> Result<(), TransactionError> {
    categories::Entity::find_by_id(id)
        .filter(categories::Column::UserId.eq(owner))
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or(TransactionError::CategoryNotFound(id))
}

async fn ensure_bill_instance<C: ConnectionTrait>(
    conn: &C,
    owner: Uuid,
    id: Uuid,
) -> Result<(), TransactionError> {
    bill_instances::Entity::find_by_id(id)
        .join(JoinType::InnerJoin, bill_instances::Relation::RecurringBills.def())
        .filter(recurring_bills::Column::UserId.eq(owner))
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or(TransactionError::BillInstanceNotFound(id))
}
