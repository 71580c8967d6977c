//! Account repository.
//!
//! Balances are never stored: an account's balance is the sum of the
//! transactions posted against it, computed on read.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{accounts, sea_orm_active_enums::AccountType, transactions};

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Account not found (or owned by someone else).
    #[error("Account not found: {0}")]
    NotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Account with computed balance.
#[derive(Debug, Clone)]
pub struct AccountWithBalance {
    /// The account record.
    pub account: accounts::Model,
    /// Σ of every transaction posted to the account.
    pub balance: Decimal,
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Display name.
    pub name: String,
    /// Cash, bank or credit.
    pub account_type: AccountType,
    /// Position in listings.
    pub order_num: i32,
}

/// Input for updating an account.
#[derive(Debug, Clone, Default)]
pub struct UpdateAccountInput {
    /// New name.
    pub name: Option<String>,
    /// New type.
    pub account_type: Option<AccountType>,
    /// New position.
    pub order_num: Option<i32>,
    /// Archive or restore.
    pub is_archived: Option<bool>,
}

/// Account repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account for `owner`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create_account(
        &self,
        owner: Uuid,
        input: CreateAccountInput,
    ) -> Result<accounts::Model, AccountError> {
        let txn = self.db.begin().await?;

        let now = chrono::Utc::now().into();
        let account = accounts::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(owner),
            name: Set(input.name),
            account_type: Set(input.account_type),
            is_archived: Set(false),
            order_num: Set(input.order_num),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(account)
    }

    /// Lists the owner's accounts with balances, ordered by `order_num` then
    /// name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_accounts(
        &self,
        owner: Uuid,
        include_archived: bool,
    ) -> Result<Vec<AccountWithBalance>, AccountError> {
        let mut query = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(owner))
            .order_by_asc(accounts::Column::OrderNum)
            .order_by_asc(accounts::Column::Name);

        if !include_archived {
            query = query.filter(accounts::Column::IsArchived.eq(false));
        }

        let accounts = query.all(&self.db).await?;
        let balances = self.balances_by_account(owner).await?;

        Ok(accounts
            .into_iter()
            .map(|account| {
                let balance = balances.get(&account.id).copied().unwrap_or(Decimal::ZERO);
                AccountWithBalance { account, balance }
            })
            .collect())
    }

    /// Finds one of the owner's accounts.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` if the account does not exist or is
    /// not the owner's.
    pub async fn find_account(
        &self,
        owner: Uuid,
        id: Uuid,
    ) -> Result<AccountWithBalance, AccountError> {
        let account = accounts::Entity::find_by_id(id)
            .filter(accounts::Column::UserId.eq(owner))
            .one(&self.db)
            .await?
            .ok_or(AccountError::NotFound(id))?;

        let total: Option<Option<Decimal>> = transactions::Entity::find()
            .select_only()
            .column_as(Expr::col(transactions::Column::Amount).sum(), "balance")
            .filter(transactions::Column::AccountId.eq(id))
            .into_tuple()
            .one(&self.db)
            .await?;

        Ok(AccountWithBalance {
            account,
            balance: total.flatten().unwrap_or(Decimal::ZERO),
        })
    }

    /// Updates one of the owner's accounts.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` if the account does not exist or is
    /// not the owner's.
    pub async fn update_account(
        &self,
        owner: Uuid,
        id: Uuid,
        input: UpdateAccountInput,
    ) -> Result<accounts::Model, AccountError> {
        let txn = self.db.begin().await?;

        let account = accounts::Entity::find_by_id(id)
            .filter(accounts::Column::UserId.eq(owner))
            .one(&txn)
            .await?
            .ok_or(AccountError::NotFound(id))?;

        let mut active: accounts::ActiveModel = account.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(account_type) = input.account_type {
            active.account_type = Set(account_type);
        }
        if let Some(order_num) = input.order_num {
            active.order_num = Set(order_num);
        }
        if let Some(is_archived) = input.is_archived {
            active.is_archived = Set(is_archived);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Σ amount per account for every account of the owner.
    async fn balances_by_account(&self, owner: Uuid) -> Result<HashMap<Uuid, Decimal>, DbErr> {
        let rows: Vec<(Uuid, Option<Decimal>)> = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::AccountId)
            .column_as(Expr::col(transactions::Column::Amount).sum(), "balance")
            .filter(transactions::Column::UserId.eq(owner))
            .group_by(transactions::Column::AccountId)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(account_id, balance)| (account_id, balance.unwrap_or(Decimal::ZERO)))
            .collect())
    }
}
