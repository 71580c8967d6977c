//! Account routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_db::entities::sea_orm_active_enums::AccountType;
use tally_db::repositories::{
    AccountRepository, AccountWithBalance, CreateAccountInput, UpdateAccountInput,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the account routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/{id}", put(update_account))
}

/// Request body for creating an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Account name.
    pub name: String,
    /// `cash`, `bank` or `credit`.
    pub account_type: AccountType,
    /// Position in listings.
    #[serde(default)]
    pub order_num: i32,
}

/// Request body for updating an account.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    /// New name.
    pub name: Option<String>,
    /// New type.
    pub account_type: Option<AccountType>,
    /// New position.
    pub order_num: Option<i32>,
    /// Archive or restore.
    pub is_archived: Option<bool>,
}

/// Listing filter.
#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    /// Include archived accounts.
    #[serde(default)]
    pub include_archived: bool,
}

/// Response for an account.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account ID.
    pub id: Uuid,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Whether the account is archived.
    pub is_archived: bool,
    /// Position in listings.
    pub order_num: i32,
    /// Σ of the account's transactions.
    pub balance: Decimal,
}

impl From<AccountWithBalance> for AccountResponse {
    fn from(value: AccountWithBalance) -> Self {
        Self {
            id: value.account.id,
            name: value.account.name,
            account_type: value.account.account_type,
            is_archived: value.account.is_archived,
            order_num: value.account.order_num,
            balance: value.balance,
        }
    }
}

/// POST `/accounts`
async fn create_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = AccountRepository::new((*state.db).clone())
        .create_account(
            auth.owner(),
            CreateAccountInput {
                name: payload.name,
                account_type: payload.account_type,
                order_num: payload.order_num,
            },
        )
        .await?;

    let response = AccountResponse::from(AccountWithBalance {
        account,
        balance: Decimal::ZERO,
    });
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET `/accounts` - With balances, ordered by position then name.
async fn list_accounts(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListAccountsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let accounts = AccountRepository::new((*state.db).clone())
        .list_accounts(auth.owner(), query.include_archived)
        .await?;
    let response: Vec<AccountResponse> = accounts.into_iter().map(Into::into).collect();
    Ok(Json(response))
}

/// PUT `/accounts/{id}` - Rename, reorder or archive.
async fn update_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AccountRepository::new((*state.db).clone());
    repo.update_account(
        auth.owner(),
        id,
        UpdateAccountInput {
            name: payload.name,
            account_type: payload.account_type,
            order_num: payload.order_num,
            is_archived: payload.is_archived,
        },
    )
    .await?;

    let account = repo.find_account(auth.owner(), id).await?;
    Ok(Json(AccountResponse::from(account)))
}
