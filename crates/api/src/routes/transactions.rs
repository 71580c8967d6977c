//! Transaction routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tally_db::repositories::{
    CreateTransactionInput, SortDirection, SortField, TransactionQuery, TransactionRepository,
    UpdateTransactionInput,
};
use tally_shared::types::PageRequest;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the transaction routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route(
            "/transactions/{id}",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
}

/// Request body for creating a transaction.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Account ID.
    pub account_id: Uuid,
    /// Category ID; absent for transfers and income.
    pub category_id: Option<Uuid>,
    /// Bill instance this pays.
    pub bill_instance_id: Option<Uuid>,
    /// Signed amount: positive inflow, negative outflow.
    pub amount: Decimal,
    /// Transaction date.
    pub date: NaiveDate,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Cleared by the bank.
    #[serde(default)]
    pub is_cleared: bool,
    /// Approved by the user.
    #[serde(default = "default_true")]
    pub is_approved: bool,
}

const fn default_true() -> bool {
    true
}

/// Request body for updating a transaction.
#[derive(Debug, Deserialize)]
pub struct UpdateTransactionRequest {
    /// New account.
    pub account_id: Option<Uuid>,
    /// New category.
    pub category_id: Option<Uuid>,
    /// Detach from its category.
    #[serde(default)]
    pub clear_category: bool,
    /// New amount.
    pub amount: Option<Decimal>,
    /// New date.
    pub date: Option<NaiveDate>,
    /// New description.
    pub description: Option<String>,
    /// New cleared flag.
    pub is_cleared: Option<bool>,
    /// New approved flag.
    pub is_approved: Option<bool>,
}

/// Query string for listing transactions.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Substring of the description.
    pub search: Option<String>,
    /// `date`, `description`, `category` or `amount`.
    pub sort: Option<String>,
    /// `asc` or `desc`.
    pub direction: Option<String>,
    /// Page number, from 1.
    pub page: Option<u32>,
    /// Items per page, up to 100.
    pub per_page: Option<u32>,
}

impl ListTransactionsQuery {
    fn into_query(self) -> Result<TransactionQuery, ApiError> {
        Ok(TransactionQuery {
            search: self.search,
            sort: self.sort.as_deref().map(str::parse::<SortField>).transpose()?.unwrap_or_default(),
            direction: self
                .direction
                .as_deref()
                .map(str::parse::<SortDirection>)
                .transpose()?
                .unwrap_or_default(),
            page: PageRequest::from_parts(self.page, self.per_page),
        })
    }
}

/// POST `/transactions`
async fn create_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction = TransactionRepository::new((*state.db).clone())
        .create_transaction(
            auth.owner(),
            CreateTransactionInput {
                account_id: payload.account_id,
                category_id: payload.category_id,
                bill_instance_id: payload.bill_instance_id,
                amount: payload.amount,
                occurred_on: payload.date,
                description: payload.description,
                is_cleared: payload.is_cleared,
                is_approved: payload.is_approved,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// GET `/transactions` - Search, sort and page.
async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let query = query.into_query()?;
    let page = TransactionRepository::new((*state.db).clone())
        .list_transactions(auth.owner(), &query)
        .await?;
    Ok(Json(page))
}

/// GET `/transactions/{id}`
async fn get_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction = TransactionRepository::new((*state.db).clone())
        .get_transaction(auth.owner(), id)
        .await?;
    Ok(Json(transaction))
}

/// PUT `/transactions/{id}`
async fn update_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category_id = if payload.clear_category {
        Some(None)
    } else {
        payload.category_id.map(Some)
    };

    let transaction = TransactionRepository::new((*state.db).clone())
        .update_transaction(
            auth.owner(),
            id,
            UpdateTransactionInput {
                account_id: payload.account_id,
                category_id,
                amount: payload.amount,
                occurred_on: payload.date,
                description: payload.description,
                is_cleared: payload.is_cleared,
                is_approved: payload.is_approved,
            },
        )
        .await?;
    Ok(Json(transaction))
}

/// DELETE `/transactions/{id}`
async fn delete_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    TransactionRepository::new((*state.db).clone())
        .delete_transaction(auth.owner(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
