//! Recurring bill routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tally_core::BudgetMonth;
use tally_db::entities::sea_orm_active_enums::BillFrequency;
use tally_db::repositories::{
    BillRepository, CreateBillInput, MarkPaidInput, RecordPaymentInput, UpdateBillInput,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the bill routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bills", get(list_bills).post(create_bill))
        .route("/bills/status", get(payment_statuses))
        .route(
            "/bills/{id}",
            get(get_bill).put(update_bill).delete(delete_bill),
        )
        .route("/bills/{id}/pay", post(mark_paid))
        .route("/bills/{id}/instances", get(list_instances).post(open_instance))
        .route("/bills/instances/{id}/payments", post(record_payment))
}

/// Request body for creating a recurring bill.
#[derive(Debug, Deserialize)]
pub struct CreateBillRequest {
    /// Bill name.
    pub name: String,
    /// Category the bill is paid from.
    pub category_id: Option<Uuid>,
    /// Expected amount per window.
    pub amount: Decimal,
    /// Day of month it is due.
    pub day_due: Option<i32>,
    /// `daily`, `weekly`, `monthly` (default) or `quarterly`.
    #[serde(default)]
    pub frequency: BillFrequency,
}

/// Request body for updating a bill. Absent fields keep their value.
#[derive(Debug, Deserialize)]
pub struct UpdateBillRequest {
    /// New name.
    pub name: Option<String>,
    /// New category.
    pub category_id: Option<Uuid>,
    /// Detach from its category.
    #[serde(default)]
    pub clear_category: bool,
    /// New expected amount.
    pub amount: Option<Decimal>,
    /// New due day.
    pub day_due: Option<i32>,
    /// New frequency.
    pub frequency: Option<BillFrequency>,
    /// Whether the bill still reserves money.
    pub is_active: Option<bool>,
}

/// Query for payment status.
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Day whose windows are reported; defaults to today.
    pub date: Option<NaiveDate>,
}

/// Request body for paying a bill.
#[derive(Debug, Deserialize)]
pub struct MarkPaidRequest {
    /// Account the money leaves.
    pub account_id: Uuid,
    /// Partial amount; absent pays the rest of the window.
    pub amount: Option<Decimal>,
    /// Payment date; defaults to today.
    pub date: Option<NaiveDate>,
}

/// Request body for opening a month's instance.
#[derive(Debug, Deserialize)]
pub struct OpenInstanceRequest {
    /// Calendar year.
    pub year: i32,
    /// Month 1-12.
    pub month: i32,
    /// Overrides the bill's amount for this month.
    pub amount_expected: Option<Decimal>,
}

/// Request body for recording a payment.
#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    /// Amount paid.
    pub amount: Decimal,
    /// Transaction that paid it.
    pub transaction_id: Option<Uuid>,
}

fn repository(state: &AppState) -> BillRepository {
    BillRepository::new((*state.db).clone())
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// POST `/bills`
async fn create_bill(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateBillRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let bill = repository(&state)
        .create_bill(
            auth.owner(),
            CreateBillInput {
                name: payload.name,
                category_id: payload.category_id,
                amount: payload.amount,
                day_due: payload.day_due,
                frequency: payload.frequency,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(bill)))
}

/// GET `/bills`
async fn list_bills(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let bills = repository(&state).list_bills(auth.owner()).await?;
    Ok(Json(bills))
}

/// GET `/bills/status` - Each bill with what was paid in its current window.
async fn payment_statuses(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let statuses = repository(&state)
        .payment_statuses(auth.owner(), query.date.unwrap_or_else(today))
        .await?;
    Ok(Json(statuses))
}

/// GET `/bills/{id}`
async fn get_bill(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let bill = repository(&state).get_bill(&auth.caller(), id).await?;
    Ok(Json(bill))
}

/// PUT `/bills/{id}`
async fn update_bill(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBillRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category_id = if payload.clear_category {
        Some(None)
    } else {
        payload.category_id.map(Some)
    };

    let bill = repository(&state)
        .update_bill(
            &auth.caller(),
            id,
            UpdateBillInput {
                name: payload.name,
                category_id,
                amount: payload.amount,
                day_due: payload.day_due.map(Some),
                frequency: payload.frequency,
                is_active: payload.is_active,
            },
        )
        .await?;
    Ok(Json(bill))
}

/// DELETE `/bills/{id}`
async fn delete_bill(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    repository(&state).delete_bill(&auth.caller(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/bills/{id}/pay` - Posts an expense transaction paying the bill,
/// in full or in part.
async fn mark_paid(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<MarkPaidRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = repository(&state)
        .mark_paid(
            &auth.caller(),
            id,
            MarkPaidInput {
                account_id: payload.account_id,
                amount: payload.amount,
                paid_on: payload.date.unwrap_or_else(today),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// GET `/bills/{id}/instances` - Newest month first.
async fn list_instances(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let instances = repository(&state)
        .list_instances(&auth.caller(), id)
        .await?;
    Ok(Json(instances))
}

/// POST `/bills/{id}/instances`
async fn open_instance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<OpenInstanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let period = BudgetMonth::from_parts(payload.year, payload.month)?;
    let instance = repository(&state)
        .open_instance(&auth.caller(), id, period, payload.amount_expected)
        .await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

/// POST `/bills/instances/{id}/payments`
async fn record_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let instance = repository(&state)
        .record_payment(
            &auth.caller(),
            id,
            RecordPaymentInput {
                amount: payload.amount,
                transaction_id: payload.transaction_id,
            },
        )
        .await?;
    Ok(Json(instance))
}
