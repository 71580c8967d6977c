//! Budget allocation routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tally_core::budget::{AllocationManager, CreateAllocationInput, UpdateAllocationInput};
use tally_db::BudgetRepository;
use tally_shared::AppError;
use tally_shared::types::AllocationId;
use uuid::Uuid;

use super::run_cancellable;
use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the budget routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/budgets", get(list_allocations).post(create_allocation))
        .route("/budgets/detailed", get(get_detailed))
        .route(
            "/budgets/{id}",
            get(get_allocation)
                .put(update_allocation)
                .delete(delete_allocation),
        )
}

/// Optional `year`/`month` pair; both or neither.
#[derive(Debug, Deserialize)]
pub struct OptionalPeriodQuery {
    /// Calendar year.
    pub year: Option<i32>,
    /// Month 1-12.
    pub month: Option<i32>,
}

impl OptionalPeriodQuery {
    pub(crate) fn pair(&self) -> Result<Option<(i32, i32)>, ApiError> {
        match (self.year, self.month) {
            (Some(year), Some(month)) => Ok(Some((year, month))),
            (None, None) => Ok(None),
            _ => Err(AppError::Validation("year and month must be given together".into()).into()),
        }
    }
}

/// Required `year`/`month` pair.
#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    /// Calendar year.
    pub year: i32,
    /// Month 1-12.
    pub month: i32,
}

fn manager(state: &AppState) -> AllocationManager<BudgetRepository> {
    AllocationManager::new(BudgetRepository::new((*state.db).clone()))
}

/// POST `/budgets` - Assign money to a category for one month.
async fn create_allocation(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateAllocationInput>,
) -> Result<impl IntoResponse, ApiError> {
    let allocation = manager(&state).create(&auth.caller(), payload).await?;
    Ok((StatusCode::CREATED, Json(allocation)))
}

/// GET `/budgets` - The caller's allocations, optionally for one month.
async fn list_allocations(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<OptionalPeriodQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let manager = manager(&state);
    let caller = auth.caller();
    let allocations = match query.pair()? {
        Some((year, month)) => manager.list_by_period(&caller, year, month).await?,
        None => manager.list(&caller).await?,
    };
    Ok(Json(allocations))
}

/// GET `/budgets/detailed` - Envelope view of one month.
async fn get_detailed(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PeriodQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let manager = manager(&state);
    let caller = auth.caller();
    let detail = run_cancellable(state.aggregation_timeout, move |cancel| async move {
        manager
            .get_detailed_by_period(&caller, query.year, query.month, &cancel)
            .await
    })
    .await?;
    Ok(Json(detail))
}

/// GET `/budgets/{id}`
async fn get_allocation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let allocation = manager(&state)
        .get(&auth.caller(), AllocationId::from_uuid(id))
        .await?;
    Ok(Json(allocation))
}

/// PUT `/budgets/{id}` - Partial update; may move category or month.
async fn update_allocation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAllocationInput>,
) -> Result<impl IntoResponse, ApiError> {
    let allocation = manager(&state)
        .update(&auth.caller(), AllocationId::from_uuid(id), payload)
        .await?;
    Ok(Json(allocation))
}

/// DELETE `/budgets/{id}`
async fn delete_allocation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    manager(&state)
        .delete(&auth.caller(), AllocationId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
