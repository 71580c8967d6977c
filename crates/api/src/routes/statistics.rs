//! Balance and period statistics routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tally_core::BudgetMonth;
use tally_core::statistics::StatisticsService;
use tally_db::BudgetRepository;
use tally_shared::types::CategoryId;
use uuid::Uuid;

use super::budgets::OptionalPeriodQuery;
use super::run_cancellable;
use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the statistics routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/statistics/balance", get(get_balance))
        .route("/statistics/periods", get(get_periods))
        .route("/statistics/categories", get(get_categories))
}

/// Query for period statistics.
#[derive(Debug, Deserialize)]
pub struct PeriodsQuery {
    /// First month, `YYYY-MM`.
    pub from: Option<String>,
    /// Last month, `YYYY-MM`.
    pub to: Option<String>,
    /// Restrict to one category.
    pub category_id: Option<Uuid>,
}

/// Query for per-category statistics.
#[derive(Debug, Deserialize)]
pub struct CategoriesQuery {
    /// First month, `YYYY-MM`.
    pub from: Option<String>,
    /// Last month, `YYYY-MM`.
    pub to: Option<String>,
}

fn parse_month(raw: Option<&str>) -> Result<Option<BudgetMonth>, ApiError> {
    Ok(raw.map(str::parse::<BudgetMonth>).transpose()?)
}

fn service(state: &AppState) -> StatisticsService<BudgetRepository> {
    StatisticsService::new(BudgetRepository::new((*state.db).clone()))
}

/// GET `/statistics/balance` - Money on accounts, reservations and the
/// amount free to distribute. Defaults to the current month.
async fn get_balance(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<OptionalPeriodQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let period = query
        .pair()?
        .map(|(year, month)| BudgetMonth::from_parts(year, month))
        .transpose()?;

    let service = service(&state);
    let caller = auth.caller();
    let balance = run_cancellable(state.aggregation_timeout, move |cancel| async move {
        service.balance(&caller, period, &cancel).await
    })
    .await?;
    Ok(Json(balance))
}

/// GET `/statistics/periods` - Income, expense and balance per month,
/// newest first.
async fn get_periods(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PeriodsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let from = parse_month(query.from.as_deref())?;
    let to = parse_month(query.to.as_deref())?;

    let category = query.category_id.map(CategoryId::from_uuid);
    let service = service(&state);
    let caller = auth.caller();
    let stats = run_cancellable(state.aggregation_timeout, move |cancel| async move {
        service.periods(&caller, from, to, category, &cancel).await
    })
    .await?;
    Ok(Json(stats))
}

/// GET `/statistics/categories` - Income and expense per category and
/// month, newest month first, including uncategorized transactions.
async fn get_categories(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<CategoriesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let from = parse_month(query.from.as_deref())?;
    let to = parse_month(query.to.as_deref())?;

    let service = service(&state);
    let caller = auth.caller();
    let stats = run_cancellable(state.aggregation_timeout, move |cancel| async move {
        service.categories(&caller, from, to, &cancel).await
    })
    .await?;
    Ok(Json(stats))
}
