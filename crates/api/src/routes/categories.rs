//! Category routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tally_db::repositories::{CategoryRepository, UpdateCategoryInput};
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the category routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
}

/// Request body for creating a category.
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    /// Category name.
    pub name: String,
    /// Group shown above the category.
    pub group_name: Option<String>,
}

/// Request body for updating a category. An empty `group_name` clears it.
#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    /// New name.
    pub name: Option<String>,
    /// New group.
    pub group_name: Option<String>,
}

/// POST `/categories`
async fn create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = CategoryRepository::new((*state.db).clone())
        .create_category(auth.owner(), &payload.name, payload.group_name)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET `/categories` - Ordered by name.
async fn list_categories(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let categories = CategoryRepository::new((*state.db).clone())
        .list_categories(auth.owner())
        .await?;
    Ok(Json(categories))
}

/// GET `/categories/{id}`
async fn get_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let category = CategoryRepository::new((*state.db).clone())
        .find_category(auth.owner(), id)
        .await?;
    Ok(Json(category))
}

/// DELETE `/categories/{id}` - Removes the category and its allocations;
/// its transactions become uncategorized.
async fn delete_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    CategoryRepository::new((*state.db).clone())
        .delete_category(auth.owner(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT `/categories/{id}` - Rename or regroup.
async fn update_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = CategoryRepository::new((*state.db).clone())
        .update_category(
            auth.owner(),
            id,
            UpdateCategoryInput {
                name: payload.name,
                group_name: payload.group_name.map(Some),
            },
        )
        .await?;
    Ok(Json(category))
}
