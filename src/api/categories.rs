//! Category listing (public) and creation (admin).

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::db::{Category, CreateCategoryRequest, CreatedResponse};
use crate::AppState;

use super::auth::Admin;
use super::error::ApiError;
use super::validation::validate_category_name;

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories: Vec<Category> = sqlx::query_as("SELECT * FROM categories ORDER BY name")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Admin(_admin): Admin,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    validate_category_name(&req.name).map_err(ApiError::bad_request)?;

    let result = sqlx::query("INSERT INTO categories (name, description) VALUES (?, ?)")
        .bind(req.name.trim())
        .bind(req.description.unwrap_or_default())
        .execute(&state.db)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                ApiError::conflict("A category with this name already exists")
            } else {
                ApiError::from(e)
            }
        })?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Category created".to_string(),
            id: result.last_insert_rowid(),
        }),
    ))
}
