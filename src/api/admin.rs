//! Admin back-office: dashboard stats, user management, product moderation.
//!
//! Every handler takes the `Admin` extractor; the safety rules for user
//! deletion are enforced here, before any row is touched, regardless of what
//! any frontend does.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::db::{AdminStats, MessageResponse, Product, ProductDetail, User, UserResponse};
use crate::utils::remove_image;
use crate::AppState;

use super::auth::Admin;
use super::error::ApiError;
use super::validation::validate_id;

/// GET /api/admin/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Admin(_admin): Admin,
) -> Result<Json<AdminStats>, ApiError> {
    let users: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await?;
    let products: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
        .fetch_one(&state.db)
        .await?;
    let categories: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
        .fetch_one(&state.db)
        .await?;
    let wishlists: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wishlists")
        .fetch_one(&state.db)
        .await?;

    Ok(Json(AdminStats {
        users: users.0,
        products: products.0,
        categories: categories.0,
        wishlists: wishlists.0,
    }))
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Admin(_admin): Admin,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// DELETE /api/admin/users/:id
///
/// Refused for the caller's own account and for any admin-role account.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Admin(admin): Admin,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Err(e) = validate_id(id, "user id") {
        return Err(ApiError::bad_request(e));
    }

    if id == admin.id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    let target: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    let target = target.ok_or_else(|| ApiError::not_found("User not found"))?;

    if target.is_admin() {
        return Err(ApiError::forbidden("Admin accounts cannot be deleted"));
    }

    // Collect photo names before the cascade removes the rows
    let photos: Vec<(Option<String>,)> =
        sqlx::query_as("SELECT foto FROM products WHERE user_id = ?")
            .bind(id)
            .fetch_all(&state.db)
            .await?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    for (foto,) in photos {
        if let Some(ref foto) = foto {
            remove_image(&state.config.uploads_dir(), foto);
        }
    }

    tracing::info!("Admin {} deleted user {} ({})", admin.id, target.id, target.email);
    Ok(Json(MessageResponse::new("User deleted")))
}

/// GET /api/admin/products: every product with seller contact details
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Admin(_admin): Admin,
) -> Result<Json<Vec<ProductDetail>>, ApiError> {
    let products: Vec<ProductDetail> = sqlx::query_as(
        r#"
        SELECT p.*,
               u.nama AS seller_nama,
               u.email AS seller_email,
               u.whatsapp AS seller_whatsapp,
               u.asal_kampus,
               c.name AS category_name
        FROM products p
        INNER JOIN users u ON p.user_id = u.id
        INNER JOIN categories c ON p.category_id = c.id
        ORDER BY p.created_at DESC
        "#,
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(products))
}

/// DELETE /api/admin/products/:id: moderation removal of any product
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Admin(admin): Admin,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Err(e) = validate_id(id, "product id") {
        return Err(ApiError::bad_request(e));
    }

    let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    let product = product.ok_or_else(|| ApiError::not_found("Product not found"))?;

    sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    if let Some(ref foto) = product.foto {
        remove_image(&state.config.uploads_dir(), foto);
    }

    tracing::info!("Admin {} removed product {}", admin.id, id);
    Ok(Json(MessageResponse::new("Product deleted")))
}
