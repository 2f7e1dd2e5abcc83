//! Wishlist: a user's saved products.
//!
//! Add and remove are idempotent; repeated calls converge to the same state
//! instead of erroring on duplicates or absence.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::db::{MessageResponse, ProductWithSeller, User};
use crate::utils::{minutes_since, now};
use crate::AppState;

use super::error::ApiError;
use super::validation::validate_id;

pub async fn my_wishlist(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<ProductWithSeller>>, ApiError> {
    let mut products: Vec<ProductWithSeller> = sqlx::query_as(
        r#"
        SELECT p.*, u.nama, u.asal_kampus
        FROM wishlists w
        INNER JOIN products p ON w.product_id = p.id
        INNER JOIN users u ON p.user_id = u.id
        WHERE w.user_id = ?
        ORDER BY w.created_at DESC
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    for product in &mut products {
        product.menit_lalu = minutes_since(&product.created_at);
    }
    Ok(Json(products))
}

pub async fn add_to_wishlist(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(product_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Err(e) = validate_id(product_id, "product id") {
        return Err(ApiError::bad_request(e));
    }

    let product: Option<(i64,)> = sqlx::query_as("SELECT id FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_optional(&state.db)
        .await?;
    if product.is_none() {
        return Err(ApiError::not_found("Product not found"));
    }

    sqlx::query(
        "INSERT OR IGNORE INTO wishlists (user_id, product_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(user.id)
    .bind(product_id)
    .bind(now())
    .execute(&state.db)
    .await?;

    Ok(Json(MessageResponse::new("Added to wishlist")))
}

pub async fn remove_from_wishlist(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(product_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Err(e) = validate_id(product_id, "product id") {
        return Err(ApiError::bad_request(e));
    }

    sqlx::query("DELETE FROM wishlists WHERE user_id = ? AND product_id = ?")
        .bind(user.id)
        .bind(product_id)
        .execute(&state.db)
        .await?;

    Ok(Json(MessageResponse::new("Removed from wishlist")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{create_product_row, register_user, test_state};
    use axum::http::StatusCode;

    async fn wishlist_count(state: &Arc<AppState>, user_id: i64) -> i64 {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wishlists WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&state.db)
            .await
            .unwrap();
        count.0
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let state = test_state().await;
        let seller = register_user(&state, "budi@kampus.ac.id", "rahasia123").await;
        let buyer = register_user(&state, "siti@kampus.ac.id", "rahasia123").await;
        let product = create_product_row(&state, seller.id, 1, "Laptop", 100).await;

        add_to_wishlist(State(state.clone()), buyer.clone(), Path(product))
            .await
            .unwrap();
        add_to_wishlist(State(state.clone()), buyer.clone(), Path(product))
            .await
            .unwrap();

        assert_eq!(wishlist_count(&state, buyer.id).await, 1);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let state = test_state().await;
        let seller = register_user(&state, "budi@kampus.ac.id", "rahasia123").await;
        let buyer = register_user(&state, "siti@kampus.ac.id", "rahasia123").await;
        let product = create_product_row(&state, seller.id, 1, "Laptop", 100).await;

        // Removing something never added succeeds
        remove_from_wishlist(State(state.clone()), buyer.clone(), Path(product))
            .await
            .unwrap();

        add_to_wishlist(State(state.clone()), buyer.clone(), Path(product))
            .await
            .unwrap();
        remove_from_wishlist(State(state.clone()), buyer.clone(), Path(product))
            .await
            .unwrap();
        remove_from_wishlist(State(state.clone()), buyer.clone(), Path(product))
            .await
            .unwrap();

        assert_eq!(wishlist_count(&state, buyer.id).await, 0);
    }

    #[tokio::test]
    async fn test_add_missing_product_is_404() {
        let state = test_state().await;
        let buyer = register_user(&state, "siti@kampus.ac.id", "rahasia123").await;
        let err = add_to_wishlist(State(state), buyer, Path(9999))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_my_wishlist_returns_saved_products() {
        let state = test_state().await;
        let seller = register_user(&state, "budi@kampus.ac.id", "rahasia123").await;
        let buyer = register_user(&state, "siti@kampus.ac.id", "rahasia123").await;
        let first = create_product_row(&state, seller.id, 1, "Laptop", 100).await;
        create_product_row(&state, seller.id, 1, "HP", 50).await;

        add_to_wishlist(State(state.clone()), buyer.clone(), Path(first))
            .await
            .unwrap();

        let wishlist = my_wishlist(State(state), buyer).await.unwrap();
        assert_eq!(wishlist.0.len(), 1);
        assert_eq!(wishlist.0[0].nama_barang, "Laptop");
        assert_eq!(wishlist.0[0].nama, "Budi");
    }
}
