//! Product listing and seller-side product management.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::{
    CreatedProductResponse, DbPool, MessageResponse, NewProduct, Product, ProductDetail,
    ProductWithSeller, UpdateProductRequest, User,
};
use crate::utils::{minutes_since, now, remove_image, store_image};
use crate::AppState;

use super::error::ApiError;
use super::validation::{validate_id, validate_price, validate_product_name};

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub category: Option<i64>,
}

/// An absent or empty `category=` value means "no filter"; anything else
/// must parse as a category id.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom("category must be a number")),
    }
}

/// Fetch the public listing, optionally filtered by name substring and
/// category id. The same query parameters always produce the same filter.
pub async fn fetch_products(
    pool: &DbPool,
    search: Option<&str>,
    category: Option<i64>,
) -> Result<Vec<ProductWithSeller>, ApiError> {
    let search = search.filter(|s| !s.is_empty());

    let mut products: Vec<ProductWithSeller> = sqlx::query_as(
        r#"
        SELECT p.*, u.nama, u.asal_kampus
        FROM products p
        INNER JOIN users u ON p.user_id = u.id
        WHERE (?1 IS NULL OR p.nama_barang LIKE '%' || ?1 || '%')
          AND (?2 IS NULL OR p.category_id = ?2)
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(search)
    .bind(category)
    .fetch_all(pool)
    .await?;

    for product in &mut products {
        product.menit_lalu = minutes_since(&product.created_at);
    }
    Ok(products)
}

pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<ProductWithSeller>>, ApiError> {
    let products = fetch_products(&state.db, query.search.as_deref(), query.category).await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ProductDetail>, ApiError> {
    if let Err(e) = validate_id(id, "product id") {
        return Err(ApiError::bad_request(e));
    }

    let product: Option<ProductDetail> = sqlx::query_as(
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
        WHERE p.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?;

    let product = product.ok_or_else(|| ApiError::not_found("Product not found"))?;
    Ok(Json(product))
}

/// The caller's own products
pub async fn my_products(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products: Vec<Product> =
        sqlx::query_as("SELECT * FROM products WHERE user_id = ? ORDER BY created_at DESC")
            .bind(user.id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(products))
}

fn validate_new_product(req: &NewProduct) -> Result<(i64, i64), ApiError> {
    validate_product_name(&req.nama_barang).map_err(ApiError::bad_request)?;
    let harga = req
        .harga
        .ok_or_else(|| ApiError::bad_request("Price is required"))?;
    validate_price(harga).map_err(ApiError::bad_request)?;
    let category_id = req
        .category_id
        .ok_or_else(|| ApiError::bad_request("Category is required"))?;
    Ok((harga, category_id))
}

/// Insert a validated product. Returns the new row id.
pub async fn insert_product(
    pool: &DbPool,
    user_id: i64,
    req: &NewProduct,
) -> Result<i64, ApiError> {
    let (harga, category_id) = validate_new_product(req)?;

    let category: Option<(i64,)> = sqlx::query_as("SELECT id FROM categories WHERE id = ?")
        .bind(category_id)
        .fetch_optional(pool)
        .await?;
    if category.is_none() {
        return Err(ApiError::bad_request("Category does not exist"));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO products (user_id, category_id, nama_barang, harga, deskripsi, foto, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(category_id)
    .bind(req.nama_barang.trim())
    .bind(harga)
    .bind(&req.deskripsi)
    .bind(&req.foto)
    .bind(now())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Read the multipart create-product form: text fields plus an optional
/// `foto` image, which is stored immediately. A form rejected partway
/// through does not leave a stored photo behind.
async fn read_product_form(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<NewProduct, ApiError> {
    let mut form = NewProduct::default();
    if let Err(e) = fill_product_form(state, multipart, &mut form).await {
        if let Some(ref foto) = form.foto {
            remove_image(&state.config.uploads_dir(), foto);
        }
        return Err(e);
    }
    Ok(form)
}

async fn fill_product_form(
    state: &AppState,
    multipart: &mut Multipart,
    form: &mut NewProduct,
) -> Result<(), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(|n| n.to_string()) else {
            continue;
        };
        match name.as_str() {
            "nama_barang" => {
                form.nama_barang = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Invalid product name field"))?;
            }
            "harga" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Invalid price field"))?;
                form.harga =
                    Some(raw.trim().parse().map_err(|_| {
                        ApiError::bad_request("Price must be a whole number")
                    })?);
            }
            "deskripsi" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Invalid description field"))?;
                form.deskripsi = Some(text).filter(|d| !d.is_empty());
            }
            "category_id" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Invalid category field"))?;
                form.category_id =
                    Some(raw.trim().parse().map_err(|_| {
                        ApiError::bad_request("Category id must be a number")
                    })?);
            }
            "foto" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("Failed to read uploaded photo"))?;
                let stored = store_image(
                    &state.config.uploads_dir(),
                    &filename,
                    &data,
                    state.config.uploads.max_image_bytes,
                )?;
                form.foto = Some(stored);
            }
            _ => {}
        }
    }

    Ok(())
}

/// Create a product from a multipart form
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    user: User,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CreatedProductResponse>), ApiError> {
    let form = read_product_form(&state, &mut multipart).await?;

    let id = match insert_product(&state.db, user.id, &form).await {
        Ok(id) => id,
        Err(e) => {
            // Don't leave an orphaned file behind on a rejected form
            if let Some(ref foto) = form.foto {
                remove_image(&state.config.uploads_dir(), foto);
            }
            return Err(e);
        }
    };

    tracing::info!("User {} created product {}", user.id, id);

    Ok((
        StatusCode::CREATED,
        Json(CreatedProductResponse {
            message: "Product created".to_string(),
            id,
            foto: form.foto,
        }),
    ))
}

async fn fetch_owned_product(
    pool: &DbPool,
    id: i64,
    user: &User,
) -> Result<Product, ApiError> {
    if let Err(e) = validate_id(id, "product id") {
        return Err(ApiError::bad_request(e));
    }

    let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let product = product.ok_or_else(|| ApiError::not_found("Product not found"))?;

    if product.user_id != user.id && !user.is_admin() {
        return Err(ApiError::forbidden("You can only modify your own products"));
    }
    Ok(product)
}

/// Update product fields (JSON, no photo)
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<i64>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let existing = fetch_owned_product(&state.db, id, &user).await?;

    if let Some(ref nama_barang) = req.nama_barang {
        validate_product_name(nama_barang).map_err(ApiError::bad_request)?;
    }
    if let Some(harga) = req.harga {
        validate_price(harga).map_err(ApiError::bad_request)?;
    }
    if let Some(category_id) = req.category_id {
        let category: Option<(i64,)> = sqlx::query_as("SELECT id FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_optional(&state.db)
            .await?;
        if category.is_none() {
            return Err(ApiError::bad_request("Category does not exist"));
        }
    }

    let nama_barang = req
        .nama_barang
        .as_deref()
        .map(str::trim)
        .unwrap_or(&existing.nama_barang);
    let harga = req.harga.unwrap_or(existing.harga);
    let category_id = req.category_id.unwrap_or(existing.category_id);
    let deskripsi = match req.deskripsi {
        Some(d) if d.is_empty() => None,
        Some(d) => Some(d),
        None => existing.deskripsi.clone(),
    };

    sqlx::query(
        "UPDATE products SET nama_barang = ?, harga = ?, category_id = ?, deskripsi = ? WHERE id = ?",
    )
    .bind(nama_barang)
    .bind(harga)
    .bind(category_id)
    .bind(&deskripsi)
    .bind(id)
    .execute(&state.db)
    .await?;

    Ok(Json(MessageResponse::new("Product updated")))
}

/// Replace the product photo (multipart with a `foto` part)
pub async fn update_product_image(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    let existing = fetch_owned_product(&state.db, id, &user).await?;

    let mut stored: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("foto") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::bad_request("Failed to read uploaded photo"))?;
        stored = Some(store_image(
            &state.config.uploads_dir(),
            &filename,
            &data,
            state.config.uploads.max_image_bytes,
        )?);
    }

    let foto = stored.ok_or_else(|| ApiError::bad_request("Photo file is required"))?;

    let updated = sqlx::query("UPDATE products SET foto = ? WHERE id = ?")
        .bind(&foto)
        .bind(id)
        .execute(&state.db)
        .await;
    if let Err(e) = updated {
        // Don't keep the new file if the row was never updated
        remove_image(&state.config.uploads_dir(), &foto);
        return Err(e.into());
    }

    if let Some(ref old) = existing.foto {
        remove_image(&state.config.uploads_dir(), old);
    }

    Ok(Json(MessageResponse::new("Product photo updated")))
}

pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let existing = fetch_owned_product(&state.db, id, &user).await?;

    sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    if let Some(ref foto) = existing.foto {
        remove_image(&state.config.uploads_dir(), foto);
    }

    tracing::info!("User {} deleted product {}", user.id, id);
    Ok(Json(MessageResponse::new("Product deleted")))
}
