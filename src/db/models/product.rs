//! Product models and request/response shapes.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub nama_barang: String,
    pub harga: i64,
    pub deskripsi: Option<String>,
    pub foto: Option<String>,
    pub created_at: String,
}

/// Listing row: product joined with its seller.
///
/// `menit_lalu` (minutes since posting) is computed after the fetch, not by
/// the query, so it carries `#[sqlx(default)]`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductWithSeller {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub nama_barang: String,
    pub harga: i64,
    pub deskripsi: Option<String>,
    pub foto: Option<String>,
    pub created_at: String,
    pub nama: String,
    pub asal_kampus: String,
    #[sqlx(default)]
    pub menit_lalu: i64,
}

/// Detail row: product joined with full seller contact and category name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductDetail {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub nama_barang: String,
    pub harga: i64,
    pub deskripsi: Option<String>,
    pub foto: Option<String>,
    pub created_at: String,
    pub seller_nama: String,
    pub seller_email: String,
    pub seller_whatsapp: Option<String>,
    pub asal_kampus: String,
    pub category_name: String,
}

/// Fields collected from the multipart create-product form.
#[derive(Debug, Default)]
pub struct NewProduct {
    pub nama_barang: String,
    pub harga: Option<i64>,
    pub deskripsi: Option<String>,
    pub category_id: Option<i64>,
    pub foto: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub nama_barang: Option<String>,
    pub harga: Option<i64>,
    pub deskripsi: Option<String>,
    pub category_id: Option<i64>,
}

/// Response for product creation: the frontend needs the stored photo name.
#[derive(Debug, Serialize)]
pub struct CreatedProductResponse {
    pub message: String,
    pub id: i64,
    pub foto: Option<String>,
}
