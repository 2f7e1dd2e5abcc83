//! Site settings: an open key-value map editable by admins.
//!
//! The frontend reads this for branding and falls back to defaults when the
//! fetch fails, so `GET` is public and the map may grow keys independently.

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::{DbPool, MessageResponse};
use crate::utils::{remove_image, store_image};
use crate::AppState;

use super::auth::Admin;
use super::error::ApiError;
use super::validation::validate_setting_key;

pub async fn fetch_settings(pool: &DbPool) -> Result<HashMap<String, String>, ApiError> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM settings")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().collect())
}

pub async fn upsert_setting(pool: &DbPool, key: &str, value: &str) -> Result<(), ApiError> {
    validate_setting_key(key).map_err(ApiError::bad_request)?;
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// GET /api/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HashMap<String, String>>, ApiError> {
    Ok(Json(fetch_settings(&state.db).await?))
}

/// PUT /api/settings. Multipart: text parts upsert keys, a `logo` file part
/// replaces the stored logo and updates `site_logo`.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Admin(admin): Admin,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(|n| n.to_string()) else {
            continue;
        };

        if name == "logo" && field.file_name().is_some() {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|_| ApiError::bad_request("Failed to read uploaded logo"))?;
            let stored = store_image(
                &state.config.uploads_dir(),
                &filename,
                &data,
                state.config.uploads.max_image_bytes,
            )?;

            let old = fetch_settings(&state.db).await?;
            upsert_setting(&state.db, "site_logo", &stored).await?;
            if let Some(previous) = old.get("site_logo").filter(|v| !v.is_empty()) {
                remove_image(&state.config.uploads_dir(), previous);
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|_| ApiError::bad_request("Invalid settings field"))?;
            upsert_setting(&state.db, &name, &value).await?;
        }
    }

    tracing::info!("Admin {} updated site settings", admin.id);
    Ok(Json(MessageResponse::new("Settings updated")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::test_state;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_defaults_are_seeded() {
        let state = test_state().await;
        let settings = fetch_settings(&state.db).await.unwrap();
        assert_eq!(settings.get("site_name").map(String::as_str), Some("PasarKampus"));
        assert!(settings.contains_key("site_description"));
        assert!(settings.contains_key("site_logo"));
    }

    #[tokio::test]
    async fn test_upsert_overwrites_and_adds_keys() {
        let state = test_state().await;
        upsert_setting(&state.db, "site_name", "Pasar Mahasiswa")
            .await
            .unwrap();
        // Unknown keys pass through: the map is open
        upsert_setting(&state.db, "twitter_url", "https://x.com/pasarkampus")
            .await
            .unwrap();

        let settings = fetch_settings(&state.db).await.unwrap();
        assert_eq!(
            settings.get("site_name").map(String::as_str),
            Some("Pasar Mahasiswa")
        );
        assert_eq!(
            settings.get("twitter_url").map(String::as_str),
            Some("https://x.com/pasarkampus")
        );
    }

    #[tokio::test]
    async fn test_upsert_rejects_bad_keys() {
        let state = test_state().await;
        let err = upsert_setting(&state.db, "Not A Key", "x").await.err().unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
